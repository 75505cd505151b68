//! This module contains the types required for interpreting data elements:
//! the attribute tag, the value representation, element lengths
//! and the element header.

use snafu::{Backtrace, Snafu};
use std::fmt;
use std::str::{from_utf8, FromStr};

/// Error raised when a piece of text does not follow
/// the `GGGG,EEEE` attribute tag format.
#[derive(Debug, Snafu)]
#[snafu(display("Invalid tag format in {:?}, expected `GGGG,EEEE`", text))]
pub struct InvalidTagFormat {
    /// the offending text
    pub text: String,
    backtrace: Backtrace,
}

/// Error type for issues constructing a sequence item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ItemHeaderError {
    /// Unexpected header tag.
    /// Only Item (0xFFFE, 0xE000),
    /// Item Delimiter (0xFFFE, 0xE00D),
    /// or Sequence Delimiter (0xFFFE, 0xE0DD)
    /// are admitted.
    #[snafu(display("Unexpected tag {}", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },
    /// Unexpected delimiter value length.
    /// Must be zero for delimiters.
    #[snafu(display("Unexpected delimiter length {}", len))]
    UnexpectedDelimiterLength { len: Length, backtrace: Backtrace },
}

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// The data type for data element tags: a (group, element) pair
/// of 16-bit numbers.
///
/// The canonical textual form of a tag is `GGGG,EEEE`:
/// four uppercase hexadecimal digits, a comma,
/// and four more uppercase hexadecimal digits.
/// Parsing via [`FromStr`] accepts that shape in any letter case
/// and nothing else,
/// so that text-addressed lookups are case-insensitive by construction.
/// Both `(u16, u16)` and `[u16; 2]` can be efficiently converted
/// to this type.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Getter for the tag's group value.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Retrieve the canonical textual form of this tag
    /// (`GGGG,EEEE`, uppercase).
    pub fn to_canonical_string(self) -> String {
        self.to_string()
    }

    /// Parse a group number from text:
    /// exactly four hexadecimal digits, any letter case.
    pub fn parse_group(text: &str) -> Result<GroupNumber, InvalidTagFormat> {
        parse_hex4(text).ok_or_else(|| {
            InvalidTagFormatSnafu { text }.build()
        })
    }
}

/// Parse exactly 4 hexadecimal digits into a 16-bit number.
fn parse_hex4(text: &str) -> Option<u16> {
    let bytes = text.as_bytes();
    if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u16::from_str_radix(text, 16).ok()
}

impl FromStr for Tag {
    type Err = InvalidTagFormat;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = text.as_bytes();
        if bytes.len() == 9 && bytes[4] == b',' {
            if let (Some(group), Some(element)) =
                (parse_hex4(&text[0..4]), parse_hex4(&text[5..9]))
            {
                return Ok(Tag(group, element));
            }
        }
        InvalidTagFormatSnafu { text }.fail()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X},{:04X}", self.0, self.1)
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl PartialEq<[u16; 2]> for Tag {
    fn eq(&self, other: &[u16; 2]) -> bool {
        self.0 == other[0] && self.1 == other[1]
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

/// A data element length, in bytes.
///
/// The value `0xFFFF_FFFF` stands for an undefined length,
/// as used by sequences and items which end with an explicit delimiter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Length(pub u32);

impl Length {
    /// An undefined length.
    pub const UNDEFINED: Length = Length(0xFFFF_FFFF);

    /// Create a new length value from a u32.
    #[inline]
    pub fn new(value: u32) -> Self {
        Length(value)
    }

    /// Check whether this length is undefined.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == 0xFFFF_FFFF
    }

    /// Check whether this length is well defined.
    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// Fetch the concrete length value, if defined.
    #[inline]
    pub fn get(self) -> Option<u32> {
        if self.is_undefined() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl From<u32> for Length {
    #[inline]
    fn from(value: u32) -> Self {
        Length(value)
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_undefined() {
            f.write_str("Length(Undefined)")
        } else {
            write!(f, "Length({})", self.0)
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_undefined() {
            f.write_str("U/L")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A data element header as it appears on the wire:
/// a tag, a value representation and a specified length.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ElementHeader {
    /// attribute tag
    pub tag: Tag,
    /// value representation
    pub vr: VR,
    /// element value length
    pub len: Length,
}

impl ElementHeader {
    /// Create a new element header with the given properties.
    #[inline]
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> ElementHeader {
        ElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// Getter for the header's tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Getter for the header's value representation.
    #[inline]
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// Getter for the header's element length.
    #[inline]
    pub fn length(&self) -> Length {
        self.len
    }

    /// Check whether the header suggests a sequence value:
    /// either the value representation is SQ
    /// or the length is undefined.
    #[inline]
    pub fn is_non_primitive(&self) -> bool {
        self.vr == VR::SQ || self.len.is_undefined()
    }
}

/// Data type describing a sequence item pseudo-element header.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ItemHeader {
    /// The start of a new item, with the length of its contents in bytes
    /// (`0xFFFF_FFFF` if delimited).
    Item {
        /// the item contents' length in bytes
        len: Length,
    },
    /// An item delimiter. The current item ends here.
    ItemDelimiter,
    /// A sequence delimiter. The sequence of items ends here.
    SequenceDelimiter,
}

impl ItemHeader {
    /// Create a sequence item header from the raw tag and length.
    /// An error is raised if the tag is not one of the three
    /// item pseudo-element tags,
    /// or if a delimiter carries a positive length.
    pub fn new<T: Into<Tag>>(tag: T, len: Length) -> Result<ItemHeader, ItemHeaderError> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(ItemHeader::Item { len }),
            Tag(0xFFFE, 0xE00D) => {
                if len != Length(0) {
                    UnexpectedDelimiterLengthSnafu { len }.fail()
                } else {
                    Ok(ItemHeader::ItemDelimiter)
                }
            }
            Tag(0xFFFE, 0xE0DD) => {
                if len != Length(0) {
                    UnexpectedDelimiterLengthSnafu { len }.fail()
                } else {
                    Ok(ItemHeader::SequenceDelimiter)
                }
            }
            tag => UnexpectedTagSnafu { tag }.fail(),
        }
    }

    /// Getter for the pseudo-element's tag.
    pub fn tag(&self) -> Tag {
        match *self {
            ItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            ItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            ItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }

    /// Getter for the item's content length.
    /// Delimiters always have a length of zero.
    pub fn length(&self) -> Length {
        match *self {
            ItemHeader::Item { len } => len,
            ItemHeader::ItemDelimiter | ItemHeader::SequenceDelimiter => Length(0),
        }
    }
}

/// An enum type for a value representation.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn as_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.as_str().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Check whether the explicit VR wire form of this representation
    /// carries 2 reserved bytes followed by a 32-bit length,
    /// instead of the short 16-bit length.
    pub fn has_reserved_length(self) -> bool {
        use VR::*;
        matches!(
            self,
            OB | OD | OF | OL | OV | OW | SQ | SV | UC | UN | UR | UT | UV
        )
    }
}

/// Obtain the value representation corresponding to the given string.
/// The string should hold exactly two UTF-8 encoded alphabetic characters
/// in upper case, otherwise no match is made.
impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_from_text_is_case_invariant() {
        let lower: Tag = "300a,00b0".parse().unwrap();
        let upper: Tag = "300A,00B0".parse().unwrap();
        let mixed: Tag = "300a,00B0".parse().unwrap();
        assert_eq!(lower, Tag(0x300A, 0x00B0));
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn tag_canonical_form_is_uppercase() {
        let tag: Tag = "10b0,c0a0".parse().unwrap();
        assert_eq!(tag.to_canonical_string(), "10B0,C0A0");
        // normalization is idempotent
        let again: Tag = tag.to_canonical_string().parse().unwrap();
        assert_eq!(again, tag);
    }

    #[test]
    fn tag_from_text_rejects_bad_shapes() {
        assert!("300A0040".parse::<Tag>().is_err());
        assert!("300A,040".parse::<Tag>().is_err());
        assert!("300A,00401".parse::<Tag>().is_err());
        assert!("300G,0040".parse::<Tag>().is_err());
        assert!("300A;0040".parse::<Tag>().is_err());
        assert!("+00A,0040".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn parse_group_text() {
        assert_eq!(Tag::parse_group("300a").unwrap(), 0x300A);
        assert_eq!(Tag::parse_group("0010").unwrap(), 0x0010);
        assert!(Tag::parse_group("10").is_err());
        assert!(Tag::parse_group("30xA").is_err());
    }

    #[test]
    fn vr_round_trip() {
        assert_eq!(VR::from_binary([b'A', b'T']), Some(VR::AT));
        assert_eq!(VR::AT.to_bytes(), [b'A', b'T']);
        assert_eq!(VR::from_binary([b'?', b'?']), None);
        assert!(VR::OB.has_reserved_length());
        assert!(VR::SQ.has_reserved_length());
        assert!(!VR::AT.has_reserved_length());
        assert!(!VR::US.has_reserved_length());
    }

    #[test]
    fn item_headers() {
        let item = ItemHeader::new(Tag(0xFFFE, 0xE000), Length(24)).unwrap();
        assert_eq!(item, ItemHeader::Item { len: Length(24) });
        let delim = ItemHeader::new(Tag(0xFFFE, 0xE00D), Length(0)).unwrap();
        assert_eq!(delim, ItemHeader::ItemDelimiter);
        assert!(ItemHeader::new(Tag(0xFFFE, 0xE00D), Length(2)).is_err());
        assert!(ItemHeader::new(Tag(0x0010, 0x0010), Length(0)).is_err());
    }

    #[test]
    fn lengths() {
        assert!(Length::UNDEFINED.is_undefined());
        assert_eq!(Length::UNDEFINED.get(), None);
        assert_eq!(Length(16).get(), Some(16));
        assert_eq!(Length(16).to_string(), "16");
        assert_eq!(Length::UNDEFINED.to_string(), "U/L");
    }
}
