//! The value codec: binary decoding and encoding of element values,
//! keyed by value representation and parameterized on byte order.
//!
//! Every VR maps to one entry of a closed, immutable dispatch table
//! (see [`VrKind`]). Each entry is a fixed-shape pair of functions:
//! decode bytes into a [`PrimitiveValue`], encode a value into bytes.
//!
//! Decoding never fails: a payload whose length is structurally
//! invalid for its VR is a tolerated deviation, reported through
//! the `tracing` diagnostic channel and decoded as an absent value
//! (`None`). An empty payload is likewise absent.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use dcmio_core::header::{Tag, VR};
use dcmio_core::value::{PrimitiveValue, C};
use tracing::warn;

/// A fixed-shape binary codec for one family of value representations.
#[derive(Debug, Copy, Clone)]
pub struct VrCodec {
    decode: fn(&[u8], Endianness) -> Option<PrimitiveValue>,
    encode: fn(&PrimitiveValue, Endianness) -> Vec<u8>,
}

impl VrCodec {
    /// Decode a binary payload under the given byte order.
    ///
    /// Returns `None` for an empty payload
    /// and for payloads whose length is invalid for the codec,
    /// the latter being reported as a deviation through `tracing`.
    #[inline]
    pub fn decode(&self, data: &[u8], byte_order: Endianness) -> Option<PrimitiveValue> {
        (self.decode)(data, byte_order)
    }

    /// Encode a decoded value into its binary payload
    /// under the given byte order.
    ///
    /// The output is always of even length.
    /// Empty values encode to a zero-length payload.
    #[inline]
    pub fn encode(&self, value: &PrimitiveValue, byte_order: Endianness) -> Vec<u8> {
        (self.encode)(value, byte_order)
    }
}

/// The closed enumeration of codec families.
///
/// Adding support for a new value representation means
/// mapping it to one of these kinds (or adding a kind and
/// its table entry), never adding a new dispatch mechanism.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum VrKind {
    /// Attribute tags, 4 bytes each (AT).
    AttributeTag,
    /// Backslash-separated text, space padded.
    Text,
    /// Unique identifiers, NUL padded (UI).
    Uid,
    /// Raw bytes, kept verbatim (OB, UN, and undecoded SQ payloads).
    Bytes,
    /// Unsigned 16-bit integers (US, OW).
    U16,
    /// Signed 16-bit integers (SS).
    I16,
    /// Unsigned 32-bit integers (UL, OL).
    U32,
    /// Signed 32-bit integers (SL).
    I32,
    /// Unsigned 64-bit integers (UV, OV).
    U64,
    /// Signed 64-bit integers (SV).
    I64,
    /// 32-bit floats (FL, OF).
    F32,
    /// 64-bit floats (FD, OD).
    F64,
}

impl VrKind {
    /// Retrieve the codec family of the given value representation.
    pub fn of(vr: VR) -> VrKind {
        use VR::*;
        match vr {
            AT => VrKind::AttributeTag,
            UI => VrKind::Uid,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UR | UT => {
                VrKind::Text
            }
            OB | UN | SQ => VrKind::Bytes,
            US | OW => VrKind::U16,
            SS => VrKind::I16,
            UL | OL => VrKind::U32,
            SL => VrKind::I32,
            UV | OV => VrKind::U64,
            SV => VrKind::I64,
            FL | OF => VrKind::F32,
            FD | OD => VrKind::F64,
        }
    }

    /// Retrieve this family's codec entry.
    pub fn codec(self) -> &'static VrCodec {
        // table rows are in `VrKind` declaration order
        &CODEC_TABLE[self as usize]
    }

    /// Check whether payloads of this family change
    /// with the active byte order.
    ///
    /// Text and raw byte payloads read the same either way,
    /// so a re-encode under a new byte order keeps their bytes
    /// (including padding) verbatim.
    pub fn is_byte_order_sensitive(self) -> bool {
        !matches!(self, VrKind::Text | VrKind::Uid | VrKind::Bytes)
    }
}

/// Obtain the codec for the given value representation.
#[inline]
pub fn codec_of(vr: VR) -> &'static VrCodec {
    VrKind::of(vr).codec()
}

static CODEC_TABLE: [VrCodec; 12] = [
    VrCodec {
        decode: decode_at,
        encode: encode_at,
    },
    VrCodec {
        decode: decode_text,
        encode: encode_text,
    },
    VrCodec {
        decode: decode_uid,
        encode: encode_uid,
    },
    VrCodec {
        decode: decode_bytes,
        encode: encode_bytes,
    },
    VrCodec {
        decode: decode_u16,
        encode: encode_u16,
    },
    VrCodec {
        decode: decode_i16,
        encode: encode_i16,
    },
    VrCodec {
        decode: decode_u32,
        encode: encode_u32,
    },
    VrCodec {
        decode: decode_i32,
        encode: encode_i32,
    },
    VrCodec {
        decode: decode_u64,
        encode: encode_u64,
    },
    VrCodec {
        decode: decode_i64,
        encode: encode_i64,
    },
    VrCodec {
        decode: decode_f32,
        encode: encode_f32,
    },
    VrCodec {
        decode: decode_f64,
        encode: encode_f64,
    },
];

/// Decode an AT payload: each 4-byte run is one attribute tag,
/// group number first, both numbers in the active byte order.
fn decode_at(data: &[u8], byte_order: Endianness) -> Option<PrimitiveValue> {
    if data.is_empty() {
        return None;
    }
    if data.len() % 4 != 0 {
        warn!(
            length = data.len(),
            "AT payload length is not a positive multiple of 4, value is absent"
        );
        return None;
    }
    let mut tags = C::with_capacity(data.len() / 4);
    for chunk in data.chunks_exact(4) {
        let (group, element) = match byte_order {
            Endianness::Little => (
                LittleEndian::read_u16(&chunk[0..2]),
                LittleEndian::read_u16(&chunk[2..4]),
            ),
            Endianness::Big => (
                BigEndian::read_u16(&chunk[0..2]),
                BigEndian::read_u16(&chunk[2..4]),
            ),
        };
        tags.push(Tag(group, element));
    }
    Some(PrimitiveValue::Tags(tags))
}

/// Encode an AT value: tags given directly or as canonical-form text.
///
/// Absent values are encoded at the element level as a zero-length
/// payload; an explicitly empty value collapses to the same bytes,
/// making the two indistinguishable after a round trip through
/// storage. This is intentional wire-boundary lossiness.
fn encode_at(value: &PrimitiveValue, byte_order: Endianness) -> Vec<u8> {
    let mut tags: C<Tag> = C::new();
    match value {
        PrimitiveValue::Empty => return Vec::new(),
        PrimitiveValue::Tags(c) => tags.extend(c.iter().copied()),
        PrimitiveValue::Str(s) => collect_tags_from_text(s, &mut tags),
        PrimitiveValue::Strs(c) => {
            for s in c {
                collect_tags_from_text(s, &mut tags);
            }
        }
        other => {
            warn!(
                value_type = ?other.value_type(),
                "cannot encode value as AT, writing no bytes"
            );
            return Vec::new();
        }
    }
    let mut out = Vec::with_capacity(tags.len() * 4);
    for tag in tags {
        put_u16(&mut out, byte_order, tag.group());
        put_u16(&mut out, byte_order, tag.element());
    }
    out
}

fn collect_tags_from_text(text: &str, out: &mut C<Tag>) {
    for part in text.split('\\') {
        if part.is_empty() {
            continue;
        }
        match part.parse::<Tag>() {
            Ok(tag) => out.push(tag),
            Err(_) => {
                warn!(text = part, "skipping malformed tag text in AT value");
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, byte_order: Endianness, value: u16) {
    let mut buf = [0u8; 2];
    match byte_order {
        Endianness::Little => LittleEndian::write_u16(&mut buf, value),
        Endianness::Big => BigEndian::write_u16(&mut buf, value),
    }
    out.extend_from_slice(&buf);
}

fn decode_text(data: &[u8], _byte_order: Endianness) -> Option<PrimitiveValue> {
    decode_string(data, &[' ', '\0'])
}

fn decode_uid(data: &[u8], _byte_order: Endianness) -> Option<PrimitiveValue> {
    decode_string(data, &['\0', ' '])
}

fn decode_string(data: &[u8], pad: &[char]) -> Option<PrimitiveValue> {
    if data.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(data);
    let text = text.trim_end_matches(|c| pad.contains(&c));
    let mut parts = text.split('\\');
    let first = parts.next().unwrap_or("");
    match parts.next() {
        None => Some(PrimitiveValue::Str(first.to_owned())),
        Some(second) => {
            let mut all: C<String> = C::new();
            all.push(first.to_owned());
            all.push(second.to_owned());
            all.extend(parts.map(str::to_owned));
            Some(PrimitiveValue::Strs(all))
        }
    }
}

fn encode_text(value: &PrimitiveValue, _byte_order: Endianness) -> Vec<u8> {
    encode_string(value, b' ')
}

fn encode_uid(value: &PrimitiveValue, _byte_order: Endianness) -> Vec<u8> {
    encode_string(value, b'\0')
}

fn encode_string(value: &PrimitiveValue, pad: u8) -> Vec<u8> {
    if let PrimitiveValue::Empty = value {
        return Vec::new();
    }
    let mut out = value.to_str().into_owned().into_bytes();
    if out.len() % 2 != 0 {
        out.push(pad);
    }
    out
}

fn decode_bytes(data: &[u8], _byte_order: Endianness) -> Option<PrimitiveValue> {
    if data.is_empty() {
        return None;
    }
    Some(PrimitiveValue::U8(data.into()))
}

fn encode_bytes(value: &PrimitiveValue, _byte_order: Endianness) -> Vec<u8> {
    match value {
        PrimitiveValue::Empty => Vec::new(),
        PrimitiveValue::U8(c) => {
            let mut out = c.to_vec();
            if out.len() % 2 != 0 {
                out.push(0);
            }
            out
        }
        other => {
            warn!(
                value_type = ?other.value_type(),
                "cannot encode value as raw bytes, writing no bytes"
            );
            Vec::new()
        }
    }
}

/// Generates the decode/encode pair for one fixed-width numeric family.
macro_rules! numeric_codec {
    ($decode: ident, $encode: ident, $variant: ident, $width: expr, $read: ident, $write: ident) => {
        fn $decode(data: &[u8], byte_order: Endianness) -> Option<PrimitiveValue> {
            if data.is_empty() {
                return None;
            }
            if data.len() % $width != 0 {
                warn!(
                    length = data.len(),
                    width = $width,
                    kind = stringify!($variant),
                    "payload length is not a multiple of the element width, value is absent"
                );
                return None;
            }
            let mut out = C::with_capacity(data.len() / $width);
            for chunk in data.chunks_exact($width) {
                out.push(match byte_order {
                    Endianness::Little => LittleEndian::$read(chunk),
                    Endianness::Big => BigEndian::$read(chunk),
                });
            }
            Some(PrimitiveValue::$variant(out))
        }

        fn $encode(value: &PrimitiveValue, byte_order: Endianness) -> Vec<u8> {
            match value {
                PrimitiveValue::Empty => Vec::new(),
                PrimitiveValue::$variant(c) => {
                    let mut out = Vec::with_capacity(c.len() * $width);
                    for v in c {
                        let mut buf = [0u8; $width];
                        match byte_order {
                            Endianness::Little => LittleEndian::$write(&mut buf, *v),
                            Endianness::Big => BigEndian::$write(&mut buf, *v),
                        }
                        out.extend_from_slice(&buf);
                    }
                    out
                }
                other => {
                    warn!(
                        value_type = ?other.value_type(),
                        kind = stringify!($variant),
                        "cannot encode value under this numeric kind, writing no bytes"
                    );
                    Vec::new()
                }
            }
        }
    };
}

numeric_codec!(decode_u16, encode_u16, U16, 2, read_u16, write_u16);
numeric_codec!(decode_i16, encode_i16, I16, 2, read_i16, write_i16);
numeric_codec!(decode_u32, encode_u32, U32, 4, read_u32, write_u32);
numeric_codec!(decode_i32, encode_i32, I32, 4, read_i32, write_i32);
numeric_codec!(decode_u64, encode_u64, U64, 8, read_u64, write_u64);
numeric_codec!(decode_i64, encode_i64, I64, 8, read_i64, write_i64);
numeric_codec!(decode_f32, encode_f32, F32, 4, read_f32, write_f32);
numeric_codec!(decode_f64, encode_f64, F64, 8, read_f64, write_f64);

#[cfg(test)]
mod tests {
    use super::*;
    use dcmio_core::header::VR;

    #[test]
    fn at_decodes_per_byte_order() {
        let codec = codec_of(VR::AT);
        let raw = [0xB0, 0x10, 0xA0, 0xC0];
        assert_eq!(
            codec.decode(&raw, Endianness::Little),
            Some(PrimitiveValue::Tags(
                vec![Tag(0x10B0, 0xC0A0)].into()
            ))
        );
        assert_eq!(
            codec.decode(&raw, Endianness::Big),
            Some(PrimitiveValue::Tags(
                vec![Tag(0xB010, 0xA0C0)].into()
            ))
        );
    }

    #[test]
    fn at_encodes_canonical_text() {
        let codec = codec_of(VR::AT);
        let value = PrimitiveValue::from("10B0,C0A0");
        assert_eq!(
            codec.encode(&value, Endianness::Little),
            vec![0xB0, 0x10, 0xA0, 0xC0]
        );
        assert_eq!(
            codec.encode(&value, Endianness::Big),
            vec![0x10, 0xB0, 0xC0, 0xA0]
        );
    }

    #[test]
    fn at_encodes_multiple_tags() {
        let codec = codec_of(VR::AT);
        let value = PrimitiveValue::from(vec![Tag(0x0002, 0x0001), Tag(0xFA80, 0xBC12)]);
        assert_eq!(
            codec.encode(&value, Endianness::Little),
            vec![0x02, 0x00, 0x01, 0x00, 0x80, 0xFA, 0x12, 0xBC]
        );
        assert_eq!(
            codec.encode(&value, Endianness::Big),
            vec![0x00, 0x02, 0x00, 0x01, 0xFA, 0x80, 0xBC, 0x12]
        );
    }

    #[test]
    fn at_multi_tag_reencode_is_not_byte_reversal() {
        // per-field byte order inversion differs from reversing
        // the whole payload once more than one tag is present
        let codec = codec_of(VR::AT);
        let value = PrimitiveValue::from(vec![Tag(0x0002, 0x0001), Tag(0xFA80, 0xBC12)]);
        let le = codec.encode(&value, Endianness::Little);
        let be = codec.encode(&value, Endianness::Big);
        let mut reversed = le.clone();
        reversed.reverse();
        assert_ne!(be, reversed);
        assert_eq!(codec.decode(&be, Endianness::Big), Some(value));
    }

    #[test]
    fn at_blank_and_deviant_payloads_are_absent() {
        let codec = codec_of(VR::AT);
        assert_eq!(codec.decode(&[], Endianness::Little), None);
        assert_eq!(codec.decode(&[0x10], Endianness::Little), None);
        assert_eq!(
            codec.decode(&[0x10, 0x20, 0x30], Endianness::Big),
            None
        );
        assert_eq!(
            codec.decode(&[1, 2, 3, 4, 5], Endianness::Little),
            None
        );
    }

    #[test]
    fn at_empty_values_collapse_to_no_bytes() {
        let codec = codec_of(VR::AT);
        assert_eq!(codec.encode(&PrimitiveValue::Empty, Endianness::Little), b"");
        assert_eq!(codec.encode(&PrimitiveValue::from(""), Endianness::Little), b"");
    }

    #[test]
    fn text_round_trip_with_padding() {
        let codec = codec_of(VR::CS);
        let out = codec.encode(&PrimitiveValue::from("O"), Endianness::Little);
        assert_eq!(out, b"O ");
        assert_eq!(
            codec.decode(&out, Endianness::Little),
            Some(PrimitiveValue::from("O"))
        );

        let multi = PrimitiveValue::from(vec!["ORIGINAL".to_owned(), "PRIMARY".to_owned()]);
        let out = codec.encode(&multi, Endianness::Big);
        assert_eq!(out, b"ORIGINAL\\PRIMARY");
        assert_eq!(codec.decode(&out, Endianness::Big), Some(multi));
    }

    #[test]
    fn uid_pads_with_nul() {
        let codec = codec_of(VR::UI);
        let out = codec.encode(&PrimitiveValue::from("1.2.840.10008.1.2"), Endianness::Little);
        assert_eq!(out, b"1.2.840.10008.1.2\0");
        assert_eq!(
            codec.decode(&out, Endianness::Little),
            Some(PrimitiveValue::from("1.2.840.10008.1.2"))
        );
    }

    #[test]
    fn numeric_decoding_respects_byte_order() {
        let codec = codec_of(VR::US);
        let raw = [0x07, 0x87];
        assert_eq!(
            codec.decode(&raw, Endianness::Little),
            Some(PrimitiveValue::from(0x8707_u16))
        );
        assert_eq!(
            codec.decode(&raw, Endianness::Big),
            Some(PrimitiveValue::from(0x0787_u16))
        );
        // deviation: 3 bytes is not a multiple of 2
        assert_eq!(codec.decode(&[1, 2, 3], Endianness::Little), None);
    }

    #[test]
    fn numeric_encode_round_trip() {
        let codec = codec_of(VR::UL);
        let value = PrimitiveValue::from(vec![1_u32, 0x0300_FFCC]);
        let out = codec.encode(&value, Endianness::Big);
        assert_eq!(out, vec![0, 0, 0, 1, 0x03, 0x00, 0xFF, 0xCC]);
        assert_eq!(codec.decode(&out, Endianness::Big), Some(value));
    }

    #[test]
    fn bytes_are_kept_verbatim() {
        let codec = codec_of(VR::OB);
        let value = PrimitiveValue::from(vec![0x12_u8, 0x34]);
        assert_eq!(codec.encode(&value, Endianness::Little), vec![0x12, 0x34]);
        // odd payloads are padded with a zero byte
        assert_eq!(
            codec.encode(&PrimitiveValue::from(vec![0x12_u8]), Endianness::Little),
            vec![0x12, 0x00]
        );
    }

    #[test]
    fn byte_order_sensitivity() {
        assert!(VrKind::of(VR::AT).is_byte_order_sensitive());
        assert!(VrKind::of(VR::US).is_byte_order_sensitive());
        assert!(VrKind::of(VR::FD).is_byte_order_sensitive());
        assert!(!VrKind::of(VR::CS).is_byte_order_sensitive());
        assert!(!VrKind::of(VR::UI).is_byte_order_sensitive());
        assert!(!VrKind::of(VR::OB).is_byte_order_sensitive());
    }
}
