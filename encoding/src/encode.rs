//! Encoding of data element headers to a byte sink,
//! parameterized on byte order and VR explicitness.

use byteordered::{ByteOrdered, Endianness};
use dcmio_core::header::{Length, Tag, VR};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;

/// An error which occurred while encoding an element header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Could not write the element tag.
    #[snafu(display("Could not write tag {}: {}", tag, source))]
    WriteTag {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not write the value representation.
    #[snafu(display("Could not write VR of {}: {}", tag, source))]
    WriteVr {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not write the element length.
    #[snafu(display("Could not write length of {}: {}", tag, source))]
    WriteLength {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The value is too long for the short explicit VR length form.
    #[snafu(display("Length {} of {} overflows the 16-bit length field", len, tag))]
    LengthOverflow {
        tag: Tag,
        len: Length,
        backtrace: Backtrace,
    },
    /// An undefined length was requested for a primitive element.
    #[snafu(display("Undefined length is not valid for element {}", tag))]
    UndefinedLength { tag: Tag, backtrace: Backtrace },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// A data element header encoder for one of the uncompressed
/// transfer syntaxes, resolved at run time from the byte order
/// and VR explicitness pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEncoder {
    endianness: Endianness,
    explicit_vr: bool,
}

impl HeaderEncoder {
    /// Create a new header encoder with the given parameters.
    pub fn new(endianness: Endianness, explicit_vr: bool) -> Self {
        HeaderEncoder {
            endianness,
            explicit_vr,
        }
    }

    /// The header encoder for the file meta group,
    /// which is always explicit VR little endian
    /// regardless of the data set's transfer syntax.
    pub fn file_header() -> Self {
        HeaderEncoder::new(Endianness::Little, true)
    }

    /// The byte order under which this encoder writes.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Whether this encoder writes an explicit value representation.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Encode an element header, returning the number of bytes written.
    ///
    /// An undefined length is only admitted for SQ elements.
    pub fn encode_header<W>(&self, to: &mut W, tag: Tag, vr: VR, len: Length) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        if len.is_undefined() && vr != VR::SQ {
            return UndefinedLengthSnafu { tag }.fail();
        }

        self.write_tag(to, tag)?;

        if !self.explicit_vr {
            ByteOrdered::runtime(&mut *to, self.endianness)
                .write_u32(len.0)
                .context(WriteLengthSnafu { tag })?;
            return Ok(8);
        }

        to.write_all(&vr.to_bytes()).context(WriteVrSnafu { tag })?;

        if vr.has_reserved_length() {
            to.write_all(&[0, 0]).context(WriteVrSnafu { tag })?;
            ByteOrdered::runtime(&mut *to, self.endianness)
                .write_u32(len.0)
                .context(WriteLengthSnafu { tag })?;
            Ok(12)
        } else {
            let short_len = match len.get() {
                Some(len) if len <= u32::from(u16::MAX) => len as u16,
                _ => return LengthOverflowSnafu { tag, len }.fail(),
            };
            ByteOrdered::runtime(&mut *to, self.endianness)
                .write_u16(short_len)
                .context(WriteLengthSnafu { tag })?;
            Ok(8)
        }
    }

    /// Encode a sequence item header with the given content length.
    pub fn encode_item_header<W>(&self, to: &mut W, len: Length) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        self.write_pseudo_element(to, Tag(0xFFFE, 0xE000), len)
    }

    /// Encode an item delimiter.
    pub fn encode_item_delimiter<W>(&self, to: &mut W) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        self.write_pseudo_element(to, Tag(0xFFFE, 0xE00D), Length(0))
    }

    /// Encode a sequence delimiter.
    pub fn encode_sequence_delimiter<W>(&self, to: &mut W) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        self.write_pseudo_element(to, Tag(0xFFFE, 0xE0DD), Length(0))
    }

    fn write_pseudo_element<W>(&self, to: &mut W, tag: Tag, len: Length) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        self.write_tag(to, tag)?;
        ByteOrdered::runtime(&mut *to, self.endianness)
            .write_u32(len.0)
            .context(WriteLengthSnafu { tag })?;
        Ok(8)
    }

    fn write_tag<W>(&self, to: &mut W, tag: Tag) -> Result<()>
    where
        W: ?Sized + Write,
    {
        let mut to = ByteOrdered::runtime(&mut *to, self.endianness);
        to.write_u16(tag.group()).context(WriteTagSnafu { tag })?;
        to.write_u16(tag.element()).context(WriteTagSnafu { tag })?;
        Ok(())
    }
}
