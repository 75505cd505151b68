//! Decoding of data element headers from a byte source,
//! parameterized on byte order and VR explicitness.
//!
//! Value payloads are not interpreted here;
//! that is the role of the [value codec](crate::codec).

use byteordered::{ByteOrdered, Endianness};
use dcmio_core::header::{ElementHeader, ItemHeader, ItemHeaderError, Length, Tag, VR};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Read;

/// An error which occurred while decoding an element header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Could not read the element tag.
    #[snafu(display("Could not read tag: {}", source))]
    ReadTag {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The source ended in the middle of an element tag.
    #[snafu(display("Premature end of tag, got only {} bytes", read))]
    PrematureTag { read: usize, backtrace: Backtrace },
    /// Could not read the value representation.
    #[snafu(display("Could not read VR: {}", source))]
    ReadVr {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not read the reserved bytes of a long-form header.
    #[snafu(display("Could not read reserved field: {}", source))]
    ReadReserved {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not read the element length.
    #[snafu(display("Could not read length: {}", source))]
    ReadLength {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not read a sequence item header.
    #[snafu(display("Could not read item header: {}", source))]
    ReadItemHeader {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The bytes read do not form a valid sequence item header.
    #[snafu(display("Bad sequence item header: {}", source))]
    BadItemHeader { source: ItemHeaderError },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// A data element header decoder for one of the uncompressed
/// transfer syntaxes, resolved at run time from the byte order
/// and VR explicitness pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDecoder {
    endianness: Endianness,
    explicit_vr: bool,
}

impl HeaderDecoder {
    /// Create a new header decoder with the given parameters.
    pub fn new(endianness: Endianness, explicit_vr: bool) -> Self {
        HeaderDecoder {
            endianness,
            explicit_vr,
        }
    }

    /// The header decoder for the file meta group,
    /// which is always explicit VR little endian
    /// regardless of the data set's transfer syntax.
    pub fn file_header() -> Self {
        HeaderDecoder::new(Endianness::Little, true)
    }

    /// The byte order under which this decoder reads.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Whether this decoder expects an explicit value representation.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Decode an element header from the source.
    ///
    /// Returns `Ok(None)` on a clean end of input
    /// (no bytes available at the tag boundary).
    /// Under implicit VR the header's representation is [`VR::UN`];
    /// resolving the real VR through a data dictionary
    /// is up to the caller.
    ///
    /// Also returns the number of bytes consumed.
    pub fn decode_header<S>(&self, source: &mut S) -> Result<Option<(ElementHeader, usize)>>
    where
        S: ?Sized + Read,
    {
        let tag = match self.read_tag(source)? {
            Some(tag) => tag,
            None => return Ok(None),
        };

        // item pseudo-elements carry no VR, in either explicitness,
        // and so does every element under implicit VR
        if tag.group() == 0xFFFE || !self.explicit_vr {
            let len = ByteOrdered::runtime(&mut *source, self.endianness)
                .read_u32()
                .context(ReadLengthSnafu)?;
            return Ok(Some((
                ElementHeader::new(tag, VR::UN, Length(len)),
                8,
            )));
        }

        let mut vr_buf = [0u8; 2];
        source.read_exact(&mut vr_buf).context(ReadVrSnafu)?;
        let vr = VR::from_binary(vr_buf).unwrap_or_else(|| {
            tracing::warn!(
                tag = %tag,
                bytes = ?vr_buf,
                "unrecognized VR, reading the element as UN"
            );
            VR::UN
        });

        let (len, bytes_read) = if vr.has_reserved_length() {
            let mut reserved = [0u8; 2];
            source
                .read_exact(&mut reserved)
                .context(ReadReservedSnafu)?;
            let len = ByteOrdered::runtime(&mut *source, self.endianness)
                .read_u32()
                .context(ReadLengthSnafu)?;
            (len, 12)
        } else {
            let len = ByteOrdered::runtime(&mut *source, self.endianness)
                .read_u16()
                .context(ReadLengthSnafu)?;
            (u32::from(len), 8)
        };

        Ok(Some((
            ElementHeader::new(tag, vr, Length(len)),
            bytes_read,
        )))
    }

    /// Decode a sequence item header (item, item delimiter
    /// or sequence delimiter) from the source.
    pub fn decode_item_header<S>(&self, source: &mut S) -> Result<ItemHeader>
    where
        S: ?Sized + Read,
    {
        let mut source = ByteOrdered::runtime(&mut *source, self.endianness);
        let group = source.read_u16().context(ReadItemHeaderSnafu)?;
        let element = source.read_u16().context(ReadItemHeaderSnafu)?;
        let len = source.read_u32().context(ReadItemHeaderSnafu)?;
        ItemHeader::new(Tag(group, element), Length(len)).context(BadItemHeaderSnafu)
    }

    /// Read a tag, returning `None` on a clean end of input.
    fn read_tag<S>(&self, source: &mut S) -> Result<Option<Tag>>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 4];
        let mut read = 0;
        while read < 4 {
            let n = source.read(&mut buf[read..]).context(ReadTagSnafu)?;
            if n == 0 {
                break;
            }
            read += n;
        }
        match read {
            0 => Ok(None),
            4 => {
                let (group, element) = match self.endianness {
                    Endianness::Little => (
                        u16::from_le_bytes([buf[0], buf[1]]),
                        u16::from_le_bytes([buf[2], buf[3]]),
                    ),
                    Endianness::Big => (
                        u16::from_be_bytes([buf[0], buf[1]]),
                        u16::from_be_bytes([buf[2], buf[3]]),
                    ),
                };
                Ok(Some(Tag(group, element)))
            }
            read => PrematureTagSnafu { read }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // manually crafted data elements in explicit VR little endian
    #[rustfmt::skip]
    const RAW_EXPLICIT_LE: &[u8] = &[
        0x72, 0x00, 0x26, 0x00,     // (0072,0026) Selector Attribute
            b'A', b'T',             // VR: AT
            0x04, 0x00,             // Length: 4 bytes
                0x28, 0x00, 0x10, 0x21,
        0x08, 0x00, 0x1B, 0x04,     // (0008,041B) RecordKey
            b'O', b'B',             // VR: OB
            0x00, 0x00,             // Reserved
            0x02, 0x00, 0x00, 0x00, // Length: 2 bytes
                0x12, 0x34,
    ];

    // the same two elements in explicit VR big endian
    #[rustfmt::skip]
    const RAW_EXPLICIT_BE: &[u8] = &[
        0x00, 0x72, 0x00, 0x26,
            b'A', b'T',
            0x00, 0x04,
                0x00, 0x28, 0x21, 0x10,
        0x00, 0x08, 0x04, 0x1B,
            b'O', b'B',
            0x00, 0x00,
            0x00, 0x00, 0x00, 0x02,
                0x12, 0x34,
    ];

    // one element in implicit VR little endian
    #[rustfmt::skip]
    const RAW_IMPLICIT_LE: &[u8] = &[
        0x10, 0x00, 0x10, 0x00,     // (0010,0010) Patient Name
            0x08, 0x00, 0x00, 0x00, // Length: 8 bytes
                b'D', b'o', b'e', b'^', b'J', b'o', b'h', b'n',
    ];

    fn skip(cursor: &mut Cursor<&[u8]>, n: u64) {
        cursor.set_position(cursor.position() + n);
    }

    #[test]
    fn decode_explicit_le_headers() {
        let dec = HeaderDecoder::new(Endianness::Little, true);
        let mut cursor = Cursor::new(RAW_EXPLICIT_LE);

        let (header, bytes_read) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0072, 0x0026), VR::AT, Length(4)));
        assert_eq!(bytes_read, 8);
        skip(&mut cursor, 4);

        let (header, bytes_read) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0008, 0x041B), VR::OB, Length(2)));
        assert_eq!(bytes_read, 12);
        skip(&mut cursor, 2);

        // clean end of input
        assert_eq!(dec.decode_header(&mut cursor).unwrap(), None);
    }

    #[test]
    fn decode_explicit_be_headers() {
        let dec = HeaderDecoder::new(Endianness::Big, true);
        let mut cursor = Cursor::new(RAW_EXPLICIT_BE);

        let (header, _) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0072, 0x0026), VR::AT, Length(4)));
        skip(&mut cursor, 4);

        let (header, _) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0008, 0x041B), VR::OB, Length(2)));
    }

    #[test]
    fn decode_implicit_le_header_as_un() {
        let dec = HeaderDecoder::new(Endianness::Little, false);
        let mut cursor = Cursor::new(RAW_IMPLICIT_LE);

        let (header, bytes_read) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0010, 0x0010), VR::UN, Length(8)));
        assert_eq!(bytes_read, 8);
    }

    #[test]
    fn decode_item_headers() {
        // (FFFE,E000) with undefined length, then both delimiters
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let dec = HeaderDecoder::new(Endianness::Little, true);
        let mut cursor = Cursor::new(raw);

        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            ItemHeader::Item {
                len: Length::UNDEFINED
            }
        );
        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            ItemHeader::ItemDelimiter
        );
        assert_eq!(
            dec.decode_item_header(&mut cursor).unwrap(),
            ItemHeader::SequenceDelimiter
        );
    }

    #[test]
    fn unrecognized_vr_is_read_as_un() {
        // (0008,0018) with VR bytes "ZZ", long length form
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x08, 0x00, 0x18, 0x00,
                b'Z', b'Z',
                0x00, 0x00,
                0x02, 0x00, 0x00, 0x00,
                    0x12, 0x34,
        ];
        let dec = HeaderDecoder::new(Endianness::Little, true);
        let mut cursor = Cursor::new(raw);
        let (header, bytes_read) = dec.decode_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header, ElementHeader::new(Tag(0x0008, 0x0018), VR::UN, Length(2)));
        assert_eq!(bytes_read, 12);
    }

    #[test]
    fn truncated_tag_is_an_error() {
        let dec = HeaderDecoder::new(Endianness::Little, true);
        let mut cursor = Cursor::new(&[0x10u8, 0x00][..]);
        assert!(matches!(
            dec.decode_header(&mut cursor),
            Err(Error::PrematureTag { read: 2, .. })
        ));
    }
}
