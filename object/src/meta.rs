//! File meta group support.
//!
//! The file meta group (group 0002) precedes the data set in a
//! stored file and declares, among other things, the transfer
//! syntax of that data set. The group itself is always encoded
//! in explicit VR little endian, no matter what the data set uses.

use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmio_core::header::{Length, Tag, VR};
use dcmio_encoding::decode::{self, HeaderDecoder};
use dcmio_encoding::encode::{self, HeaderEncoder};
use dcmio_encoding::transfer_syntax::TransferSyntax;
use snafu::{Backtrace, ensure, ResultExt, Snafu};
use std::io::{Cursor, Read, Write};

const MAGIC_CODE: &[u8; 4] = b"DICM";

const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.1441";
const IMPLEMENTATION_VERSION_NAME: &str = "DCMIO 0.1";

/// An error reading, writing or building a file meta table.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Could not read the magic code.
    #[snafu(display("Could not read magic code: {}", source))]
    ReadMagicCode {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The magic code `DICM` is not where it should be.
    #[snafu(display("Invalid magic code"))]
    NotDicom { backtrace: Backtrace },
    /// Could not decode a meta group element header.
    #[snafu(display("Could not decode element header: {}", source))]
    DecodeElement {
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// Could not read a meta group element value.
    #[snafu(display("Could not read value of {}: {}", tag, source))]
    ReadValue {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The first meta group element is not the group length.
    #[snafu(display("Expected group length (0002,0000), found {}", tag))]
    MissingGroupLength { tag: Tag, backtrace: Backtrace },
    /// The source ended before the meta group did.
    #[snafu(display("Premature end of file meta group"))]
    PrematureEnd { backtrace: Backtrace },
    /// A text value in the meta group is not valid UTF-8.
    #[snafu(display("Invalid text in element {}", tag))]
    InvalidText {
        tag: Tag,
        source: std::string::FromUtf8Error,
        backtrace: Backtrace,
    },
    /// Could not encode a meta group element header.
    #[snafu(display("Could not encode element header: {}", source))]
    EncodeElement {
        #[snafu(backtrace)]
        source: encode::Error,
    },
    /// Could not write a meta group byte chunk.
    #[snafu(display("Could not write meta group: {}", source))]
    WriteChunk {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// A mandatory attribute is missing from the builder.
    #[snafu(display("Missing {} in file meta table builder", name))]
    MissingField {
        name: &'static str,
        backtrace: Backtrace,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// The parsed attributes of a file meta group.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// Number of bytes of meta group elements after the group length.
    information_group_length: u32,
    /// Media Storage SOP Class UID (0002,0002).
    pub media_storage_sop_class_uid: String,
    /// Media Storage SOP Instance UID (0002,0003).
    pub media_storage_sop_instance_uid: String,
    /// Transfer Syntax UID (0002,0010).
    pub transfer_syntax: String,
    /// Implementation Class UID (0002,0012).
    pub implementation_class_uid: String,
    /// Implementation Version Name (0002,0013).
    pub implementation_version_name: Option<String>,
}

fn read_string<S>(source: &mut S, tag: Tag, len: u32) -> Result<String>
where
    S: ?Sized + Read,
{
    let mut buf = vec![0u8; len as usize];
    source.read_exact(&mut buf).context(ReadValueSnafu { tag })?;
    let text = String::from_utf8(buf).context(InvalidTextSnafu { tag })?;
    Ok(text
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string())
}

impl FileMetaTable {
    /// Read a file meta table from a source positioned at
    /// the `DICM` magic code (right after any preamble).
    pub fn from_reader<R: Read>(mut source: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        source.read_exact(&mut magic).context(ReadMagicCodeSnafu)?;
        ensure!(&magic == MAGIC_CODE, NotDicomSnafu);
        FileMetaTable::read_group(source)
    }

    pub(crate) fn read_group<R: Read>(mut source: R) -> Result<Self> {
        let decoder = HeaderDecoder::file_header();

        // the group length element bounds the rest of the group
        let (header, _) = decoder
            .decode_header(&mut source)
            .context(DecodeElementSnafu)?
            .ok_or_else(|| PrematureEndSnafu.build())?;
        ensure!(
            header.tag() == Tag(0x0002, 0x0000),
            MissingGroupLengthSnafu { tag: header.tag() }
        );
        let mut buf = [0u8; 4];
        source
            .read_exact(&mut buf)
            .context(ReadValueSnafu { tag: header.tag() })?;
        let group_length = LittleEndian::read_u32(&buf);

        let mut group = vec![0u8; group_length as usize];
        source
            .read_exact(&mut group)
            .context(ReadValueSnafu {
                tag: Tag(0x0002, 0x0000),
            })?;
        let mut cursor = Cursor::new(&group[..]);

        let mut media_storage_sop_class_uid = String::new();
        let mut media_storage_sop_instance_uid = String::new();
        let mut transfer_syntax = String::new();
        let mut implementation_class_uid = String::new();
        let mut implementation_version_name = None;

        while let Some((header, _)) = decoder
            .decode_header(&mut cursor)
            .context(DecodeElementSnafu)?
        {
            let tag = header.tag();
            let len = header.length().get().unwrap_or(0);
            match (tag.group(), tag.element()) {
                (0x0002, 0x0002) => {
                    media_storage_sop_class_uid = read_string(&mut cursor, tag, len)?;
                }
                (0x0002, 0x0003) => {
                    media_storage_sop_instance_uid = read_string(&mut cursor, tag, len)?;
                }
                (0x0002, 0x0010) => {
                    transfer_syntax = read_string(&mut cursor, tag, len)?;
                }
                (0x0002, 0x0012) => {
                    implementation_class_uid = read_string(&mut cursor, tag, len)?;
                }
                (0x0002, 0x0013) => {
                    implementation_version_name = Some(read_string(&mut cursor, tag, len)?);
                }
                _ => {
                    // not interpreted, skip the value
                    let mut skipped = vec![0u8; len as usize];
                    cursor
                        .read_exact(&mut skipped)
                        .context(ReadValueSnafu { tag })?;
                }
            }
        }

        Ok(FileMetaTable {
            information_group_length: group_length,
            media_storage_sop_class_uid,
            media_storage_sop_instance_uid,
            transfer_syntax,
            implementation_class_uid,
            implementation_version_name,
        })
    }

    /// The declared transfer syntax UID, without trailing padding.
    pub fn transfer_syntax(&self) -> &str {
        self.transfer_syntax
            .trim_end_matches(|c: char| c == '\0' || c == ' ')
    }

    /// Point this table at another transfer syntax.
    pub fn set_transfer_syntax(&mut self, ts: &TransferSyntax) {
        self.transfer_syntax = ts.uid().to_string();
        self.update_information_group_length();
    }

    fn update_information_group_length(&mut self) {
        // (0002,0001) File Meta Information Version, 12 + 2 bytes
        let mut length = 14;
        length += 8 + padded_len(&self.media_storage_sop_class_uid);
        length += 8 + padded_len(&self.media_storage_sop_instance_uid);
        length += 8 + padded_len(&self.transfer_syntax);
        length += 8 + padded_len(&self.implementation_class_uid);
        if let Some(name) = &self.implementation_version_name {
            length += 8 + padded_len(name);
        }
        self.information_group_length = length;
    }

    /// Write the magic code and the whole meta group,
    /// in explicit VR little endian.
    pub fn write_to<W: Write>(&self, mut to: W) -> Result<()> {
        let encoder = HeaderEncoder::file_header();

        to.write_all(MAGIC_CODE).context(WriteChunkSnafu)?;

        encoder
            .encode_header(&mut to, Tag(0x0002, 0x0000), VR::UL, Length(4))
            .context(EncodeElementSnafu)?;
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.information_group_length);
        to.write_all(&buf).context(WriteChunkSnafu)?;

        encoder
            .encode_header(&mut to, Tag(0x0002, 0x0001), VR::OB, Length(2))
            .context(EncodeElementSnafu)?;
        to.write_all(&[0x00, 0x01]).context(WriteChunkSnafu)?;

        self.write_uid(&mut to, &encoder, Tag(0x0002, 0x0002), &self.media_storage_sop_class_uid)?;
        self.write_uid(
            &mut to,
            &encoder,
            Tag(0x0002, 0x0003),
            &self.media_storage_sop_instance_uid,
        )?;
        self.write_uid(&mut to, &encoder, Tag(0x0002, 0x0010), &self.transfer_syntax)?;
        self.write_uid(
            &mut to,
            &encoder,
            Tag(0x0002, 0x0012),
            &self.implementation_class_uid,
        )?;
        if let Some(name) = &self.implementation_version_name {
            self.write_text(&mut to, &encoder, Tag(0x0002, 0x0013), VR::SH, name, b' ')?;
        }
        Ok(())
    }

    fn write_uid<W: Write>(
        &self,
        to: &mut W,
        encoder: &HeaderEncoder,
        tag: Tag,
        value: &str,
    ) -> Result<()> {
        self.write_text(to, encoder, tag, VR::UI, value, b'\0')
    }

    fn write_text<W: Write>(
        &self,
        to: &mut W,
        encoder: &HeaderEncoder,
        tag: Tag,
        vr: VR,
        value: &str,
        pad: u8,
    ) -> Result<()> {
        let len = padded_len(value);
        encoder
            .encode_header(to, tag, vr, Length(len))
            .context(EncodeElementSnafu)?;
        to.write_all(value.as_bytes()).context(WriteChunkSnafu)?;
        if value.len() as u32 != len {
            to.write_all(&[pad]).context(WriteChunkSnafu)?;
        }
        Ok(())
    }
}

fn padded_len(text: &str) -> u32 {
    let len = text.len() as u32;
    len + (len & 1)
}

/// A builder for [`FileMetaTable`].
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
}

impl FileMetaTableBuilder {
    /// Create a builder with no attributes filled in.
    pub fn new() -> Self {
        FileMetaTableBuilder::default()
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid(mut self, value: impl Into<String>) -> Self {
        self.media_storage_sop_class_uid = Some(value.into());
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid(mut self, value: impl Into<String>) -> Self {
        self.media_storage_sop_instance_uid = Some(value.into());
        self
    }

    /// Define the transfer syntax of the data set.
    pub fn transfer_syntax(mut self, value: impl Into<String>) -> Self {
        self.transfer_syntax = Some(value.into());
        self
    }

    /// Define the implementation class UID.
    pub fn implementation_class_uid(mut self, value: impl Into<String>) -> Self {
        self.implementation_class_uid = Some(value.into());
        self
    }

    /// Define the implementation version name.
    pub fn implementation_version_name(mut self, value: impl Into<String>) -> Self {
        self.implementation_version_name = Some(value.into());
        self
    }

    /// Build the table. The transfer syntax is mandatory;
    /// the implementation attributes default to this crate's.
    pub fn build(self) -> Result<FileMetaTable> {
        let transfer_syntax = self
            .transfer_syntax
            .ok_or_else(|| MissingFieldSnafu { name: "TransferSyntax" }.build())?;
        let mut table = FileMetaTable {
            information_group_length: 0,
            media_storage_sop_class_uid: self.media_storage_sop_class_uid.unwrap_or_default(),
            media_storage_sop_instance_uid: self
                .media_storage_sop_instance_uid
                .unwrap_or_default(),
            transfer_syntax,
            implementation_class_uid: self
                .implementation_class_uid
                .unwrap_or_else(|| IMPLEMENTATION_CLASS_UID.to_string()),
            implementation_version_name: Some(
                self.implementation_version_name
                    .unwrap_or_else(|| IMPLEMENTATION_VERSION_NAME.to_string()),
            ),
        };
        table.update_information_group_length();
        Ok(table)
    }
}
