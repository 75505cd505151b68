//! Writing data objects to files and arbitrary sinks.

use dcmio_core::header::Length;
use dcmio_encoding::encode::HeaderEncoder;
use snafu::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::mem::{DataObject, InMemDataSet};
use crate::meta::FileMetaTableBuilder;
use crate::{
    CreateFileSnafu, EncodeHeaderSnafu, Result, UnsupportedTransferSyntaxSnafu, WriteMetaSnafu,
    WritePreambleSnafu, WriteValueSnafu,
};

impl DataObject {
    /// Write this object to a file:
    /// 128-byte preamble, magic code, meta group and data set.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).context(CreateFileSnafu { filename: path })?;
        self.write_to(BufWriter::new(file))
    }

    /// Write this object to an arbitrary sink.
    ///
    /// The meta group goes out in explicit VR little endian and the
    /// data set in the object's current transfer syntax, elements in
    /// insertion order. Sequences are written with undefined lengths
    /// and explicit delimiters. If the object carries no meta table,
    /// a minimal one is derived from the transfer syntax.
    pub fn write_to<W: Write>(&self, mut to: W) -> Result<()> {
        let ts = self.transfer_syntax();
        let encoder = ts
            .encoder()
            .context(UnsupportedTransferSyntaxSnafu { uid: ts.uid() })?;

        to.write_all(&[0u8; 128]).context(WritePreambleSnafu)?;
        match self.meta() {
            Some(meta) => meta.write_to(&mut to).context(WriteMetaSnafu)?,
            None => FileMetaTableBuilder::new()
                .transfer_syntax(ts.uid())
                .build()
                .context(WriteMetaSnafu)?
                .write_to(&mut to)
                .context(WriteMetaSnafu)?,
        }

        write_dataset(&mut to, self.dataset(), &encoder)
    }
}

/// Write every element of a data set, in insertion order.
fn write_dataset<W>(to: &mut W, dataset: &InMemDataSet, encoder: &HeaderEncoder) -> Result<()>
where
    W: ?Sized + Write,
{
    for elem in dataset.iter() {
        let tag = elem.tag();
        if let Some(items) = elem.items() {
            encoder
                .encode_header(to, tag, elem.vr(), Length::UNDEFINED)
                .context(EncodeHeaderSnafu)?;
            for item in items {
                encoder
                    .encode_item_header(to, Length::UNDEFINED)
                    .context(EncodeHeaderSnafu)?;
                write_dataset(to, item, encoder)?;
                encoder
                    .encode_item_delimiter(to)
                    .context(EncodeHeaderSnafu)?;
            }
            encoder
                .encode_sequence_delimiter(to)
                .context(EncodeHeaderSnafu)?;
        } else if let Some(data) = elem.raw_data() {
            // payload bytes are even-length by codec contract
            encoder
                .encode_header(to, tag, elem.vr(), Length(data.len() as u32))
                .context(EncodeHeaderSnafu)?;
            to.write_all(data).context(WriteValueSnafu { tag })?;
        }
    }
    Ok(())
}
