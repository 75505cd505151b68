//! Reading data objects from files and arbitrary sources.

use dcmio_core::dictionary::{DataDictionary, StubDictionary};
use dcmio_core::header::{ElementHeader, ItemHeader, Tag, VR};
use dcmio_encoding::decode::HeaderDecoder;
use dcmio_encoding::transfer_syntax::registry;
use snafu::{ensure, OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::element::InMemElement;
use crate::mem::{DataObject, InMemDataSet};
use crate::meta::FileMetaTable;
use crate::{
    DecodeHeaderSnafu, InvalidMagicCodeSnafu, OpenFileSnafu, PrematureEndSnafu, ReadMetaSnafu,
    ReadPreambleSnafu, ReadValueSnafu, Result, UnexpectedTokenSnafu, UnknownTransferSyntaxSnafu,
    UnsupportedTransferSyntaxSnafu,
};

impl DataObject {
    /// Read an object from a file, using no data dictionary.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_file_with_dict(path, &StubDictionary)
    }

    /// Read an object from a file, resolving implicit-VR elements
    /// through the given data dictionary.
    pub fn open_file_with_dict<P, D>(path: P, dict: &D) -> Result<Self>
    where
        P: AsRef<Path>,
        D: DataDictionary,
    {
        let path = path.as_ref();
        let file = File::open(path).context(OpenFileSnafu { filename: path })?;
        Self::from_reader_with_dict(BufReader::new(file), dict)
    }

    /// Read an object from an arbitrary source,
    /// using no data dictionary.
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Self::from_reader_with_dict(source, &StubDictionary)
    }

    /// Read an object from an arbitrary source.
    ///
    /// The source may start with the 128-byte preamble or
    /// directly with the `DICM` magic code. The file meta group
    /// follows, in explicit VR little endian, and declares the
    /// transfer syntax of the data set after it.
    pub fn from_reader_with_dict<R, D>(mut source: R, dict: &D) -> Result<Self>
    where
        R: Read,
        D: DataDictionary,
    {
        let mut head = [0u8; 4];
        source.read_exact(&mut head).context(ReadPreambleSnafu)?;
        if &head != b"DICM" {
            // assume a preamble and look for the magic code after it
            let mut rest = [0u8; 124];
            source.read_exact(&mut rest).context(ReadPreambleSnafu)?;
            source.read_exact(&mut head).context(ReadPreambleSnafu)?;
            ensure!(&head == b"DICM", InvalidMagicCodeSnafu);
        }
        let meta = FileMetaTable::read_group(&mut source).context(ReadMetaSnafu)?;

        let uid = meta.transfer_syntax();
        let ts = registry()
            .get(uid)
            .context(UnknownTransferSyntaxSnafu { uid })?;
        let decoder = ts
            .decoder()
            .context(UnsupportedTransferSyntaxSnafu { uid })?;
        tracing::debug!(uid, "reading data set");

        let dataset = read_dataset_to_end(&mut source, &decoder, dict)?;
        Ok(DataObject::from_parts(dataset, *ts, Some(meta)))
    }
}

/// Read data elements until the source is cleanly exhausted.
fn read_dataset_to_end<S, D>(
    source: &mut S,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<InMemDataSet>
where
    S: ?Sized + Read,
    D: ?Sized + DataDictionary,
{
    let mut dataset = InMemDataSet::new();
    while let Some((header, _)) = decoder.decode_header(source).context(DecodeHeaderSnafu)? {
        ensure!(
            header.tag().group() != 0xFFFE,
            UnexpectedTokenSnafu { tag: header.tag() }
        );
        dataset.put(read_element(header, source, decoder, dict)?);
    }
    Ok(dataset)
}

/// Read data elements of one undefined-length item,
/// up to and including the item delimiter.
fn read_dataset_until_delimiter<S, D>(
    source: &mut S,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<InMemDataSet>
where
    S: ?Sized + Read,
    D: ?Sized + DataDictionary,
{
    let mut dataset = InMemDataSet::new();
    loop {
        let (header, _) = decoder
            .decode_header(source)
            .context(DecodeHeaderSnafu)?
            .context(PrematureEndSnafu)?;
        if header.tag() == Tag(0xFFFE, 0xE00D) {
            return Ok(dataset);
        }
        ensure!(
            header.tag().group() != 0xFFFE,
            UnexpectedTokenSnafu { tag: header.tag() }
        );
        dataset.put(read_element(header, source, decoder, dict)?);
    }
}

fn read_element<S, D>(
    header: ElementHeader,
    source: &mut S,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<InMemElement>
where
    S: ?Sized + Read,
    D: ?Sized + DataDictionary,
{
    let tag = header.tag();
    let vr = if decoder.explicit_vr() {
        header.vr()
    } else {
        dict.vr_of(tag).unwrap_or(VR::UN)
    };

    // a sequence either declares itself through its VR or,
    // under implicit VR, betrays itself by an undefined length
    if vr == VR::SQ || header.length().is_undefined() {
        let items = match header.length().get() {
            None => read_items(source, decoder, dict)?,
            Some(len) => {
                let mut buf = vec![0u8; len as usize];
                source.read_exact(&mut buf).context(ReadValueSnafu { tag })?;
                let mut cursor = Cursor::new(&buf[..]);
                read_items_sized(&mut cursor, len as u64, decoder, dict)?
            }
        };
        return Ok(InMemElement::new_sequence(tag, items));
    }

    let len = header.length().get().unwrap_or(0);
    let mut data = vec![0u8; len as usize];
    source.read_exact(&mut data).context(ReadValueSnafu { tag })?;
    Ok(InMemElement::from_raw(tag, vr, data, decoder.endianness()))
}

/// Read sequence items up to and including the sequence delimiter.
fn read_items<S, D>(
    source: &mut S,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<Vec<InMemDataSet>>
where
    S: ?Sized + Read,
    D: ?Sized + DataDictionary,
{
    let mut items = Vec::new();
    loop {
        match decoder
            .decode_item_header(source)
            .context(DecodeHeaderSnafu)?
        {
            ItemHeader::Item { len } => {
                items.push(read_one_item(source, len.get(), decoder, dict)?);
            }
            ItemHeader::SequenceDelimiter => return Ok(items),
            ItemHeader::ItemDelimiter => {
                return UnexpectedTokenSnafu {
                    tag: Tag(0xFFFE, 0xE00D),
                }
                .fail()
            }
        }
    }
}

/// Read the sequence items of a defined-length sequence
/// from an in-memory slice of exactly `len` bytes.
fn read_items_sized<D>(
    cursor: &mut Cursor<&[u8]>,
    len: u64,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<Vec<InMemDataSet>>
where
    D: ?Sized + DataDictionary,
{
    let mut items = Vec::new();
    while cursor.position() < len {
        match decoder
            .decode_item_header(cursor)
            .context(DecodeHeaderSnafu)?
        {
            ItemHeader::Item { len } => {
                items.push(read_one_item(cursor, len.get(), decoder, dict)?);
            }
            other => return UnexpectedTokenSnafu { tag: other.tag() }.fail(),
        }
    }
    Ok(items)
}

fn read_one_item<S, D>(
    source: &mut S,
    len: Option<u32>,
    decoder: &HeaderDecoder,
    dict: &D,
) -> Result<InMemDataSet>
where
    S: ?Sized + Read,
    D: ?Sized + DataDictionary,
{
    match len {
        // an undefined-length item runs until its delimiter
        None => read_dataset_until_delimiter(source, decoder, dict),
        Some(len) => {
            let mut buf = vec![0u8; len as usize];
            source.read_exact(&mut buf).context(ReadValueSnafu {
                tag: Tag(0xFFFE, 0xE000),
            })?;
            let mut cursor = Cursor::new(&buf[..]);
            read_dataset_to_end(&mut cursor, decoder, dict)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DataObject, Parent, Tag};
    use byteordered::Endianness;
    use dcmio_core::header::VR;

    // a complete file: no preamble, meta group, one AT element
    // and one two-item sequence in explicit VR little endian
    #[rustfmt::skip]
    const RAW_FILE: &[u8] = &[
        b'D', b'I', b'C', b'M',
        0x02, 0x00, 0x00, 0x00,     // (0002,0000) Group Length
            b'U', b'L', 0x04, 0x00,
            0x1C, 0x00, 0x00, 0x00, // 28 bytes
        0x02, 0x00, 0x10, 0x00,     // (0002,0010) Transfer Syntax UID
            b'U', b'I', 0x14, 0x00,
            b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.',
            b'1', b'0', b'0', b'0', b'8', b'.', b'1', b'.',
            b'2', b'.', b'1', 0x00,
        // data set
        0x72, 0x00, 0x26, 0x00,     // (0072,0026) Selector Attribute
            b'A', b'T', 0x04, 0x00,
            0x28, 0x00, 0x10, 0x21,
        0x40, 0x00, 0x60, 0x02,     // (0040,0260) Performed Protocol Code Sequence
            b'S', b'Q', 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF, // undefined length
            // item 1, undefined length
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
                0x72, 0x00, 0x26, 0x00,
                    b'A', b'T', 0x04, 0x00,
                    0xB0, 0x10, 0xA0, 0xC0,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            // item 2, defined length
            0xFE, 0xFF, 0x00, 0xE0, 0x0C, 0x00, 0x00, 0x00,
                0x10, 0x00, 0x10, 0x00,
                    b'P', b'N', 0x04, 0x00,
                    b'D', b'o', b'e', b' ',
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn read_a_crafted_file() {
        let obj = DataObject::from_reader(RAW_FILE).unwrap();
        assert_eq!(obj.transfer_syntax().uid(), "1.2.840.10008.1.2.1");
        assert_eq!(obj.transfer_syntax().endianness(), Endianness::Little);

        let elem = obj.element(Tag(0x0072, 0x0026)).unwrap();
        assert_eq!(elem.vr(), VR::AT);
        assert_eq!(elem.value().unwrap().tag(), Ok(Tag(0x0028, 0x2110)));

        let seq = obj.element(Tag(0x0040, 0x0260)).unwrap();
        let items = seq.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].get(Tag(0x0072, 0x0026)).unwrap().value().unwrap().tag(),
            Ok(Tag(0x10B0, 0xC0A0))
        );
        assert_eq!(
            items[1].get(Tag(0x0010, 0x0010)).unwrap().value().unwrap().string(),
            Ok("Doe")
        );
    }

    #[test]
    fn preamble_is_skipped_when_present() {
        let mut with_preamble = vec![0u8; 128];
        with_preamble.extend_from_slice(RAW_FILE);
        let obj = DataObject::from_reader(&with_preamble[..]).unwrap();
        assert!(obj.exists(Tag(0x0072, 0x0026)));
    }

    #[test]
    fn garbage_is_not_an_object() {
        let garbage = vec![0xAAu8; 256];
        assert!(DataObject::from_reader(&garbage[..]).is_err());
    }
}
