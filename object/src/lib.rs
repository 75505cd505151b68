#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! This crate contains a high-level abstraction for reading,
//! manipulating and writing DICOM data objects.
//!
//! A [`DataObject`] owns a tree of data elements and is bound to a
//! transfer syntax, which determines the byte order and VR
//! explicitness of every encoded payload in the tree. The
//! [`Parent`] trait is the common capability of element containers:
//! the root object and every sequence item support the same
//! add/lookup/delete surface, addressed by [`Tag`] or by tag text
//! in the `GGGG,EEEE` form.
//!
//! # Example
//!
//! ```no_run
//! use dcmio_object::{DataObject, InMemElement, Parent, Tag, VR};
//! use dcmio_encoding::transfer_syntax::entries;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut obj = DataObject::open_file("0001.dcm")?;
//! obj.add(InMemElement::new(
//!     Tag(0x0072, 0x0026),
//!     VR::AT,
//!     Tag(0x0028, 0x2110),
//! ));
//! obj.set_transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN)?;
//! obj.write_to_file("0001_be.dcm")?;
//! # Ok(())
//! # }
//! ```

pub mod element;
pub mod mem;
pub mod meta;
mod read;
mod write;

pub use crate::element::InMemElement;
pub use crate::mem::{DataObject, InMemDataSet};
pub use crate::meta::{FileMetaTable, FileMetaTableBuilder};
pub use dcmio_core::dictionary::{DataDictionary, StubDictionary};
pub use dcmio_core::header::{InvalidTagFormat, Tag, VR};
pub use dcmio_core::value::PrimitiveValue;

use dcmio_encoding::{decode, encode};
use snafu::{Backtrace, Snafu};
use std::path::PathBuf;

/// An error reading or writing a data object.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Could not open the given file.
    #[snafu(display("Could not open file '{}': {}", filename.display(), source))]
    OpenFile {
        filename: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not create the given file.
    #[snafu(display("Could not create file '{}': {}", filename.display(), source))]
    CreateFile {
        filename: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// Could not consume the file preamble.
    #[snafu(display("Could not read preamble: {}", source))]
    ReadPreamble {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The magic code `DICM` is not where it should be.
    #[snafu(display("Invalid magic code"))]
    InvalidMagicCode { backtrace: Backtrace },
    /// The file meta group could not be read.
    #[snafu(display("Could not read file meta group: {}", source))]
    ReadMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    /// The file preamble could not be written.
    #[snafu(display("Could not write preamble: {}", source))]
    WritePreamble {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The file meta group could not be written.
    #[snafu(display("Could not write file meta group: {}", source))]
    WriteMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    /// The declared transfer syntax is not in the registry.
    #[snafu(display("Unknown transfer syntax '{}'", uid))]
    UnknownTransferSyntax { uid: String, backtrace: Backtrace },
    /// The transfer syntax is known but cannot be processed.
    #[snafu(display("Unsupported transfer syntax '{}'", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },
    /// An element header could not be decoded.
    #[snafu(display("Could not decode element header: {}", source))]
    DecodeHeader {
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// An element value could not be read.
    #[snafu(display("Could not read value of {}: {}", tag, source))]
    ReadValue {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The data set ended in the middle of a sequence or item.
    #[snafu(display("Premature end of data set"))]
    PrematureEnd { backtrace: Backtrace },
    /// A delimiter or item appeared where it is not allowed.
    #[snafu(display("Unexpected token {}", tag))]
    UnexpectedToken { tag: Tag, backtrace: Backtrace },
    /// An element header could not be encoded.
    #[snafu(display("Could not encode element header: {}", source))]
    EncodeHeader {
        #[snafu(backtrace)]
        source: encode::Error,
    },
    /// An element value could not be written.
    #[snafu(display("Could not write value of {}: {}", tag, source))]
    WriteValue {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

/// The result of a data object operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The capability of holding data elements:
/// the root data set and every sequence item offer the same surface.
///
/// Lookup operations exist in two forms:
/// by [`Tag`], and by tag text in the `GGGG,EEEE` form
/// (case insensitive; anything else is an [`InvalidTagFormat`]).
pub trait Parent {
    /// Insert an element, replacing and returning any element
    /// previously held under the same tag.
    /// A replaced element keeps its original position;
    /// a new one goes to the end.
    fn add(&mut self, elem: InMemElement) -> Option<InMemElement>;

    /// Obtain the element with the given tag.
    fn element(&self, tag: Tag) -> Option<&InMemElement>;

    /// Obtain the element with the given tag, mutable.
    fn element_mut(&mut self, tag: Tag) -> Option<&mut InMemElement>;

    /// The elements of the given group, in insertion order.
    fn group(&self, group: u16) -> Vec<&InMemElement>;

    /// Remove and return the element with the given tag.
    /// Removing an absent element does nothing.
    fn delete(&mut self, tag: Tag) -> Option<InMemElement>;

    /// Remove every element of the given group,
    /// returning how many were removed.
    fn delete_group(&mut self, group: u16) -> usize;

    /// Whether an element with the given tag is present.
    fn exists(&self, tag: Tag) -> bool {
        self.element(tag).is_some()
    }

    /// The decoded value of the element with the given tag,
    /// if the element is present and its payload holds a value.
    fn value(&self, tag: Tag) -> Option<&PrimitiveValue> {
        self.element(tag).and_then(InMemElement::value)
    }

    /// Obtain the element addressed by tag text.
    fn element_at(&self, tag: &str) -> Result<Option<&InMemElement>, InvalidTagFormat> {
        Ok(self.element(tag.parse()?))
    }

    /// Whether the element addressed by tag text is present.
    fn exists_at(&self, tag: &str) -> Result<bool, InvalidTagFormat> {
        Ok(self.exists(tag.parse()?))
    }

    /// The decoded value of the element addressed by tag text.
    fn value_at(&self, tag: &str) -> Result<Option<&PrimitiveValue>, InvalidTagFormat> {
        Ok(self.value(tag.parse()?))
    }

    /// Remove the element addressed by tag text.
    fn delete_at(&mut self, tag: &str) -> Result<Option<InMemElement>, InvalidTagFormat> {
        Ok(self.delete(tag.parse()?))
    }

    /// The elements of the group addressed by its 4-digit hex text.
    fn group_at(&self, group: &str) -> Result<Vec<&InMemElement>, InvalidTagFormat> {
        Ok(self.group(Tag::parse_group(group)?))
    }

    /// Remove every element of the group addressed by its
    /// 4-digit hex text.
    fn delete_group_at(&mut self, group: &str) -> Result<usize, InvalidTagFormat> {
        Ok(self.delete_group(Tag::parse_group(group)?))
    }
}
