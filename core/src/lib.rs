#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! This is the core library of dcmio,
//! containing the data structures shared by the rest of the project.
//!
//! The current structure of this crate is as follows:
//!
//! - [`header`] comprises the basic data types of a data element:
//!   the attribute tag, the value representation and the element header.
//! - [`value`] holds the decoded representation of standard element values,
//!   with awareness of multiplicity.
//! - [`dictionary`] describes the behavior of data dictionaries,
//!   which translate an attribute tag to its value representation.
//!
//! [`dictionary`]: ./dictionary/index.html
//! [`header`]: ./header/index.html
//! [`value`]: ./value/index.html

pub mod dictionary;
pub mod header;
pub mod value;

pub use dictionary::{DataDictionary, StubDictionary};
pub use header::{ElementHeader, InvalidTagFormat, Length, Tag, VR};
pub use value::PrimitiveValue;

// re-export crates that are part of the public API
pub use smallvec;
