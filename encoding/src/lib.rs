#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! Encoding and decoding primitives for dcmio.
//!
//! This crate hosts everything that depends on the active byte order:
//!
//! - [`codec`] is the value codec:
//!   an immutable table mapping each value representation
//!   to a binary decode/encode function pair.
//! - [`decode`] and [`encode`] handle data element headers
//!   for the uncompressed transfer syntaxes,
//!   parameterized on byte order and VR explicitness.
//! - [`transfer_syntax`] contains the transfer syntax descriptor
//!   and the UID registry.

pub mod codec;
pub mod decode;
pub mod encode;
pub mod transfer_syntax;

pub use codec::{codec_of, VrCodec, VrKind};
pub use decode::HeaderDecoder;
pub use encode::HeaderEncoder;
pub use transfer_syntax::{registry, TransferSyntax};

// re-export the byte order types that are part of the public API
pub use byteordered::Endianness;
