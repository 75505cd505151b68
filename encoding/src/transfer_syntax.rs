//! Transfer syntax descriptors and the global registry.
//!
//! A [`TransferSyntax`] names one way of encoding a data set:
//! a unique identifier, a byte order, and whether value
//! representations are written out explicitly.
//! The built-in registry covers the three uncompressed syntaxes
//! and knows about the deflated one without supporting it.

use crate::decode::HeaderDecoder;
use crate::encode::HeaderEncoder;
use byteordered::Endianness;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// A descriptor of a single transfer syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    /// The unique identifier of this transfer syntax.
    uid: &'static str,
    /// A human readable name.
    name: &'static str,
    /// The byte order of the encoded data set.
    byte_order: Endianness,
    /// Whether element headers carry an explicit VR.
    explicit_vr: bool,
    /// What it takes to access the encoded data set.
    codec: Codec,
}

/// The kind of processing the encoded data set requires
/// before the element stream can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// The data set is a plain element stream.
    None,
    /// The data set requires a transformation
    /// which this crate does not implement.
    Unsupported,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            codec,
        }
    }

    /// The unique identifier of this transfer syntax.
    pub fn uid(&self) -> &'static str {
        self.uid
    }

    /// A human readable name for this transfer syntax.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The byte order of encoded values and headers.
    pub fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Whether element headers carry an explicit VR.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Whether data sets in this transfer syntax
    /// can be read and written directly.
    pub fn fully_supported(&self) -> bool {
        self.codec == Codec::None
    }

    /// Obtain a header decoder for this transfer syntax,
    /// or `None` if the element stream is not directly accessible.
    pub fn decoder(&self) -> Option<HeaderDecoder> {
        match self.codec {
            Codec::None => Some(HeaderDecoder::new(self.byte_order, self.explicit_vr)),
            Codec::Unsupported => None,
        }
    }

    /// Obtain a header encoder for this transfer syntax,
    /// or `None` if the element stream is not directly accessible.
    pub fn encoder(&self) -> Option<HeaderEncoder> {
        match self.codec {
            Codec::None => Some(HeaderEncoder::new(self.byte_order, self.explicit_vr)),
            Codec::Unsupported => None,
        }
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uid)
    }
}

/// The built-in transfer syntax descriptors.
pub mod entries {
    use super::{Codec, TransferSyntax};
    use byteordered::Endianness;

    /// Implicit VR Little Endian: Default Transfer Syntax for DICOM
    pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        "1.2.840.10008.1.2",
        "Implicit VR Little Endian",
        Endianness::Little,
        false,
        Codec::None,
    );

    /// Explicit VR Little Endian
    pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        "1.2.840.10008.1.2.1",
        "Explicit VR Little Endian",
        Endianness::Little,
        true,
        Codec::None,
    );

    /// Explicit VR Big Endian (retired)
    pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax::new(
        "1.2.840.10008.1.2.2",
        "Explicit VR Big Endian",
        Endianness::Big,
        true,
        Codec::None,
    );

    /// Deflated Explicit VR Little Endian
    pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        "1.2.840.10008.1.2.1.99",
        "Deflated Explicit VR Little Endian",
        Endianness::Little,
        true,
        Codec::Unsupported,
    );
}

/// The container of all registered transfer syntaxes, indexed by UID.
#[derive(Debug)]
pub struct TransferSyntaxRegistry {
    syntaxes: HashMap<&'static str, TransferSyntax>,
}

impl TransferSyntaxRegistry {
    /// Obtain a transfer syntax descriptor by its UID.
    ///
    /// Trailing null characters, which padded UIDs may carry,
    /// are ignored.
    pub fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        let uid = uid.trim_end_matches(|c: char| c.is_whitespace() || c == '\0');
        self.syntaxes.get(uid)
    }

    /// Iterate over all registered transfer syntaxes.
    pub fn iter(&self) -> impl Iterator<Item = &TransferSyntax> {
        self.syntaxes.values()
    }
}

lazy_static! {
    static ref REGISTRY: TransferSyntaxRegistry = {
        let mut syntaxes = HashMap::new();
        for ts in &[
            entries::IMPLICIT_VR_LITTLE_ENDIAN,
            entries::EXPLICIT_VR_LITTLE_ENDIAN,
            entries::EXPLICIT_VR_BIG_ENDIAN,
            entries::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        ] {
            syntaxes.insert(ts.uid(), *ts);
        }
        TransferSyntaxRegistry { syntaxes }
    };
}

/// Obtain the global transfer syntax registry.
pub fn registry() -> &'static TransferSyntaxRegistry {
    &REGISTRY
}

/// The default transfer syntax, Implicit VR Little Endian.
pub fn default() -> TransferSyntax {
    entries::IMPLICIT_VR_LITTLE_ENDIAN
}
