//! This module describes the common behavior of data dictionaries:
//! translating an attribute tag to the value representation
//! expected for that attribute.
//!
//! A dictionary is injected where needed
//! (most notably when reading data sets with implicit VR),
//! there is no process-wide mutable registry.

use crate::header::{Tag, VR};

/// A data dictionary, mapping attribute tags to value representations.
pub trait DataDictionary {
    /// Fetch the value representation registered for the given tag,
    /// if the dictionary knows the attribute.
    fn vr_of(&self, tag: Tag) -> Option<VR>;
}

impl<T: ?Sized> DataDictionary for &T
where
    T: DataDictionary,
{
    fn vr_of(&self, tag: Tag) -> Option<VR> {
        (**self).vr_of(tag)
    }
}

/// An empty data dictionary, which knows no attributes.
///
/// With this dictionary,
/// elements read under an implicit VR transfer syntax
/// fall back to the [`UN`](crate::header::VR::UN) representation,
/// which keeps their binary payload verbatim.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StubDictionary;

impl DataDictionary for StubDictionary {
    fn vr_of(&self, _tag: Tag) -> Option<VR> {
        None
    }
}
