//! In-memory data sets and the root data object.

use byteordered::Endianness;
use dcmio_core::header::Tag;
use dcmio_encoding::transfer_syntax::{self, TransferSyntax};
use std::collections::btree_map::BTreeMap;

use crate::element::InMemElement;
use crate::meta::FileMetaTable;
use crate::{Parent, Result, UnsupportedTransferSyntaxSnafu};

/// An ordered collection of data elements, keyed by tag.
///
/// Elements keep the position of their first insertion;
/// putting an element with an existing tag replaces it in place.
/// Iteration follows insertion order,
/// which is also the order of serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemDataSet {
    entries: BTreeMap<Tag, InMemElement>,
    /// Tags in insertion order. Every tag in `entries` appears
    /// exactly once here and vice versa.
    order: Vec<Tag>,
}

impl InMemDataSet {
    /// Create an empty data set.
    pub fn new() -> Self {
        InMemDataSet {
            entries: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// The number of elements in this data set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an element, replacing and returning any element
    /// previously held under the same tag.
    pub fn put(&mut self, elem: InMemElement) -> Option<InMemElement> {
        let tag = elem.tag();
        let old = self.entries.insert(tag, elem);
        if old.is_none() {
            self.order.push(tag);
        }
        old
    }

    /// Obtain the element with the given tag.
    pub fn get(&self, tag: Tag) -> Option<&InMemElement> {
        self.entries.get(&tag)
    }

    /// Obtain the element with the given tag, mutable.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut InMemElement> {
        self.entries.get_mut(&tag)
    }

    /// Whether an element with the given tag is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Remove and return the element with the given tag.
    pub fn remove(&mut self, tag: Tag) -> Option<InMemElement> {
        let out = self.entries.remove(&tag);
        if out.is_some() {
            self.order.retain(|t| *t != tag);
        }
        out
    }

    /// Remove every element of the given group,
    /// returning how many were removed.
    pub fn remove_group(&mut self, group: u16) -> usize {
        let before = self.entries.len();
        self.entries.retain(|tag, _| tag.group() != group);
        self.order.retain(|tag| tag.group() != group);
        before - self.entries.len()
    }

    /// The elements of the given group, in insertion order.
    pub fn elements_in_group(&self, group: u16) -> Vec<&InMemElement> {
        self.order
            .iter()
            .filter(|tag| tag.group() == group)
            .map(|tag| &self.entries[tag])
            .collect()
    }

    /// Iterate over the elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &InMemElement> {
        self.order.iter().map(move |tag| &self.entries[tag])
    }

    /// Bring every element of this data set, recursively,
    /// to the target byte order.
    pub fn reencode_all(&mut self, target: Endianness) {
        for elem in self.entries.values_mut() {
            elem.reencode(target);
        }
    }
}

impl Default for InMemDataSet {
    fn default() -> Self {
        InMemDataSet::new()
    }
}

impl Parent for InMemDataSet {
    fn add(&mut self, elem: InMemElement) -> Option<InMemElement> {
        self.put(elem)
    }

    fn element(&self, tag: Tag) -> Option<&InMemElement> {
        self.get(tag)
    }

    fn element_mut(&mut self, tag: Tag) -> Option<&mut InMemElement> {
        self.get_mut(tag)
    }

    fn group(&self, group: u16) -> Vec<&InMemElement> {
        self.elements_in_group(group)
    }

    fn delete(&mut self, tag: Tag) -> Option<InMemElement> {
        self.remove(tag)
    }

    fn delete_group(&mut self, group: u16) -> usize {
        self.remove_group(group)
    }
}

impl Extend<InMemElement> for InMemDataSet {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = InMemElement>,
    {
        for elem in iter {
            self.put(elem);
        }
    }
}

/// A root data set bound to a transfer syntax,
/// with an optional file meta group.
///
/// Every element added to the object is brought to the
/// object's current byte order, so that at any point in time
/// all payloads in the tree are encoded consistently.
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    dataset: InMemDataSet,
    ts: TransferSyntax,
    meta: Option<FileMetaTable>,
}

impl DataObject {
    /// Create an empty object under the default transfer syntax,
    /// Implicit VR Little Endian.
    pub fn new_empty() -> Self {
        DataObject {
            dataset: InMemDataSet::new(),
            ts: transfer_syntax::default(),
            meta: None,
        }
    }

    /// Create an empty object under the given transfer syntax.
    pub fn new_empty_with_transfer_syntax(ts: TransferSyntax) -> Result<Self> {
        if !ts.fully_supported() {
            return UnsupportedTransferSyntaxSnafu { uid: ts.uid() }.fail();
        }
        Ok(DataObject {
            dataset: InMemDataSet::new(),
            ts,
            meta: None,
        })
    }

    /// Construct an object from its parts.
    pub(crate) fn from_parts(
        dataset: InMemDataSet,
        ts: TransferSyntax,
        meta: Option<FileMetaTable>,
    ) -> Self {
        DataObject { dataset, ts, meta }
    }

    /// The transfer syntax this object is currently encoded under.
    pub fn transfer_syntax(&self) -> &TransferSyntax {
        &self.ts
    }

    /// The file meta table, if the object was read from
    /// (or prepared for) a file.
    pub fn meta(&self) -> Option<&FileMetaTable> {
        self.meta.as_ref()
    }

    /// Attach a file meta table to this object.
    pub fn set_meta(&mut self, meta: FileMetaTable) {
        self.meta = Some(meta);
    }

    /// The root data set.
    pub fn dataset(&self) -> &InMemDataSet {
        &self.dataset
    }

    /// Iterate over the root elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &InMemElement> {
        self.dataset.iter()
    }

    /// Move this object to another transfer syntax.
    ///
    /// Every binary payload in the tree, recursively, is decoded
    /// under the old byte order and re-encoded under the new one;
    /// byte-order-insensitive payloads keep their bytes.
    /// The walk runs to completion under the mutable borrow,
    /// so no reader can observe a half-converted tree.
    ///
    /// Fails on a transfer syntax this crate cannot encode,
    /// leaving the object untouched.
    pub fn set_transfer_syntax(&mut self, ts: TransferSyntax) -> Result<()> {
        if !ts.fully_supported() {
            return UnsupportedTransferSyntaxSnafu { uid: ts.uid() }.fail();
        }
        if ts == self.ts {
            return Ok(());
        }
        self.dataset.reencode_all(ts.endianness());
        if let Some(meta) = &mut self.meta {
            meta.set_transfer_syntax(&ts);
        }
        self.ts = ts;
        Ok(())
    }
}

impl Default for DataObject {
    fn default() -> Self {
        DataObject::new_empty()
    }
}

impl Parent for DataObject {
    fn add(&mut self, mut elem: InMemElement) -> Option<InMemElement> {
        // keep the whole tree in the object's byte order
        elem.reencode(self.ts.endianness());
        self.dataset.put(elem)
    }

    fn element(&self, tag: Tag) -> Option<&InMemElement> {
        self.dataset.get(tag)
    }

    fn element_mut(&mut self, tag: Tag) -> Option<&mut InMemElement> {
        self.dataset.get_mut(tag)
    }

    fn group(&self, group: u16) -> Vec<&InMemElement> {
        self.dataset.elements_in_group(group)
    }

    fn delete(&mut self, tag: Tag) -> Option<InMemElement> {
        self.dataset.remove(tag)
    }

    fn delete_group(&mut self, group: u16) -> usize {
        self.dataset.remove_group(group)
    }
}
