//! In-memory data element types.
//!
//! An element couples a tag and a VR with a payload.
//! A binary payload keeps the encoded bytes,
//! records the byte order they are currently encoded in,
//! and holds a lazily populated decoded value cache.
//! A sequence payload owns the child data sets directly
//! and has no binary form of its own.

use byteordered::Endianness;
use dcmio_core::header::{Tag, VR};
use dcmio_core::value::PrimitiveValue;
use dcmio_encoding::codec::{codec_of, VrKind};
use std::cell::OnceCell;

use crate::mem::InMemDataSet;

/// The payload of an in-memory element.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Encoded bytes in a known byte order,
    /// with a lazily decoded value.
    Binary {
        /// The encoded bytes.
        data: Vec<u8>,
        /// The byte order the bytes are currently encoded in.
        byte_order: Endianness,
        /// The decoded value, populated on first access.
        /// `Some(None)` records a decode that yielded no value.
        cache: OnceCell<Option<PrimitiveValue>>,
    },
    /// The items of a sequence.
    Items(Vec<InMemDataSet>),
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        // the cache is derived state and does not take part in equality
        match (self, other) {
            (
                Payload::Binary {
                    data: a,
                    byte_order: ao,
                    ..
                },
                Payload::Binary {
                    data: b,
                    byte_order: bo,
                    ..
                },
            ) => a == b && ao == bo,
            (Payload::Items(a), Payload::Items(b)) => a == b,
            _ => false,
        }
    }
}

/// A data element held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemElement {
    tag: Tag,
    vr: VR,
    payload: Payload,
}

impl InMemElement {
    /// Create an element from a decoded value,
    /// encoding it in little endian.
    pub fn new<T>(tag: T, vr: VR, value: impl Into<PrimitiveValue>) -> Self
    where
        T: Into<Tag>,
    {
        Self::new_with_order(tag, vr, value, Endianness::Little)
    }

    /// Create an element from a decoded value,
    /// encoding it in the given byte order.
    pub fn new_with_order<T>(
        tag: T,
        vr: VR,
        value: impl Into<PrimitiveValue>,
        byte_order: Endianness,
    ) -> Self
    where
        T: Into<Tag>,
    {
        let value = value.into();
        let data = codec_of(vr).encode(&value, byte_order);
        let cached = if data.is_empty() && !value.is_empty() {
            None
        } else {
            Some(value)
        };
        InMemElement {
            tag: tag.into(),
            vr,
            payload: Payload::Binary {
                data,
                byte_order,
                cache: OnceCell::from(cached),
            },
        }
    }

    /// Create an element from already encoded bytes.
    /// The value is only decoded when first requested.
    pub fn from_raw<T>(tag: T, vr: VR, data: Vec<u8>, byte_order: Endianness) -> Self
    where
        T: Into<Tag>,
    {
        InMemElement {
            tag: tag.into(),
            vr,
            payload: Payload::Binary {
                data,
                byte_order,
                cache: OnceCell::new(),
            },
        }
    }

    /// Create a sequence element holding the given items.
    pub fn new_sequence<T>(tag: T, items: Vec<InMemDataSet>) -> Self
    where
        T: Into<Tag>,
    {
        InMemElement {
            tag: tag.into(),
            vr: VR::SQ,
            payload: Payload::Items(items),
        }
    }

    /// The tag of this element.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The value representation of this element.
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// Whether this element is a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self.payload, Payload::Items(_))
    }

    /// The decoded value of this element,
    /// or `None` if the payload holds no value
    /// (sequence, empty payload, or a deviant payload).
    ///
    /// Decoding happens at most once per payload;
    /// the outcome is cached.
    pub fn value(&self) -> Option<&PrimitiveValue> {
        match &self.payload {
            Payload::Binary {
                data,
                byte_order,
                cache,
            } => cache
                .get_or_init(|| codec_of(self.vr).decode(data, *byte_order))
                .as_ref(),
            Payload::Items(_) => None,
        }
    }

    /// Replace the value of this element,
    /// re-encoding it in the payload's current byte order.
    ///
    /// The cache only ever holds what the payload can reproduce:
    /// a value the codec cannot encode under this element's VR
    /// leaves a zero-length payload and an absent value,
    /// reported as a deviation through `tracing`.
    ///
    /// A sequence element is left untouched;
    /// its items can only be replaced through [`items_mut`](Self::items_mut).
    pub fn set_value(&mut self, value: impl Into<PrimitiveValue>) {
        if self.is_sequence() {
            tracing::warn!(
                tag = %self.tag,
                "cannot set a primitive value on a sequence element"
            );
            return;
        }
        let value = value.into();
        let byte_order = self.byte_order().unwrap_or(Endianness::Little);
        let data = codec_of(self.vr).encode(&value, byte_order);
        let cached = if data.is_empty() && !value.is_empty() {
            // the codec refused the value (or collapsed it to nothing),
            // so decoding the payload would yield no value either
            None
        } else {
            Some(value)
        };
        self.payload = Payload::Binary {
            data,
            byte_order,
            cache: OnceCell::from(cached),
        };
    }

    /// The encoded bytes of a binary payload.
    pub fn raw_data(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Binary { data, .. } => Some(data),
            Payload::Items(_) => None,
        }
    }

    /// The byte order a binary payload is currently encoded in.
    pub fn byte_order(&self) -> Option<Endianness> {
        match &self.payload {
            Payload::Binary { byte_order, .. } => Some(*byte_order),
            Payload::Items(_) => None,
        }
    }

    /// The items of a sequence element.
    pub fn items(&self) -> Option<&[InMemDataSet]> {
        match &self.payload {
            Payload::Items(items) => Some(items),
            Payload::Binary { .. } => None,
        }
    }

    /// The items of a sequence element, mutable.
    pub fn items_mut(&mut self) -> Option<&mut Vec<InMemDataSet>> {
        match &mut self.payload {
            Payload::Items(items) => Some(items),
            Payload::Binary { .. } => None,
        }
    }

    /// Bring this element's payload to the target byte order.
    ///
    /// A byte-order-sensitive payload is decoded under its current
    /// order and re-encoded under the target order; a payload that
    /// decoded to no value collapses to an empty one. Text, UID and
    /// raw byte payloads keep their bytes verbatim. Sequences
    /// re-encode every element of every item.
    pub fn reencode(&mut self, target: Endianness) {
        match &mut self.payload {
            Payload::Binary {
                data,
                byte_order,
                cache,
            } => {
                if *byte_order == target {
                    return;
                }
                if !VrKind::of(self.vr).is_byte_order_sensitive() {
                    *byte_order = target;
                    return;
                }
                let codec = codec_of(self.vr);
                let value = match cache.take() {
                    Some(decoded) => decoded,
                    None => codec.decode(data, *byte_order),
                };
                *data = match &value {
                    Some(value) => codec.encode(value, target),
                    None => Vec::new(),
                };
                *byte_order = target;
                *cache = OnceCell::from(value);
            }
            Payload::Items(items) => {
                for item in items {
                    item.reencode_all(target);
                }
            }
        }
    }
}
