//! This module contains the decoded representation of a data element's
//! value, with awareness of multiplicity.
//!
//! An element value is held in memory as a [`PrimitiveValue`].
//! Whether a value is present at all is expressed
//! at the element level (`Option<PrimitiveValue>`):
//! a blank or structurally deviant binary payload decodes to an
//! absent value rather than to an error.

use crate::header::Tag;
use smallvec::SmallVec;
use snafu::Snafu;
use std::borrow::Cow;
use std::fmt;

/// An aggregation of one or more elements in a value.
pub type C<T> = SmallVec<[T; 2]>;

/// An error triggered when a typed accessor is used on a value
/// of an incompatible variant.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(display("bad value cast: requested {} but value is {:?}", requested, got))]
pub struct CastValueError {
    /// the name of the requested type
    pub requested: &'static str,
    /// the type of the value stored in the element
    pub got: ValueType,
}

/// An enum representing the kind of value held by an element.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ValueType {
    /// No value present.
    Empty,
    /// A single string.
    Str,
    /// A sequence of strings.
    Strs,
    /// A sequence of attribute tags.
    Tags,
    /// A sequence of unsigned 8-bit integers.
    U8,
    /// A sequence of signed 16-bit integers.
    I16,
    /// A sequence of unsigned 16-bit integers.
    U16,
    /// A sequence of signed 32-bit integers.
    I32,
    /// A sequence of unsigned 32-bit integers.
    U32,
    /// A sequence of signed 64-bit integers.
    I64,
    /// A sequence of unsigned 64-bit integers.
    U64,
    /// A sequence of 32-bit floating point numbers.
    F32,
    /// A sequence of 64-bit floating point numbers.
    F64,
}

/// An in-memory representation of a decoded element value.
///
/// The variants do not map 1:1 to value representations:
/// all textual VRs decode to `Str`/`Strs`,
/// and each numeric VR decodes to the variant of its width and sign.
/// `AT` decodes to `Tags`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// An explicitly empty value.
    ///
    /// On the wire this is indistinguishable from an absent value:
    /// both serialize to a zero-length payload.
    Empty,
    /// A single string.
    Str(String),
    /// A sequence of strings, by multiplicity.
    Strs(C<String>),
    /// A sequence of attribute tags.
    Tags(C<Tag>),
    /// A sequence of unsigned 8-bit integers.
    U8(C<u8>),
    /// A sequence of signed 16-bit integers.
    I16(C<i16>),
    /// A sequence of unsigned 16-bit integers.
    U16(C<u16>),
    /// A sequence of signed 32-bit integers.
    I32(C<i32>),
    /// A sequence of unsigned 32-bit integers.
    U32(C<u32>),
    /// A sequence of signed 64-bit integers.
    I64(C<i64>),
    /// A sequence of unsigned 64-bit integers.
    U64(C<u64>),
    /// A sequence of 32-bit floating point numbers.
    F32(C<f32>),
    /// A sequence of 64-bit floating point numbers.
    F64(C<f64>),
}

/// Macro for implementing typed getters delegating to a variant,
/// in single and multi-value form.
macro_rules! impl_primitive_getters {
    ($name_single: ident, $name_multi: ident, $variant: ident, $ret: ty) => {
        /// Get a single value of the requested type.
        ///
        /// If the value contains multiple elements,
        /// only the first one is returned.
        /// An error is returned if the variant is not compatible.
        pub fn $name_single(&self) -> Result<$ret, CastValueError> {
            match self {
                PrimitiveValue::$variant(c) if !c.is_empty() => Ok(c[0]),
                value => Err(CastValueError {
                    requested: stringify!($name_single),
                    got: value.value_type(),
                }),
            }
        }

        /// Get a slice of values of the requested type without copying.
        ///
        /// An error is returned if the variant is not compatible.
        pub fn $name_multi(&self) -> Result<&[$ret], CastValueError> {
            match self {
                PrimitiveValue::$variant(c) => Ok(c),
                value => Err(CastValueError {
                    requested: stringify!($name_multi),
                    got: value.value_type(),
                }),
            }
        }
    };
}

impl PrimitiveValue {
    /// Retrieve the kind of value held.
    pub fn value_type(&self) -> ValueType {
        match self {
            PrimitiveValue::Empty => ValueType::Empty,
            PrimitiveValue::Str(_) => ValueType::Str,
            PrimitiveValue::Strs(_) => ValueType::Strs,
            PrimitiveValue::Tags(_) => ValueType::Tags,
            PrimitiveValue::U8(_) => ValueType::U8,
            PrimitiveValue::I16(_) => ValueType::I16,
            PrimitiveValue::U16(_) => ValueType::U16,
            PrimitiveValue::I32(_) => ValueType::I32,
            PrimitiveValue::U32(_) => ValueType::U32,
            PrimitiveValue::I64(_) => ValueType::I64,
            PrimitiveValue::U64(_) => ValueType::U64,
            PrimitiveValue::F32(_) => ValueType::F32,
            PrimitiveValue::F64(_) => ValueType::F64,
        }
    }

    /// Retrieve the number of individual values
    /// effectively contained in this value.
    pub fn multiplicity(&self) -> u32 {
        match self {
            PrimitiveValue::Empty => 0,
            PrimitiveValue::Str(_) => 1,
            PrimitiveValue::Strs(c) => c.len() as u32,
            PrimitiveValue::Tags(c) => c.len() as u32,
            PrimitiveValue::U8(c) => c.len() as u32,
            PrimitiveValue::I16(c) => c.len() as u32,
            PrimitiveValue::U16(c) => c.len() as u32,
            PrimitiveValue::I32(c) => c.len() as u32,
            PrimitiveValue::U32(c) => c.len() as u32,
            PrimitiveValue::I64(c) => c.len() as u32,
            PrimitiveValue::U64(c) => c.len() as u32,
            PrimitiveValue::F32(c) => c.len() as u32,
            PrimitiveValue::F64(c) => c.len() as u32,
        }
    }

    /// Check whether the value holds zero individual values.
    pub fn is_empty(&self) -> bool {
        self.multiplicity() == 0
    }

    /// Retrieve the value as a single clean string.
    ///
    /// Multiple values are joined with a backslash,
    /// following the standard multiplicity separator.
    /// Non-textual values are converted to their decimal
    /// (or canonical, for tags) textual form.
    pub fn to_str(&self) -> Cow<str> {
        fn join<T: ToString>(items: &[T]) -> String {
            items
                .iter()
                .map(T::to_string)
                .collect::<Vec<_>>()
                .join("\\")
        }

        match self {
            PrimitiveValue::Empty => Cow::Borrowed(""),
            PrimitiveValue::Str(s) => Cow::Borrowed(s.as_str()),
            PrimitiveValue::Strs(c) if c.len() == 1 => Cow::Borrowed(c[0].as_str()),
            PrimitiveValue::Strs(c) => Cow::Owned(join(c)),
            PrimitiveValue::Tags(c) => Cow::Owned(join(c)),
            PrimitiveValue::U8(c) => Cow::Owned(join(c)),
            PrimitiveValue::I16(c) => Cow::Owned(join(c)),
            PrimitiveValue::U16(c) => Cow::Owned(join(c)),
            PrimitiveValue::I32(c) => Cow::Owned(join(c)),
            PrimitiveValue::U32(c) => Cow::Owned(join(c)),
            PrimitiveValue::I64(c) => Cow::Owned(join(c)),
            PrimitiveValue::U64(c) => Cow::Owned(join(c)),
            PrimitiveValue::F32(c) => Cow::Owned(join(c)),
            PrimitiveValue::F64(c) => Cow::Owned(join(c)),
        }
    }

    /// Get a single string value.
    ///
    /// An error is returned if the variant is not `Str` or `Strs`.
    pub fn string(&self) -> Result<&str, CastValueError> {
        match self {
            PrimitiveValue::Str(s) => Ok(s),
            PrimitiveValue::Strs(c) if !c.is_empty() => Ok(&c[0]),
            value => Err(CastValueError {
                requested: "string",
                got: value.value_type(),
            }),
        }
    }

    /// Get the sequence of string values.
    ///
    /// An error is returned if the variant is not `Strs`.
    pub fn strings(&self) -> Result<&[String], CastValueError> {
        match self {
            PrimitiveValue::Strs(c) => Ok(c),
            value => Err(CastValueError {
                requested: "strings",
                got: value.value_type(),
            }),
        }
    }

    impl_primitive_getters!(tag, tags, Tags, Tag);
    impl_primitive_getters!(uint8, uint8_slice, U8, u8);
    impl_primitive_getters!(int16, int16_slice, I16, i16);
    impl_primitive_getters!(uint16, uint16_slice, U16, u16);
    impl_primitive_getters!(int32, int32_slice, I32, i32);
    impl_primitive_getters!(uint32, uint32_slice, U32, u32);
    impl_primitive_getters!(int64, int64_slice, I64, i64);
    impl_primitive_getters!(uint64, uint64_slice, U64, u64);
    impl_primitive_getters!(float32, float32_slice, F32, f32);
    impl_primitive_getters!(float64, float64_slice, F64, f64);
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Str(value.to_owned())
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Str(value)
    }
}

impl From<Tag> for PrimitiveValue {
    fn from(value: Tag) -> Self {
        PrimitiveValue::Tags(smallvec::smallvec![value])
    }
}

/// Macro for implementing `From` conversions of single values
/// and vectors into the matching variant.
macro_rules! impl_from_for_primitive {
    ($typ: ty, $variant: ident) => {
        impl From<$typ> for PrimitiveValue {
            fn from(value: $typ) -> Self {
                PrimitiveValue::$variant(smallvec::smallvec![value])
            }
        }

        impl From<Vec<$typ>> for PrimitiveValue {
            fn from(value: Vec<$typ>) -> Self {
                PrimitiveValue::$variant(value.into())
            }
        }
    };
}

impl_from_for_primitive!(u8, U8);
impl_from_for_primitive!(i16, I16);
impl_from_for_primitive!(u16, U16);
impl_from_for_primitive!(i32, I32);
impl_from_for_primitive!(u32, U32);
impl_from_for_primitive!(i64, I64);
impl_from_for_primitive!(u64, U64);
impl_from_for_primitive!(f32, F32);
impl_from_for_primitive!(f64, F64);

impl From<Vec<Tag>> for PrimitiveValue {
    fn from(value: Vec<Tag>) -> Self {
        PrimitiveValue::Tags(value.into())
    }
}

impl From<Vec<String>> for PrimitiveValue {
    fn from(value: Vec<String>) -> Self {
        PrimitiveValue::Strs(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_types_and_multiplicity() {
        assert_eq!(PrimitiveValue::Empty.multiplicity(), 0);
        assert!(PrimitiveValue::Empty.is_empty());
        let v = PrimitiveValue::from(vec![Tag(0x0010, 0x0010), Tag(0x0010, 0x0020)]);
        assert_eq!(v.value_type(), ValueType::Tags);
        assert_eq!(v.multiplicity(), 2);
        let v = PrimitiveValue::from("CT");
        assert_eq!(v.value_type(), ValueType::Str);
        assert_eq!(v.multiplicity(), 1);
    }

    #[test]
    fn typed_getters() {
        let v = PrimitiveValue::from(vec![Tag(0x300A, 0x00B0)]);
        assert_eq!(v.tag().unwrap(), Tag(0x300A, 0x00B0));
        assert_eq!(v.tags().unwrap(), &[Tag(0x300A, 0x00B0)]);
        assert_eq!(
            v.uint16(),
            Err(CastValueError {
                requested: "uint16",
                got: ValueType::Tags,
            })
        );

        let v = PrimitiveValue::from(vec![5_u16, 10]);
        assert_eq!(v.uint16().unwrap(), 5);
        assert_eq!(v.uint16_slice().unwrap(), &[5, 10]);
    }

    #[test]
    fn to_str_joins_with_backslash() {
        let v = PrimitiveValue::from(vec!["ORIGINAL".to_owned(), "PRIMARY".to_owned()]);
        assert_eq!(v.to_str(), "ORIGINAL\\PRIMARY");
        let v = PrimitiveValue::from(vec![Tag(0x0010, 0x0010), Tag(0x300A, 0x00B0)]);
        assert_eq!(v.to_str(), "0010,0010\\300A,00B0");
        assert_eq!(PrimitiveValue::Empty.to_str(), "");
    }
}
