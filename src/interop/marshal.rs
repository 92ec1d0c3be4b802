//! Type marshaling - Rust values ↔ erased values
//!
//! Design: every type that may appear in a wrapped signature names its
//! `ValueKind` statically, so signatures are derived without a value in hand.

use super::types::{Value, ValueKind};
use crate::errors::{Error, Result, Site};

/// Conversion between a Rust type and an erased `Value`
pub trait Marshal: Sized {
    /// Kind of the slot this type occupies
    fn kind() -> ValueKind;

    fn into_value(self) -> Value;

    /// Recover the typed value, failing on a kind mismatch
    fn from_value(value: Value) -> Result<Self>;
}

fn unexpected<T: Marshal>(value: &Value) -> Error {
    Error::mismatch(Site::Return, T::kind(), value.kind())
}

macro_rules! marshal_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Marshal for $ty {
                #[inline]
                fn kind() -> ValueKind {
                    ValueKind::$variant
                }

                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                #[inline]
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(unexpected::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

marshal_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
}

impl Marshal for () {
    #[inline]
    fn kind() -> ValueKind {
        ValueKind::Void
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Void
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Void => Ok(()),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

impl Marshal for usize {
    fn kind() -> ValueKind {
        ValueKind::U64
    }

    fn into_value(self) -> Value {
        Value::U64(self as u64)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::U64(inner) => usize::try_from(inner)
                .map_err(|_| Error::mismatch(Site::Return, "usize", inner)),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

impl Marshal for isize {
    fn kind() -> ValueKind {
        ValueKind::I64
    }

    fn into_value(self) -> Value {
        Value::I64(self as i64)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::I64(inner) => isize::try_from(inner)
                .map_err(|_| Error::mismatch(Site::Return, "isize", inner)),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

impl<T> Marshal for *const T {
    fn kind() -> ValueKind {
        ValueKind::Pointer
    }

    fn into_value(self) -> Value {
        Value::Pointer(self as usize)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Pointer(address) => Ok(address as *const T),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

impl<T> Marshal for *mut T {
    fn kind() -> ValueKind {
        ValueKind::Pointer
    }

    fn into_value(self) -> Value {
        Value::Pointer(self as usize)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Pointer(address) => Ok(address as *mut T),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

/// Raw bytes travel as an opaque blob of fixed size
impl<const N: usize> Marshal for [u8; N] {
    fn kind() -> ValueKind {
        ValueKind::Blob(N)
    }

    fn into_value(self) -> Value {
        Value::Blob(self.to_vec())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(bytes) if bytes.len() == N => {
                let mut out = [0u8; N];
                out.copy_from_slice(&bytes);
                Ok(out)
            }
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

macro_rules! marshal_tuple {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: Marshal),+> Marshal for ($($name,)+) {
            fn kind() -> ValueKind {
                ValueKind::Aggregate(vec![$($name::kind()),+])
            }

            #[allow(non_snake_case)]
            fn into_value(self) -> Value {
                let ($($name,)+) = self;
                Value::Aggregate(vec![$($name.into_value()),+])
            }

            #[allow(non_snake_case)]
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Aggregate(fields) if fields.len() == $len => {
                        let mut fields = fields.into_iter();
                        $(
                            let $name = $name::from_value(fields.next().unwrap_or_default())?;
                        )+
                        Ok(($($name,)+))
                    }
                    other => Err(unexpected::<Self>(&other)),
                }
            }
        }
    };
}

marshal_tuple!(1; A);
marshal_tuple!(2; A, B);
marshal_tuple!(3; A, B, C);
marshal_tuple!(4; A, B, C, D);
