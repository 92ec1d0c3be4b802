//! Type definitions for erased invocation
//!
//! Defines the closed set of value kinds a proxy can marshal, and the owned
//! value container that carries them through an invocation.

use std::fmt;

/// Kind descriptor for one parameter or return slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Pointer,
    Str,
    /// Opaque fixed-size bytes
    Blob(usize),
    /// Ordered fields laid out as a struct
    Aggregate(Vec<ValueKind>),
}

impl ValueKind {
    /// Append this kind's encoding to `out`
    pub fn encode_into(&self, out: &mut String) {
        match self {
            Self::Void => out.push('v'),
            Self::Bool => out.push('B'),
            Self::I8 => out.push('c'),
            Self::I16 => out.push('s'),
            Self::I32 => out.push('i'),
            Self::I64 => out.push('q'),
            Self::U8 => out.push('C'),
            Self::U16 => out.push('S'),
            Self::U32 => out.push('I'),
            Self::U64 => out.push('Q'),
            Self::F32 => out.push('f'),
            Self::F64 => out.push('d'),
            Self::Pointer => out.push('^'),
            Self::Str => out.push('*'),
            Self::Blob(size) => {
                out.push('[');
                out.push_str(&size.to_string());
                out.push(']');
            }
            Self::Aggregate(fields) => {
                out.push('{');
                for field in fields {
                    field.encode_into(out);
                }
                out.push('}');
            }
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool => write!(f, "bool"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Pointer => write!(f, "pointer"),
            Self::Str => write!(f, "str"),
            Self::Blob(size) => write!(f, "blob[{}]", size),
            Self::Aggregate(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Owned value container for one argument or return slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Address only; never dereferenced by this crate
    Pointer(usize),
    Str(String),
    Blob(Vec<u8>),
    Aggregate(Vec<Value>),
}

impl Value {
    /// Kind this value carries
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Void => ValueKind::Void,
            Self::Bool(_) => ValueKind::Bool,
            Self::I8(_) => ValueKind::I8,
            Self::I16(_) => ValueKind::I16,
            Self::I32(_) => ValueKind::I32,
            Self::I64(_) => ValueKind::I64,
            Self::U8(_) => ValueKind::U8,
            Self::U16(_) => ValueKind::U16,
            Self::U32(_) => ValueKind::U32,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
            Self::Pointer(_) => ValueKind::Pointer,
            Self::Str(_) => ValueKind::Str,
            Self::Blob(bytes) => ValueKind::Blob(bytes.len()),
            Self::Aggregate(fields) => ValueKind::Aggregate(fields.iter().map(Value::kind).collect()),
        }
    }

    /// Check whether this value fits a slot of `kind` without building the
    /// full kind tree
    pub fn conforms_to(&self, kind: &ValueKind) -> bool {
        match (self, kind) {
            (Self::Blob(bytes), ValueKind::Blob(size)) => bytes.len() == *size,
            (Self::Aggregate(fields), ValueKind::Aggregate(kinds)) => {
                fields.len() == kinds.len()
                    && fields.iter().zip(kinds).all(|(field, kind)| field.conforms_to(kind))
            }
            (Self::Blob(_), _) | (Self::Aggregate(_), _) => false,
            (value, kind) => value.kind() == *kind,
        }
    }

    #[inline]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }
}

impl Default for Value {
    #[inline]
    fn default() -> Self {
        Self::Void
    }
}
