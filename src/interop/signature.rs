//! Signature introspection
//!
//! A signature is derived once from a callable's type encoding and never
//! mutated afterwards. Encoding layout: return kind first, then each
//! parameter kind in order.

use super::call::ErasedCallable;
use super::types::{Value, ValueKind};
use crate::errors::{Error, Result, Site};
use std::fmt;

/// Parameter kinds plus return kind of one callable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableSignature {
    params: Vec<ValueKind>,
    ret: ValueKind,
}

impl CallableSignature {
    pub fn new(params: Vec<ValueKind>, ret: ValueKind) -> Self {
        Self { params, ret }
    }

    /// Parse a type encoding such as `"qi*"` (`fn(i32, String) -> i64`)
    pub fn parse(encoding: &str) -> Result<Self> {
        let mut parser = Parser::new(encoding);

        if parser.at_end() {
            return Err(Error::unsupported(encoding, "empty encoding"));
        }

        let ret = parser.kind()?;
        let mut params = Vec::new();

        while !parser.at_end() {
            if parser.rest().starts_with("...") {
                return Err(Error::unsupported(encoding, "variadic parameters are not representable"));
            }

            let offset = parser.pos;
            let kind = parser.kind()?;
            if kind == ValueKind::Void {
                return Err(Error::unsupported(
                    encoding,
                    format!("void parameter at offset {}", offset),
                ));
            }
            params.push(kind);
        }

        Ok(Self { params, ret })
    }

    #[inline]
    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    #[inline]
    pub fn ret(&self) -> &ValueKind {
        &self.ret
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn returns_void(&self) -> bool {
        self.ret == ValueKind::Void
    }

    /// Canonical encoding; `parse(sig.encoding())` yields `sig` again
    pub fn encoding(&self) -> String {
        let mut out = String::new();
        self.ret.encode_into(&mut out);
        for param in &self.params {
            param.encode_into(&mut out);
        }
        out
    }

    /// Validate arity and per-slot kinds of an argument list
    pub fn check_arguments(&self, args: &[Value]) -> Result<()> {
        if args.len() != self.params.len() {
            return Err(Error::mismatch(Site::Arity, self.params.len(), args.len()));
        }

        for (index, (arg, kind)) in args.iter().zip(&self.params).enumerate() {
            if !arg.conforms_to(kind) {
                return Err(Error::mismatch(Site::Argument(index), kind, arg.kind()));
            }
        }

        Ok(())
    }

    /// Validate a value written to the return slot
    pub fn check_return(&self, value: &Value) -> Result<()> {
        if value.conforms_to(&self.ret) {
            Ok(())
        } else {
            Err(Error::mismatch(Site::Return, &self.ret, value.kind()))
        }
    }
}

impl fmt::Display for CallableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Describe a callable's signature from its type encoding
///
/// Deterministic: the same encoding always yields the same signature.
pub fn describe(callable: &ErasedCallable) -> Result<CallableSignature> {
    CallableSignature::parse(callable.encoding())
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::unsupported(self.source, reason)
    }

    fn kind(&mut self) -> Result<ValueKind> {
        let Some(&code) = self.bytes.get(self.pos) else {
            return Err(self.fail("unexpected end of encoding"));
        };
        self.pos += 1;

        let kind = match code {
            b'v' => ValueKind::Void,
            b'B' => ValueKind::Bool,
            b'c' => ValueKind::I8,
            b's' => ValueKind::I16,
            b'i' => ValueKind::I32,
            b'q' => ValueKind::I64,
            b'C' => ValueKind::U8,
            b'S' => ValueKind::U16,
            b'I' => ValueKind::U32,
            b'Q' => ValueKind::U64,
            b'f' => ValueKind::F32,
            b'd' => ValueKind::F64,
            b'^' => ValueKind::Pointer,
            b'*' => ValueKind::Str,
            b'[' => self.blob()?,
            b'{' => self.aggregate()?,
            _ => {
                let shown = self.source[self.pos - 1..].chars().next().unwrap_or('?');
                return Err(self.fail(format!("unknown kind code '{}' at offset {}", shown, self.pos - 1)));
            }
        };

        Ok(kind)
    }

    fn blob(&mut self) -> Result<ValueKind> {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }

        if self.bytes.get(self.pos) != Some(&b']') {
            return Err(self.fail("unterminated blob size"));
        }

        let size: usize = self.source[start..self.pos]
            .parse()
            .map_err(|_| self.fail("unparsable blob size"))?;
        self.pos += 1;

        if size == 0 {
            return Err(self.fail("zero-size blob"));
        }

        Ok(ValueKind::Blob(size))
    }

    fn aggregate(&mut self) -> Result<ValueKind> {
        let mut fields = Vec::new();

        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.fail("unterminated aggregate")),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let field = self.kind()?;
                    if field == ValueKind::Void {
                        return Err(self.fail("void aggregate field"));
                    }
                    fields.push(field);
                }
            }
        }

        if fields.is_empty() {
            return Err(self.fail("empty aggregate"));
        }

        Ok(ValueKind::Aggregate(fields))
    }
}
