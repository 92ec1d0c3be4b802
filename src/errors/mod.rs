use crate::interop::ValueKind;
use std::fmt;

/// Where a signature mismatch was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Arity,
    Argument(usize),
    Return,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arity => write!(f, "argument count"),
            Self::Argument(index) => write!(f, "argument {}", index),
            Self::Return => write!(f, "return value"),
        }
    }
}

/// Errors raised while wrapping or invoking a proxy
#[derive(Debug)]
pub enum Error {
    /// The callable's type encoding could not be decoded. No proxy is produced.
    UnsupportedSignature { encoding: String, reason: String },
    /// Values disagree with the signature they are marshaled against
    SignatureMismatch { site: Site, expected: String, found: String },
    /// The interposer left a non-void return slot empty
    UnresolvedReturn { expected: ValueKind },
    /// An argument has no natural equality, so no memoization key exists for it
    UnencodableArgument { index: usize, kind: ValueKind, reason: &'static str },
    /// Raised by an interposer or the original callable, passed through untouched
    Callable(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn unsupported(encoding: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSignature {
            encoding: encoding.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(site: Site, expected: impl ToString, found: impl ToString) -> Self {
        Self::SignatureMismatch {
            site,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Relocate a signature mismatch to `site`; other errors are unchanged
    pub fn at(self, site: Site) -> Self {
        match self {
            Self::SignatureMismatch { expected, found, .. } => {
                Self::SignatureMismatch { site, expected, found }
            }
            other => other,
        }
    }

    /// Wrap an error raised by user code
    pub fn callable<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Callable(error.into())
    }

    /// Borrow the user error carried by `Callable`, if it has type `E`
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Callable(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Short machine-readable name, used as a log field
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedSignature { .. } => "unsupported_signature",
            Self::SignatureMismatch { .. } => "signature_mismatch",
            Self::UnresolvedReturn { .. } => "unresolved_return",
            Self::UnencodableArgument { .. } => "unencodable_argument",
            Self::Callable(_) => "callable",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSignature { encoding, reason } => {
                write!(f, "Unsupported signature '{}': {}", encoding, reason)
            }
            Self::SignatureMismatch { site, expected, found } => {
                write!(f, "Signature mismatch at {}: expected {}, found {}", site, expected, found)
            }
            Self::UnresolvedReturn { expected } => {
                write!(f, "Interposer did not set a return value of kind {}", expected)
            }
            Self::UnencodableArgument { index, kind, reason } => {
                write!(f, "Argument {} of kind {} cannot form a cache key: {}", index, kind, reason)
            }
            Self::Callable(inner) => write!(f, "{}", inner),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Callable(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
