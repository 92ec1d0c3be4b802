//! Cache keys for argument tuples
//!
//! Two tuples encode to the same key exactly when they are element-wise
//! equal under each value's natural equality. Values without one are
//! rejected instead of falling back to identity.

use crate::errors::{Error, Result};
use crate::interop::Value;
use serde::Serialize;

/// Canonical, serializable form of one argument
#[derive(Serialize)]
enum KeyAtom<'a> {
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
    F32(u32),
    F64(u64),
    Pointer(u64),
    Str(&'a str),
    Aggregate(Vec<KeyAtom<'a>>),
}

const NAN_REASON: &str = "NaN is not equal to itself";
const BLOB_REASON: &str = "opaque bytes have no natural equality";

impl<'a> KeyAtom<'a> {
    fn from_value(value: &'a Value) -> std::result::Result<Self, &'static str> {
        let atom = match value {
            Value::Void => Self::Void,
            Value::Bool(v) => Self::Bool(*v),
            Value::I8(v) => Self::I8(*v),
            Value::I16(v) => Self::I16(*v),
            Value::I32(v) => Self::I32(*v),
            Value::I64(v) => Self::I64(*v),
            Value::U8(v) => Self::U8(*v),
            Value::U16(v) => Self::U16(*v),
            Value::U32(v) => Self::U32(*v),
            Value::U64(v) => Self::U64(*v),
            Value::F32(v) if v.is_nan() => return Err(NAN_REASON),
            // -0.0 == 0.0, so both share the bits of 0.0
            Value::F32(v) => Self::F32(if *v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() }),
            Value::F64(v) if v.is_nan() => return Err(NAN_REASON),
            Value::F64(v) => Self::F64(if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }),
            Value::Pointer(address) => Self::Pointer(*address as u64),
            Value::Str(s) => Self::Str(s),
            Value::Blob(_) => return Err(BLOB_REASON),
            Value::Aggregate(fields) => Self::Aggregate(
                fields
                    .iter()
                    .map(KeyAtom::from_value)
                    .collect::<std::result::Result<_, _>>()?,
            ),
        };
        Ok(atom)
    }
}

/// Encoded argument tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey(Box<[u8]>);

impl MemoKey {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short blake3 digest for log lines
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.0);
        hash.to_hex().as_str()[..16].to_string()
    }
}

/// Converts argument tuples into `MemoKey`s
///
/// Keys carry an owner id so wrappers sharing one cache never see each
/// other's entries. Owner `0` is reserved for keys built outside a proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyEncoder;

impl KeyEncoder {
    /// Key for `args` with no owner
    pub fn encode(&self, args: &[Value]) -> Result<MemoKey> {
        self.encode_for(0, args)
    }

    /// Key for `args` as seen by the proxy with id `owner`
    pub fn encode_for(&self, owner: u64, args: &[Value]) -> Result<MemoKey> {
        let atoms = args
            .iter()
            .enumerate()
            .map(|(index, value)| {
                KeyAtom::from_value(value).map_err(|reason| Error::UnencodableArgument {
                    index,
                    kind: value.kind(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let bytes = bincode::serialize(&(owner, atoms)).map_err(Error::callable)?;
        Ok(MemoKey(bytes.into_boxed_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop::ValueKind;
    use proptest::prelude::*;

    fn key(args: &[Value]) -> MemoKey {
        KeyEncoder.encode(args).unwrap()
    }

    #[test]
    fn test_separately_built_tuples_share_a_key() {
        let a = vec![Value::I32(3), Value::Str("x".to_string())];
        let b = vec![Value::I32(3), Value::Str(String::from("x"))];
        assert_eq!(key(&a), key(&b));
        assert_eq!(key(&a).fingerprint(), key(&b).fingerprint());
    }

    #[test]
    fn test_owner_is_part_of_the_key() {
        let args = [Value::I32(5)];
        assert_ne!(KeyEncoder.encode_for(1, &args).unwrap(), KeyEncoder.encode_for(2, &args).unwrap());
        assert_eq!(KeyEncoder.encode_for(0, &args).unwrap(), key(&args));
    }

    #[test]
    fn test_kind_is_part_of_the_key() {
        assert_ne!(key(&[Value::I32(3)]), key(&[Value::I64(3)]));
        assert_ne!(key(&[Value::U8(1)]), key(&[Value::Bool(true)]));
    }

    #[test]
    fn test_signed_zero_is_one_key() {
        assert_eq!(key(&[Value::F64(0.0)]), key(&[Value::F64(-0.0)]));
        assert_eq!(key(&[Value::F32(-0.0)]), key(&[Value::F32(0.0)]));
    }

    #[test]
    fn test_unencodable() {
        let err = KeyEncoder.encode(&[Value::I32(1), Value::F64(f64::NAN)]).unwrap_err();
        assert!(matches!(err, Error::UnencodableArgument { index: 1, kind: ValueKind::F64, .. }));

        let err = KeyEncoder.encode(&[Value::Blob(vec![0; 4])]).unwrap_err();
        assert!(matches!(err, Error::UnencodableArgument { index: 0, .. }));

        let nested = Value::Aggregate(vec![Value::I8(1), Value::Blob(vec![1])]);
        let err = KeyEncoder.encode(&[Value::Void, nested]).unwrap_err();
        assert!(matches!(err, Error::UnencodableArgument { index: 1, .. }));
    }

    #[test]
    fn test_aggregate_boundaries() {
        // ("ab", "c") and ("a", "bc") must not collide
        let left = [Value::Str("ab".into()), Value::Str("c".into())];
        let right = [Value::Str("a".into()), Value::Str("bc".into())];
        assert_ne!(key(&left), key(&right));
    }

    proptest! {
        #[test]
        fn prop_key_equality_matches_value_equality(
            a in any::<i64>(), s in ".{0,12}", b in any::<i64>(), t in ".{0,12}",
        ) {
            let left = [Value::I64(a), Value::Str(s.clone())];
            let right = [Value::I64(b), Value::Str(t.clone())];
            prop_assert_eq!(key(&left) == key(&right), a == b && s == t);
        }

        #[test]
        fn prop_finite_floats_encode(x in any::<f64>().prop_filter("finite", |x| !x.is_nan())) {
            prop_assert_eq!(key(&[Value::F64(x)]), key(&[Value::F64(x)]));
        }
    }
}
