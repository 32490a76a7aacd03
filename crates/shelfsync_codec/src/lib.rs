//! # Shelfsync Codec
//!
//! Value model and canonical CBOR encoding for Shelfsync.
//!
//! Every synchronizable state entry is a [`Value`]; a whole local state is a
//! [`ValueMap`]. The encoder is deterministic so that:
//! - Identical states produce identical bytes, independent of insertion order
//! - Snapshots can be compared and hashed byte-for-byte
//! - Floats survive a round trip without precision loss
//!
//! ## Canonical CBOR Rules
//!
//! - Maps have text keys, sorted by encoded form (length-first, then bytewise)
//! - Integers use shortest encoding
//! - Floats are always 64-bit doubles; NaN is rejected
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - Decoding is bounded by [`DecodeLimits`]
//!
//! ## Usage
//!
//! ```
//! use shelfsync_codec::{to_canonical_cbor, from_cbor, Value};
//!
//! let value = Value::map([("progress:b1", Value::Float(0.5))]);
//! let bytes = to_canonical_cbor(&value).unwrap();
//!
//! let decoded = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, from_cbor_with_limits, CanonicalDecoder, DecodeLimits};
pub use encoder::{map_to_canonical_cbor, to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::{cmp_canonical_keys, Value, ValueMap};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            any::<f64>()
                .prop_filter("NaN is not encodable", |f| !f.is_nan())
                .prop_map(Value::Float),
            "[a-z0-9:]{0,12}".prop_map(Value::Text),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-zA-Z:]{0,10}", inner, 0..8)
                    .prop_map(Value::Map),
            ]
        })
    }

    #[test]
    fn roundtrip_nested_state() {
        let value = Value::map([
            ("completedBooks", Value::from(vec!["b1", "b2"])),
            ("progress:b1", Value::Float(0.9)),
            ("lastPlayedAt:b1", Value::Integer(2000)),
            (
                "reviews",
                Value::map([(
                    "b1",
                    Value::map([
                        ("bookId", Value::from("b1")),
                        ("text", Value::from("loved it")),
                        ("rating", Value::Integer(5)),
                        ("timestamp", Value::Integer(10)),
                    ]),
                )]),
            ),
        ]);
        let bytes = to_canonical_cbor(&value).unwrap();
        assert_eq!(from_cbor(&bytes).unwrap(), value);
    }

    #[test]
    fn roundtrip_preserves_float_precision() {
        for f in [0.1, 1.0 / 3.0, f64::MIN_POSITIVE, -0.0, f64::INFINITY, 1e300] {
            let bytes = to_canonical_cbor(&Value::Float(f)).unwrap();
            let decoded = from_cbor(&bytes).unwrap();
            assert_eq!(
                decoded.as_float().map(f64::to_bits),
                Some(f.to_bits()),
                "{f}"
            );
        }
    }

    proptest! {
        #[test]
        fn any_value_roundtrips(v in value()) {
            let bytes = to_canonical_cbor(&v).unwrap();
            prop_assert_eq!(from_cbor(&bytes).unwrap(), v);
        }

        #[test]
        fn encoding_is_deterministic(v in value()) {
            let first = to_canonical_cbor(&v).unwrap();
            let second = to_canonical_cbor(&from_cbor(&first).unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn truncation_never_decodes(v in value()) {
            let bytes = to_canonical_cbor(&v).unwrap();
            for cut in 0..bytes.len() {
                prop_assert!(from_cbor(&bytes[..cut]).is_err());
            }
        }
    }
}
