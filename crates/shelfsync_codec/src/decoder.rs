//! Canonical CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{cmp_canonical_keys, Value, ValueMap};

/// Decode a single value from CBOR bytes using the default [`DecodeLimits`].
///
/// The whole input must be consumed by exactly one top-level item.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR, contain constructs
/// outside the value model (byte strings, tags, NaN, indefinite lengths), exceed
/// the size limits, or are followed by trailing bytes.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    from_cbor_with_limits(bytes, DecodeLimits::default())
}

/// Decode a single value from CBOR bytes with explicit limits.
///
/// # Errors
///
/// See [`from_cbor`].
pub fn from_cbor_with_limits(bytes: &[u8], limits: DecodeLimits) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::with_limits(bytes, limits);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// Bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum element count for arrays and maps.
    pub max_container_elements: u64,
    /// Maximum text string length in bytes.
    pub max_text_len: u64,
    /// Maximum nesting depth of arrays and maps.
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            // 16 million elements is generous for any reading library.
            max_container_elements: 16 * 1024 * 1024,
            max_text_len: 256 * 1024 * 1024,
            max_depth: 64,
        }
    }
}

/// A canonical CBOR decoder.
///
/// This decoder validates that input follows canonical CBOR rules
/// and rejects constructs outside the [`Value`] model.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    limits: DecodeLimits,
}

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_limits(data, DecodeLimits::default())
    }

    /// Create a new decoder with explicit limits.
    pub fn with_limits(data: &'a [u8], limits: DecodeLimits) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            limits,
        }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial_byte = self.read_byte()?;
        let major_type = initial_byte >> 5;
        let additional_info = initial_byte & 0x1f;

        match major_type {
            0 => {
                let n = self.decode_unsigned(additional_info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            1 => {
                // Negative integer: value is -(n+1)
                let n = self.decode_unsigned(additional_info)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(-n - 1))
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            2 => Err(CodecError::unsupported_type("byte string")),
            3 => self.decode_text(additional_info).map(Value::Text),
            4 => self.nested(|d| d.decode_array(additional_info)),
            5 => self.nested(|d| d.decode_map(additional_info)),
            6 => Err(CodecError::unsupported_type("tag")),
            7 => self.decode_simple(additional_info),
            _ => Err(CodecError::invalid_structure("invalid major type")),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn nested<F>(&mut self, f: F) -> CodecResult<Value>
    where
        F: FnOnce(&mut Self) -> CodecResult<Value>,
    {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                max: self.limits.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn decode_unsigned(&mut self, additional_info: u8) -> CodecResult<u64> {
        const NON_CANONICAL: &str = "non-canonical: value could be encoded in fewer bytes";
        match additional_info {
            0..=23 => Ok(u64::from(additional_info)),
            24 => {
                let byte = self.read_byte()?;
                if byte < 24 {
                    return Err(CodecError::invalid_structure(NON_CANONICAL));
                }
                Ok(u64::from(byte))
            }
            25 => {
                let value = u16::from_be_bytes(self.read_array()?);
                if u8::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure(NON_CANONICAL));
                }
                Ok(u64::from(value))
            }
            26 => {
                let value = u32::from_be_bytes(self.read_array()?);
                if u16::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure(NON_CANONICAL));
                }
                Ok(u64::from(value))
            }
            27 => {
                let value = u64::from_be_bytes(self.read_array()?);
                if u32::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure(NON_CANONICAL));
                }
                Ok(value)
            }
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            _ => Err(CodecError::IndefiniteLengthForbidden),
        }
    }

    fn decode_length(&mut self, additional_info: u8, max: u64) -> CodecResult<usize> {
        let claimed = self.decode_unsigned(additional_info)?;
        if claimed > max {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed: max,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded {
            claimed,
            max_allowed: max,
        })
    }

    fn decode_text(&mut self, additional_info: u8) -> CodecResult<String> {
        let len = self.decode_length(additional_info, self.limits.max_text_len)?;
        let bytes = self.read_bytes(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(text.to_string())
    }

    fn decode_array(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_length(additional_info, self.limits.max_container_elements)?;
        // Never trust the claimed length for preallocation beyond what the input could hold.
        let mut items = Vec::with_capacity(len.min(self.data.len() - self.pos));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn decode_map(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_length(additional_info, self.limits.max_container_elements)?;
        let mut map = ValueMap::new();
        let mut prev_key: Option<String> = None;

        for _ in 0..len {
            let key_byte = self.read_byte()?;
            if key_byte >> 5 != 3 {
                return Err(CodecError::invalid_structure("map keys must be text"));
            }
            let key = self.decode_text(key_byte & 0x1f)?;

            // Keys must be strictly increasing, which also rules out duplicates.
            if let Some(prev) = &prev_key {
                if cmp_canonical_keys(prev, &key) != std::cmp::Ordering::Less {
                    return Err(CodecError::invalid_structure(
                        "non-canonical: map keys not in sorted order",
                    ));
                }
            }

            let value = self.decode()?;
            map.insert(key.clone(), value);
            prev_key = Some(key);
        }

        Ok(Value::Map(map))
    }

    fn decode_simple(&mut self, additional_info: u8) -> CodecResult<Value> {
        match additional_info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            // undefined is read as null
            22 | 23 => Ok(Value::Null),
            24 => {
                let simple = self.read_byte()?;
                Err(CodecError::unsupported_type(format!("simple value {simple}")))
            }
            25 => {
                let bits = u16::from_be_bytes(self.read_array()?);
                finite_or_err(half_to_f64(bits))
            }
            26 => {
                let bits = u32::from_be_bytes(self.read_array()?);
                finite_or_err(f64::from(f32::from_bits(bits)))
            }
            27 => {
                let bits = u64::from_be_bytes(self.read_array()?);
                finite_or_err(f64::from_bits(bits))
            }
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            31 => Err(CodecError::invalid_structure("break without indefinite")),
            _ => Err(CodecError::unsupported_type(format!(
                "simple value {additional_info}"
            ))),
        }
    }
}

fn finite_or_err(f: f64) -> CodecResult<Value> {
    if f.is_nan() {
        Err(CodecError::NaNForbidden)
    } else {
        Ok(Value::Float(f))
    }
}

/// Widens an IEEE-754 half-precision float (RFC 8949 Appendix D).
fn half_to_f64(bits: u16) -> f64 {
    let exp = (bits >> 10) & 0x1f;
    let mant = f64::from(bits & 0x3ff);
    let magnitude = match exp {
        0 => mant * 2f64.powi(-24),
        31 if mant == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (mant + 1024.0) * 2f64.powi(i32::from(exp) - 25),
    };
    if bits & 0x8000 == 0 {
        magnitude
    } else {
        -magnitude
    }
}
