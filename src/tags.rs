//! The built-in tag numbers (spec §4.6) and the registry types a [`Codec`]
//! uses to extend tag handling beyond them.
//!
//! A read-handler receives the already-decoded wrapped value for its tag and
//! returns a reconstructed value; a write-handler receives a value the
//! encoder couldn't natively emit and returns its tagged replacement, which
//! is then encoded recursively (spec §4.4, §4.6). Neither touches bytes
//! directly.
//!
//! [`Codec`]: crate::codec::Codec
use std::fmt;
use std::sync::Arc;

use num_bigint::BigUint;

use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;

/// A read-handler: parses the wrapped value already decoded for some tag
/// into a reconstructed value, or raises to signal malformed input.
pub type ReadHandler = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// A write-handler: maps a value the encoder has no native emission for into
/// its tagged (or otherwise encodable) replacement.
pub type WriteHandler = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// The dispatch key a [`Codec`]'s write-handler registry is keyed on.
/// Default dispatch (spec §6, §9 Design Notes) maps each `Value` variant
/// that has no native emission to its own key; there is no external runtime
/// type to key on since the value model is a closed enum.
///
/// [`Codec`]: crate::codec::Codec
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKey {
    PosBignum,
    NegBignum,
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DispatchKey::PosBignum => write!(f, "pos-bignum"),
            DispatchKey::NegBignum => write!(f, "neg-bignum"),
        }
    }
}

/// The default dispatch function (spec §6): maps a value with no native
/// emission to a [`DispatchKey`], or `None` if it's natively emitted or has
/// its own collection-emission rule (arrays, maps, sets).
pub fn default_dispatch(value: &Value) -> Option<DispatchKey> {
    match value {
        Value::PosBignum(_) => Some(DispatchKey::PosBignum),
        Value::NegBignum(_) => Some(DispatchKey::NegBignum),
        _ => None,
    }
}

fn tag_error(tag: u64, message: impl Into<String>) -> Error {
    Error::with_data(
        ErrorKind::TagHandlingError,
        message,
        crate::error::Value2::Tag(tag),
    )
}

/// Tag 2: positive bignum, written as `Tagged(2, Bytes(big-endian))`.
pub fn write_pos_bignum(value: &Value) -> Result<Value> {
    match value {
        Value::PosBignum(m) => Ok(Value::Tagged(2, Box::new(Value::Bytes(m.to_bytes_be())))),
        _ => Err(tag_error(2, "write_pos_bignum called on a non-bignum value")),
    }
}

/// Tag 3: negative bignum; wire magnitude `m` represents `-1 - m`.
pub fn write_neg_bignum(value: &Value) -> Result<Value> {
    match value {
        Value::NegBignum(m) => Ok(Value::Tagged(3, Box::new(Value::Bytes(m.to_bytes_be())))),
        _ => Err(tag_error(3, "write_neg_bignum called on a non-bignum value")),
    }
}

/// Tag 2 read-handler: wrapped value must be a byte string.
pub fn read_pos_bignum(wrapped: Value) -> Result<Value> {
    match wrapped {
        Value::Bytes(b) => Ok(Value::PosBignum(BigUint::from_bytes_be(&b))),
        _ => Err(tag_error(2, "tag 2 (positive bignum) must wrap a byte string")),
    }
}

/// Tag 3 read-handler: wrapped value must be a byte string.
pub fn read_neg_bignum(wrapped: Value) -> Result<Value> {
    match wrapped {
        Value::Bytes(b) => Ok(Value::neg_bignum_from_magnitude(BigUint::from_bytes_be(&b))),
        _ => Err(tag_error(3, "tag 3 (negative bignum) must wrap a byte string")),
    }
}

/// Tag 0: ISO-8601 timestamp text string. Validated with `time`'s RFC 3339
/// parser (a superset covering the ISO-8601 profile CBOR uses) and returned
/// unchanged — there is no dedicated timestamp variant in the value model,
/// so the reconstructed value is the validated text string itself.
pub fn read_timestamp_text(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Text(s) => {
            time::OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339)
                .map_err(|e| tag_error(0, format!("tag 0 timestamp is not valid ISO-8601: {e}")))?;
            Ok(wrapped)
        }
        _ => Err(tag_error(0, "tag 0 (timestamp) must wrap a text string")),
    }
}

/// Tag 1: epoch offset, either integer or floating-point seconds.
pub fn read_epoch_seconds(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Int(_) | Value::F32(_) | Value::F64(_) => Ok(wrapped),
        _ => Err(tag_error(1, "tag 1 (epoch seconds) must wrap a number")),
    }
}

/// Tag 4: decimal fraction, `[exponent, mantissa]` with `value = mantissa *
/// 10^exponent`.
pub fn read_decimal_fraction(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Array(items, _) if items.len() == 2 => {
            let exponent_ok = items[0].as_int().is_some();
            let mantissa_ok = items[1].as_int().is_some() || items[1].as_bigint().is_some();
            if exponent_ok && mantissa_ok {
                Ok(wrapped)
            } else {
                Err(tag_error(4, "tag 4 (decimal fraction) elements must be integers"))
            }
        }
        _ => Err(tag_error(4, "tag 4 (decimal fraction) must wrap a 2-element array")),
    }
}

/// Tag 27: generic tagged literal, `[tag-name-string, form]`.
pub fn read_generic_literal(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Array(items, _) if items.len() == 2 && items[0].as_text().is_some() => Ok(wrapped),
        _ => Err(tag_error(
            27,
            "tag 27 (generic tagged literal) must wrap [tag-name-string, form]",
        )),
    }
}

/// Tag 30: rational, `[numerator, denominator]`.
pub fn read_rational(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Array(items, _) if items.len() == 2 => Ok(wrapped),
        _ => Err(tag_error(30, "tag 30 (rational) must wrap a 2-element array")),
    }
}

/// Tag 32: URI text string.
pub fn read_uri(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Text(_) => Ok(wrapped),
        _ => Err(tag_error(32, "tag 32 (URI) must wrap a text string")),
    }
}

/// Tag 35: regular expression text string, validated with the `regex` crate.
pub fn read_regex(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Text(s) => {
            regex::Regex::new(s).map_err(|e| tag_error(35, format!("tag 35 (regex) does not compile: {e}")))?;
            Ok(wrapped)
        }
        _ => Err(tag_error(35, "tag 35 (regex) must wrap a text string")),
    }
}

/// Tag 37: UUID, a 16-byte byte string.
pub fn read_uuid(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Bytes(b) if b.len() == 16 => Ok(wrapped),
        Value::Bytes(b) => Err(tag_error(
            37,
            format!("tag 37 (UUID) must wrap exactly 16 bytes, got {}", b.len()),
        )),
        _ => Err(tag_error(37, "tag 37 (UUID) must wrap a byte string")),
    }
}

/// Tag 39: identifier (symbol/keyword); a leading `:` marks a keyword.
pub fn read_identifier(wrapped: Value) -> Result<Value> {
    match &wrapped {
        Value::Text(_) => Ok(wrapped),
        _ => Err(tag_error(39, "tag 39 (identifier) must wrap a text string")),
    }
}

/// Tag 55799: self-describe CBOR, an identity wrapper — the reconstructed
/// value is simply the wrapped value with the tag discarded.
pub fn read_self_describe(wrapped: Value) -> Result<Value> {
    Ok(wrapped)
}

/// The full built-in read-handler table: `(tag, handler)` pairs a
/// [`Codec::default`] pre-registers. Tag 258 (sets) is deliberately absent:
/// the decoder special-cases the configured set-tag itself (spec §4.5)
/// rather than routing it through this registry.
///
/// [`Codec::default`]: crate::codec::Codec::default
pub fn builtin_read_handlers() -> Vec<(u64, ReadHandler)> {
    vec![
        (0, Arc::new(read_timestamp_text)),
        (1, Arc::new(read_epoch_seconds)),
        (2, Arc::new(read_pos_bignum)),
        (3, Arc::new(read_neg_bignum)),
        (4, Arc::new(read_decimal_fraction)),
        (27, Arc::new(read_generic_literal)),
        (30, Arc::new(read_rational)),
        (32, Arc::new(read_uri)),
        (35, Arc::new(read_regex)),
        (37, Arc::new(read_uuid)),
        (39, Arc::new(read_identifier)),
        (55799, Arc::new(read_self_describe)),
    ]
}

/// The full built-in write-handler table, keyed by [`DispatchKey`]. Only
/// bignums need one: every other built-in tag's wire form is either produced
/// by native emission (text/number/array already encode themselves) or has
/// no dedicated `Value` variant to dispatch on.
pub fn builtin_write_handlers() -> Vec<(DispatchKey, WriteHandler)> {
    vec![
        (DispatchKey::PosBignum, Arc::new(write_pos_bignum)),
        (DispatchKey::NegBignum, Arc::new(write_neg_bignum)),
    ]
}
