//! The encoder: walks a [`Value`] and writes its minimal CBOR encoding
//! (spec §4.4).
use crate::codec::Codec;
use crate::error::{report, Error, ErrorKind, Result};
use crate::half_float;
use crate::header::{self, MajorType};
use crate::value::Value;

/// Encode `value` under `codec`'s rules, returning the bytes written.
pub fn encode(codec: &Codec, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(codec, &mut buf, value)?;
    Ok(buf)
}

/// Encode `value` into an existing buffer, returning the number of bytes
/// appended (spec §6's `encode(codec, sink, value) -> count`).
pub fn encode_into(codec: &Codec, buf: &mut Vec<u8>, value: &Value) -> Result<usize> {
    let start = buf.len();
    encode_value(codec, buf, value)?;
    Ok(buf.len() - start)
}

/// Encode each value of `values` in turn, returning the total bytes written
/// (spec §6's `encode-seq(codec, sink, values) -> count`).
pub fn encode_seq<'a>(
    codec: &Codec,
    buf: &mut Vec<u8>,
    values: impl IntoIterator<Item = &'a Value>,
) -> Result<usize> {
    let start = buf.len();
    for value in values {
        encode_value(codec, buf, value)?;
    }
    Ok(buf.len() - start)
}

fn encode_value(codec: &Codec, buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => {
            header::write_header(buf, MajorType::SimpleOrFloat, 22);
            Ok(())
        }
        Value::Undefined => {
            header::write_header(buf, MajorType::SimpleOrFloat, 23);
            Ok(())
        }
        Value::Bool(b) => {
            header::write_header(buf, MajorType::SimpleOrFloat, if *b { 21 } else { 20 });
            Ok(())
        }
        Value::Simple(code) => encode_simple(buf, *code),
        Value::Int(n) => {
            let (major_bit, magnitude) = n.to_wire();
            let major = if major_bit == 0 {
                MajorType::UnsignedInt
            } else {
                MajorType::NegativeInt
            };
            header::write_header(buf, major, magnitude);
            Ok(())
        }
        Value::F32(f) => {
            encode_float(buf, *f as f64, Some(*f));
            Ok(())
        }
        Value::F64(f) => {
            encode_float(buf, *f, None);
            Ok(())
        }
        Value::Text(s) => {
            header::write_header(buf, MajorType::TextString, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
            Ok(())
        }
        Value::Bytes(b) => {
            header::write_header(buf, MajorType::ByteString, b.len() as u64);
            buf.extend_from_slice(b);
            Ok(())
        }
        Value::Tagged(tag, inner) => {
            header::write_header(buf, MajorType::Tag, *tag);
            encode_value(codec, buf, inner)
        }
        Value::Array(items, _) => encode_array(codec, buf, items),
        Value::Map(entries, _) => encode_map(codec, buf, entries),
        Value::Set(items) => encode_set(codec, buf, items),
        Value::PosBignum(_) | Value::NegBignum(_) => encode_via_handler(codec, buf, value),
    }
}

fn encode_via_handler(codec: &Codec, buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match codec.write_handler_for(value) {
        Some(handler) => {
            let replacement = handler(value)?;
            encode_value(codec, buf, &replacement)
        }
        None => Err(report(Error::new(
            ErrorKind::UnsupportedType,
            "value has no native emission, write handler, or collection rule",
        ))),
    }
}

fn encode_simple(buf: &mut Vec<u8>, code: u8) -> Result<()> {
    if (20..=31).contains(&code) {
        return Err(report(Error::new(
            ErrorKind::IllegalSimpleType,
            format!("simple value code {code} is reserved for booleans/null/undefined or reserved"),
        )));
    }
    if code <= 19 {
        header::write_header(buf, MajorType::SimpleOrFloat, code as u64);
    } else {
        buf.push((7 << 5) | 24);
        buf.push(code);
    }
    Ok(())
}

/// Float emission (spec §4.4): zero/NaN/±∞ always compress to half
/// precision regardless of input width; otherwise the narrowest width that
/// round-trips exactly, falling back to 32-bit for an `f32` input or 64-bit
/// for an `f64` input.
fn encode_float(buf: &mut Vec<u8>, value: f64, from_f32: Option<f32>) {
    if value == 0.0 || value.is_nan() || value.is_infinite() {
        let as_f32 = from_f32.unwrap_or(value as f32);
        let half = half_float::encode_lossy(as_f32);
        buf.push((7 << 5) | 25);
        buf.extend_from_slice(&half.to_be_bytes());
        return;
    }
    if let Some(f) = from_f32 {
        if let Some(half) = half_float::encode_exact(f) {
            buf.push((7 << 5) | 25);
            buf.extend_from_slice(&half.to_be_bytes());
            return;
        }
        buf.push((7 << 5) | 26);
        buf.extend_from_slice(&f.to_be_bytes());
        return;
    }
    let as_f32 = value as f32;
    if as_f32 as f64 == value {
        if let Some(half) = half_float::encode_exact(as_f32) {
            buf.push((7 << 5) | 25);
            buf.extend_from_slice(&half.to_be_bytes());
            return;
        }
        buf.push((7 << 5) | 26);
        buf.extend_from_slice(&as_f32.to_be_bytes());
        return;
    }
    buf.push((7 << 5) | 27);
    buf.extend_from_slice(&value.to_be_bytes());
}

fn encode_array(codec: &Codec, buf: &mut Vec<u8>, items: &[Value]) -> Result<()> {
    header::write_header(buf, MajorType::Array, items.len() as u64);
    for item in items {
        encode_value(codec, buf, item)?;
    }
    Ok(())
}

fn encode_map(codec: &Codec, buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    header::write_header(buf, MajorType::Map, entries.len() as u64);
    if codec.canonical() {
        let mut encoded: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            let key_bytes = encode(codec, k)?;
            let value_bytes = encode(codec, v)?;
            encoded.push((key_bytes, value_bytes));
        }
        encoded.sort_by(|a, b| cbor_key_order(&a.0, &b.0));
        for (k, v) in encoded {
            buf.extend_from_slice(&k);
            buf.extend_from_slice(&v);
        }
    } else {
        for (k, v) in entries {
            encode_value(codec, buf, k)?;
            encode_value(codec, buf, v)?;
        }
    }
    Ok(())
}

fn encode_set(codec: &Codec, buf: &mut Vec<u8>, items: &[Value]) -> Result<()> {
    header::write_header(buf, MajorType::Tag, codec.set_tag());
    header::write_header(buf, MajorType::Array, items.len() as u64);
    if codec.canonical() {
        let mut encoded: Vec<Vec<u8>> = items.iter().map(|v| encode(codec, v)).collect::<Result<_>>()?;
        encoded.sort_by(|a, b| cbor_key_order(a, b));
        for item in encoded {
            buf.extend_from_slice(&item);
        }
    } else {
        for item in items {
            encode_value(codec, buf, item)?;
        }
    }
    Ok(())
}

/// CBOR canonical sort order (spec §4.4): shorter byte strings first, ties
/// broken lexicographically.
fn cbor_key_order(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integer::CborInt;

    fn enc(value: &Value) -> Vec<u8> {
        encode(&Codec::default(), value).unwrap()
    }

    #[test]
    fn unsigned_small() {
        assert_eq!(enc(&Value::Int(CborInt::from(0u8))), hex::decode("00").unwrap());
        assert_eq!(enc(&Value::Int(CborInt::from(23u8))), hex::decode("17").unwrap());
    }

    #[test]
    fn unsigned_wide() {
        assert_eq!(enc(&Value::Int(CborInt::from(24u8))), hex::decode("1818").unwrap());
        assert_eq!(enc(&Value::Int(CborInt::from(u64::MAX))), hex::decode("1bffffffffffffffff").unwrap());
    }

    #[test]
    fn negative() {
        assert_eq!(enc(&Value::Int(CborInt::from(-1i8))), hex::decode("20").unwrap());
        assert_eq!(enc(&Value::Int(CborInt::from(-128i16))), hex::decode("387f").unwrap());
    }

    #[test]
    fn float_zero_compresses_to_half_even_from_f64() {
        assert_eq!(enc(&Value::F64(0.0)), hex::decode("f90000").unwrap());
    }

    #[test]
    fn float_exact_half() {
        assert_eq!(enc(&Value::F32(1.0)), hex::decode("f93c00").unwrap());
    }

    #[test]
    fn float_needs_single_precision() {
        assert_eq!(enc(&Value::F32(100000.0)), hex::decode("fa47c35000").unwrap());
    }

    #[test]
    fn text_and_bytes() {
        assert_eq!(enc(&Value::Text("a".into())), hex::decode("6161").unwrap());
        assert_eq!(enc(&Value::Bytes(vec![1, 2, 3])), hex::decode("43010203").unwrap());
    }

    #[test]
    fn array_and_map_preserve_insertion_order_by_default() {
        let map = Value::Map(
            vec![
                (Value::Int(CborInt::from(0u8)), Value::Int(CborInt::from(8u8))),
                (Value::Text("a".into()), Value::Int(CborInt::from(2u8))),
                (Value::Bytes(vec![0, 1, 2]), Value::Text("bc".into())),
            ],
            crate::value::Streamed(false),
        );
        assert_eq!(
            enc(&map),
            hex::decode("a3000861610243000102626263").unwrap()
        );
    }

    #[test]
    fn canonical_mode_sorts_map_keys() {
        let codec = Codec::builder().canonical(true).build();
        let map = Value::Map(
            vec![
                (Value::Text("a".into()), Value::Int(CborInt::from(2u8))),
                (Value::Int(CborInt::from(0u8)), Value::Int(CborInt::from(8u8))),
                (Value::Bytes(vec![0, 1, 2]), Value::Text("bc".into())),
            ],
            crate::value::Streamed(false),
        );
        let out = encode(&codec, &map).unwrap();
        assert_eq!(out, hex::decode("a3000861610243000102626263").unwrap());
    }

    #[test]
    fn bignum_round_trips_via_write_handler() {
        let value = Value::PosBignum(num_bigint::BigUint::from(18446744073709551616u128));
        assert_eq!(enc(&value), hex::decode("c249010000000000000000").unwrap());
    }

    #[test]
    fn set_wraps_in_set_tag() {
        let set = Value::Set(vec![
            Value::Int(CborInt::from(1u8)),
            Value::Int(CborInt::from(2u8)),
            Value::Int(CborInt::from(3u8)),
        ]);
        assert_eq!(enc(&set), hex::decode("d9010283010203").unwrap());
    }

    #[test]
    fn illegal_simple_value_code_rejected() {
        let err = encode(&Codec::default(), &Value::Simple(24)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalSimpleType);
    }
}
