//! The streaming decoder: reads one CBOR item at a time from a byte slice,
//! dispatching on the initial header byte's major type and info code (spec
//! §4.5).
use crate::codec::Codec;
use crate::error::{report, Error, ErrorKind, Result};
use crate::half_float;
use crate::header::{self, Header, Info, MajorType};
use crate::value::{Streamed, Value};

/// Decode exactly one self-contained value from the front of `input`,
/// advancing it past everything consumed (spec §6's `decode(codec, source)
/// -> value`). A clean end of input — nothing left to read — yields
/// `Ok(None)`; end of input partway through a value is
/// [`ErrorKind::EndOfInput`].
pub fn decode<'a>(codec: &Codec, input: &mut &'a [u8]) -> Result<Option<Value>> {
    if input.is_empty() {
        return Ok(None);
    }
    decode_value(codec, input).map(Some)
}

/// A lazy iterator over consecutive values in `input`, terminating at a
/// clean end of input (spec §6's `decode-seq`).
pub struct DecodeSeq<'a, 'b> {
    codec: &'b Codec,
    input: &'a mut &'b [u8],
    done: bool,
}

/// Build a lazy iterator over consecutive values in `input` (spec §6's
/// `decode-seq(codec, source) -> lazy sequence of values`).
pub fn decode_seq<'a, 'b>(codec: &'b Codec, input: &'a mut &'b [u8]) -> DecodeSeq<'a, 'b> {
    DecodeSeq { codec, input, done: false }
}

impl<'a, 'b> Iterator for DecodeSeq<'a, 'b> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode(self.codec, self.input) {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn eof() -> Error {
    report(Error::new(ErrorKind::EndOfInput, "unexpected end of input"))
}

fn illegal_stream(context: &str) -> Error {
    report(Error::new(
        ErrorKind::IllegalStream,
        format!("{context} may not be indefinite-length"),
    ))
}

fn decode_value(codec: &Codec, input: &mut &[u8]) -> Result<Value> {
    // Major type 7's additional-info codes 24-31 don't mean "follow-on
    // length", unlike every other major type: 24 is one more simple-value
    // byte, 25/26/27 are half/single/double floats, 28-30 are illegal (not
    // merely reserved-info-code the way they are elsewhere), and 31 is the
    // break marker. So major 7 is dispatched from the raw byte, never
    // through `header::read_header`'s generic `Info` resolution.
    match input.first() {
        None => Err(eof()),
        Some(&byte) if byte >> 5 == MajorType::SimpleOrFloat as u8 => {
            *input = &input[1..];
            decode_major7(codec, byte & 0x1F, input)
        }
        _ => {
            let header = header::read_header(input)?;
            decode_from_header(codec, input, header)
        }
    }
}

fn decode_from_header(codec: &Codec, input: &mut &[u8], header: Header) -> Result<Value> {
    match header.major {
        MajorType::UnsignedInt => {
            let n = header::info_as_u64(header.info, || illegal_stream("an integer"))?;
            Ok(Value::Int(crate::integer::CborInt::from_pos_wire(n)))
        }
        MajorType::NegativeInt => {
            let n = header::info_as_u64(header.info, || illegal_stream("an integer"))?;
            Ok(Value::Int(crate::integer::CborInt::from_neg_wire(n)))
        }
        MajorType::ByteString => decode_bytes(input, header.info).map(Value::Bytes),
        MajorType::TextString => decode_text(input, header.info),
        MajorType::Array => decode_array(codec, input, header.info),
        MajorType::Map => decode_map(codec, input, header.info),
        MajorType::Tag => decode_tag(codec, input, header.info),
        MajorType::SimpleOrFloat => unreachable!("major 7 is dispatched in decode_value before read_header"),
    }
}

fn decode_bytes(input: &mut &[u8], info: Info) -> Result<Vec<u8>> {
    match info {
        Info::Indefinite => decode_chunks(input, MajorType::ByteString),
        _ => {
            let len = header::info_as_u64(info, || unreachable!())? as usize;
            read_exact(input, len)
        }
    }
}

fn decode_text(input: &mut &[u8], info: Info) -> Result<Value> {
    let bytes = match info {
        Info::Indefinite => decode_chunks(input, MajorType::TextString)?,
        _ => {
            let len = header::info_as_u64(info, || unreachable!())? as usize;
            read_exact(input, len)?
        }
    };
    String::from_utf8(bytes)
        .map(Value::Text)
        .map_err(|e| report(Error::new(ErrorKind::IllegalChunkType, format!("text string is not valid UTF-8: {e}"))))
}

/// Concatenate an indefinite-length stream of same-major-type, definite-
/// length chunks until the break byte (spec §4.5's "streaming chunk
/// assembly").
fn decode_chunks(input: &mut &[u8], expected: MajorType) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        if peek_is_break(input) {
            *input = &input[1..];
            return Ok(out);
        }
        let chunk_header = header::read_header(input)?;
        if chunk_header.major != expected {
            return Err(report(Error::new(
                ErrorKind::IllegalChunkType,
                "stream chunk's major type doesn't match the stream",
            )));
        }
        match chunk_header.info {
            Info::Indefinite => return Err(illegal_stream("a stream chunk")),
            _ => {
                let len = header::info_as_u64(chunk_header.info, || unreachable!())? as usize;
                out.extend_from_slice(&read_exact(input, len)?);
            }
        }
    }
}

fn peek_is_break(input: &[u8]) -> bool {
    input.first() == Some(&0xFF)
}

fn read_exact(input: &mut &[u8], len: usize) -> Result<Vec<u8>> {
    if input.len() < len {
        return Err(eof());
    }
    let (taken, rest) = input.split_at(len);
    *input = rest;
    Ok(taken.to_vec())
}

fn decode_array(codec: &Codec, input: &mut &[u8], info: Info) -> Result<Value> {
    match info {
        Info::Indefinite => {
            let mut items = Vec::new();
            loop {
                if peek_is_break(input) {
                    *input = &input[1..];
                    return Ok(Value::Array(items, Streamed(true)));
                }
                items.push(decode_value(codec, input)?);
            }
        }
        _ => {
            let len = header::info_as_u64(info, || unreachable!())? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(codec, input)?);
            }
            Ok(Value::Array(items, Streamed(false)))
        }
    }
}

fn decode_map(codec: &Codec, input: &mut &[u8], info: Info) -> Result<Value> {
    let mut entries: Vec<(Value, Value)> = Vec::new();
    match info {
        Info::Indefinite => {
            loop {
                if peek_is_break(input) {
                    *input = &input[1..];
                    return Ok(Value::Map(entries, Streamed(true)));
                }
                let key = decode_value(codec, input)?;
                check_duplicate_key(&entries, &key)?;
                if peek_is_break(input) {
                    return Err(report(Error::new(
                        ErrorKind::MissingMapValue,
                        "indefinite-length map ended on a key with no paired value",
                    )));
                }
                let value = decode_value(codec, input)?;
                entries.push((key, value));
            }
        }
        _ => {
            let len = header::info_as_u64(info, || unreachable!())? as usize;
            for _ in 0..len {
                let key = decode_value(codec, input)?;
                check_duplicate_key(&entries, &key)?;
                let value = decode_value(codec, input)?;
                entries.push((key, value));
            }
            Ok(Value::Map(entries, Streamed(false)))
        }
    }
}

fn check_duplicate_key(entries: &[(Value, Value)], key: &Value) -> Result<()> {
    if entries.iter().any(|(k, _)| k == key) {
        return Err(report(Error::new(ErrorKind::DuplicateMapKey, "map contains the same key twice")));
    }
    Ok(())
}

fn decode_tag(codec: &Codec, input: &mut &[u8], info: Info) -> Result<Value> {
    let tag = header::info_as_u64(info, || illegal_stream("a tag"))?;
    let wrapped = decode_value(codec, input)?;

    if tag == codec.set_tag() {
        return decode_set(codec, wrapped);
    }

    if let Some(handler) = codec.read_handler_for(tag) {
        return handler(wrapped).map_err(|e| {
            report(Error::with_data(
                ErrorKind::TagHandlingError,
                format!("tag {tag} handler rejected its wrapped value: {e}"),
                crate::error::Value2::Tag(tag),
            ))
        });
    }

    if codec.strict() {
        return Err(report(Error::with_data(
            ErrorKind::UnknownTag,
            format!("unrecognized tag {tag} in strict mode"),
            crate::error::Value2::Tag(tag),
        )));
    }

    tracing::trace!(tag, "unrecognized tag, falling back to opaque Tagged in lax mode");
    Ok(Value::Tagged(tag, Box::new(wrapped)))
}

fn decode_set(codec: &Codec, wrapped: Value) -> Result<Value> {
    let items = match wrapped {
        Value::Array(items, _) => items,
        _ => {
            return Err(report(Error::new(
                ErrorKind::TagHandlingError,
                "set tag must wrap an array",
            )))
        }
    };
    if codec.strict() {
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if items[i] == items[j] {
                    return Err(report(Error::new(
                        ErrorKind::DuplicateSetEntry,
                        "set contains the same entry twice",
                    )));
                }
            }
        }
    }
    Ok(Value::Set(items))
}

/// Dispatch a major-7 item from its raw 5-bit info code (spec §4.5's
/// 0xE0-0xFF table rows).
fn decode_major7(codec: &Codec, info: u8, input: &mut &[u8]) -> Result<Value> {
    match info {
        0..=19 => resolve_simple(info, codec.strict()),
        20 => Ok(Value::Bool(false)),
        21 => Ok(Value::Bool(true)),
        22 => Ok(Value::Null),
        23 => Ok(Value::Undefined),
        24 => {
            let code = read_u8(input)?;
            resolve_simple(code, codec.strict())
        }
        25 => {
            let bits = read_u16(input)?;
            Ok(Value::F32(half_float::decode(bits)))
        }
        26 => {
            let bits = read_u32(input)?;
            Ok(Value::F32(f32::from_bits(bits)))
        }
        27 => {
            let bits = read_u64(input)?;
            Ok(Value::F64(f64::from_bits(bits)))
        }
        28..=30 => Err(report(Error::new(
            ErrorKind::IllegalSimpleType,
            format!("simple/float additional-info code {info} is reserved"),
        ))),
        31 => Err(report(Error::new(
            ErrorKind::UnexpectedBreak,
            "break byte encountered outside of a stream",
        ))),
        _ => unreachable!("additional-info code is only ever 5 bits"),
    }
}

/// Codes 20-23 and 28-30 are resolved by the caller before reaching here;
/// anything else (0-19 direct, or 32-255 via the extended byte) is an
/// opaque simple value in lax mode and `unknown-simple-value` in strict mode
/// (spec §4.5's simple-value decoding rule).
fn resolve_simple(code: u8, strict: bool) -> Result<Value> {
    if strict {
        return Err(report(Error::new(
            ErrorKind::UnknownSimpleValue,
            format!("simple value code {code} is not a recognized built-in"),
        )));
    }
    Ok(Value::Simple(code))
}

fn read_u8(input: &mut &[u8]) -> Result<u8> {
    if input.is_empty() {
        return Err(eof());
    }
    let v = input[0];
    *input = &input[1..];
    Ok(v)
}

fn read_u16(input: &mut &[u8]) -> Result<u16> {
    if input.len() < 2 {
        return Err(eof());
    }
    let v = u16::from_be_bytes([input[0], input[1]]);
    *input = &input[2..];
    Ok(v)
}

fn read_u32(input: &mut &[u8]) -> Result<u32> {
    if input.len() < 4 {
        return Err(eof());
    }
    let v = u32::from_be_bytes(input[0..4].try_into().unwrap());
    *input = &input[4..];
    Ok(v)
}

fn read_u64(input: &mut &[u8]) -> Result<u64> {
    if input.len() < 8 {
        return Err(eof());
    }
    let v = u64::from_be_bytes(input[0..8].try_into().unwrap());
    *input = &input[8..];
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integer::CborInt;
    use num_bigint::BigUint;

    fn dec(bytes: &[u8]) -> Value {
        let codec = Codec::default();
        let mut slice = bytes;
        decode(&codec, &mut slice).unwrap().unwrap()
    }

    #[test]
    fn unsigned_small() {
        assert_eq!(dec(&hex::decode("00").unwrap()), Value::Int(CborInt::from(0u8)));
        assert_eq!(dec(&hex::decode("17").unwrap()), Value::Int(CborInt::from(23u8)));
    }

    #[test]
    fn unsigned_wide() {
        assert_eq!(dec(&hex::decode("1818").unwrap()), Value::Int(CborInt::from(24u8)));
        assert_eq!(
            dec(&hex::decode("1bffffffffffffffff").unwrap()),
            Value::Int(CborInt::from(u64::MAX))
        );
    }

    #[test]
    fn negative() {
        assert_eq!(dec(&hex::decode("20").unwrap()), Value::Int(CborInt::from(-1i8)));
        assert_eq!(dec(&hex::decode("387f").unwrap()), Value::Int(CborInt::from(-128i16)));
    }

    #[test]
    fn indefinite_array_marks_streamed() {
        let v = dec(&hex::decode("9f018202039f0405ffff").unwrap());
        assert!(v.was_streamed());
        assert_eq!(
            v,
            Value::Array(
                vec![
                    Value::Int(CborInt::from(1u8)),
                    Value::Array(vec![Value::Int(CborInt::from(2u8)), Value::Int(CborInt::from(3u8))], Streamed(false)),
                    Value::Array(vec![Value::Int(CborInt::from(4u8)), Value::Int(CborInt::from(5u8))], Streamed(true)),
                ],
                Streamed(true),
            )
        );
    }

    #[test]
    fn indefinite_text_concatenates_chunks() {
        let v = dec(&hex::decode("7f657374726561646d696e67ff").unwrap());
        assert_eq!(v, Value::Text("streaming".into()));
    }

    #[test]
    fn duplicate_map_key_rejected() {
        let codec = Codec::default();
        let mut slice: &[u8] = &hex::decode("a201020103").unwrap();
        let err = decode(&codec, &mut slice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateMapKey);
    }

    #[test]
    fn indefinite_map_missing_value_rejected() {
        let codec = Codec::default();
        let mut slice: &[u8] = &hex::decode("bf6346756eff").unwrap();
        let err = decode(&codec, &mut slice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingMapValue);
    }

    #[test]
    fn bignum_reconstructs_via_read_handler() {
        let v = dec(&hex::decode("c249010000000000000000").unwrap());
        assert_eq!(v, Value::PosBignum(BigUint::from(18446744073709551616u128)));
    }

    #[test]
    fn negative_bignum_reconstructs_via_read_handler() {
        // Same bytes as the positive-bignum vector above, under tag 3
        // instead of tag 2: represents -1 - 18446744073709551616.
        let v = dec(&hex::decode("c349010000000000000000").unwrap());
        assert_eq!(
            v,
            Value::neg_bignum_from_magnitude(BigUint::from(18446744073709551616u128))
        );
        assert_eq!(
            v.as_bigint(),
            Some(-num_bigint::BigInt::from(1) - num_bigint::BigInt::from(18446744073709551616u128))
        );
    }

    #[test]
    fn set_tag_wraps_array_as_set() {
        let v = dec(&hex::decode("d9010283010203").unwrap());
        assert_eq!(
            v,
            Value::Set(vec![
                Value::Int(CborInt::from(1u8)),
                Value::Int(CborInt::from(2u8)),
                Value::Int(CborInt::from(3u8)),
            ])
        );
    }

    #[test]
    fn unknown_tag_is_opaque_in_lax_mode_and_errors_in_strict_mode() {
        let lax = Codec::default();
        let mut slice: &[u8] = &hex::decode("d86401").unwrap();
        assert_eq!(
            decode(&lax, &mut slice).unwrap().unwrap(),
            Value::Tagged(100, Box::new(Value::Int(CborInt::from(1u8))))
        );

        let strict = Codec::builder().strict(true).build();
        let mut slice: &[u8] = &hex::decode("d86401").unwrap();
        let err = decode(&strict, &mut slice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTag);
    }

    #[test]
    fn clean_eof_before_first_byte_is_not_an_error() {
        let codec = Codec::default();
        let mut slice: &[u8] = &[];
        assert_eq!(decode(&codec, &mut slice).unwrap(), None);
    }

    #[test]
    fn mid_value_eof_is_an_error() {
        let codec = Codec::default();
        let mut slice: &[u8] = &[0x18];
        let err = decode(&codec, &mut slice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndOfInput);
    }

    #[test]
    fn decode_seq_terminates_cleanly_at_end_of_input() {
        let codec = Codec::default();
        let mut slice: &[u8] = &hex::decode("0102").unwrap();
        let values: Result<Vec<Value>> = decode_seq(&codec, &mut slice).collect();
        assert_eq!(values.unwrap(), vec![Value::Int(CborInt::from(1u8)), Value::Int(CborInt::from(2u8))]);
    }

    #[test]
    fn four_byte_utf8_text() {
        // U+10151, the astrological symbol for "Aries" used in RFC 7049
        // Appendix A as its non-BMP text example.
        assert_eq!(dec(&hex::decode("64f0908591").unwrap()), Value::Text("\u{10151}".into()));
    }

    #[test]
    fn indefinite_map_streaming() {
        let v = dec(&hex::decode("bf6346756ef563416d7421ff").unwrap());
        assert!(v.was_streamed());
        assert_eq!(
            v,
            Value::Map(
                vec![
                    (Value::Text("Fun".into()), Value::Bool(true)),
                    (Value::Text("Amt".into()), Value::Int(CborInt::from(-2i8))),
                ],
                Streamed(true),
            )
        );
    }

    #[test]
    fn uuid_tag_validated_and_left_as_bytes() {
        let v = dec(&hex::decode("d82550dbd559ef333b4f1196b1b0654babe844").unwrap());
        assert_eq!(
            v,
            Value::Bytes(hex::decode("dbd559ef333b4f1196b1b0654babe844").unwrap())
        );
    }

    #[test]
    fn self_describe_tag_is_transparent() {
        let v = dec(&hex::decode("d9d9f70f").unwrap());
        assert_eq!(v, Value::Int(CborInt::from(15u8)));
    }

    /// RFC 7049 Appendix A vectors not already exercised by a more specific
    /// test above: the large negative integer, half-precision NaN, and a set
    /// whose wire entries aren't already sorted.
    #[test]
    fn appendix_a_large_negative_integer() {
        assert_eq!(
            dec(&hex::decode("3bffffffffffffffff").unwrap()),
            Value::Int(CborInt::from_neg_wire(u64::MAX))
        );
    }

    #[test]
    fn appendix_a_half_precision_nan() {
        let v = dec(&hex::decode("f97e00").unwrap());
        assert!(matches!(v, Value::F32(f) if f.is_nan()));
    }

    #[test]
    fn appendix_a_set_tag_unsorted_entries() {
        let v = dec(&hex::decode("d9010283010302").unwrap());
        assert_eq!(
            v,
            Value::Set(vec![
                Value::Int(CborInt::from(1u8)),
                Value::Int(CborInt::from(3u8)),
                Value::Int(CborInt::from(2u8)),
            ])
        );
    }
}
