//! A byte-exact RFC 7049 CBOR codec: header/length encoding for all eight
//! major types, a streaming decoder, canonicalization, a configurable tag
//! registry, and a single dynamically-scoped error sink.
//!
//! The library surface is value-based rather than a generic serde bridge:
//! build a [`Codec`] (or use [`Codec::default`]), then call [`encode`] /
//! [`decode`] against a [`Value`].

pub mod codec;
pub mod decode;
pub mod encode;
pub mod error;
pub mod half_float;
pub mod header;
pub mod integer;
pub mod tags;
pub mod value;

pub use codec::{Codec, CodecBuilder};
pub use error::{install_sink, Error, ErrorKind, ErrorSink, ErrorSinkGuard, Result};
pub use integer::CborInt;
pub use tags::DispatchKey;
pub use value::{Streamed, Value};

/// Encode `value` with the default codec, returning the bytes written
/// (spec §6's `encode(codec, value) -> bytes`, against `Codec::default()`).
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode::encode(&Codec::default(), value)
}

/// Encode `value` with the default codec into an existing buffer, returning
/// the number of bytes appended (spec §6's `encode(codec, sink, value) ->
/// count`).
pub fn encode_into(buf: &mut Vec<u8>, value: &Value) -> Result<usize> {
    encode::encode_into(&Codec::default(), buf, value)
}

/// Encode each of `values` in turn with the default codec, returning the
/// total bytes written (spec §6's `encode-seq`).
pub fn encode_seq<'a>(buf: &mut Vec<u8>, values: impl IntoIterator<Item = &'a Value>) -> Result<usize> {
    encode::encode_seq(&Codec::default(), buf, values)
}

/// Decode exactly one self-contained value from the front of `input` with
/// the default codec (spec §6's `decode(codec, source) -> value`).
pub fn decode<'a>(input: &mut &'a [u8]) -> Result<Option<Value>> {
    decode::decode(&Codec::default(), input)
}

/// A lazy iterator over consecutive values in `input`, using the default
/// codec, terminating at a clean end of input (spec §6's `decode-seq`).
pub fn decode_seq<'a, 'b>(input: &'a mut &'b [u8]) -> decode::DecodeSeq<'a, 'b> {
    // `Codec::default()` is cheap (a handful of `Arc`-cloned handler
    // entries) but the iterator needs a borrow that outlives this call, so
    // leak-free callers wanting a shared codec across many decodes should
    // build one with `Codec::default()` and call `decode::decode_seq`
    // directly instead.
    decode::decode_seq(default_codec(), input)
}

fn default_codec() -> &'static Codec {
    use std::sync::OnceLock;
    static CODEC: OnceLock<Codec> = OnceLock::new();
    CODEC.get_or_init(Codec::default)
}
