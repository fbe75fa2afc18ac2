#![no_main]
use cbor_codec::Codec;
use libfuzzer_sys::fuzz_target;

/// A successfully decoded value must re-encode to bytes that decode back to
/// an equal value (spec §8's round-trip law, restricted to whatever the
/// fuzzer happens to find decodable).
fuzz_target!(|data: &[u8]| {
    let codec = Codec::default();
    let mut slice = data;
    if let Ok(Some(value)) = cbor_codec::decode::decode(&codec, &mut slice) {
        if let Ok(bytes) = cbor_codec::encode::encode(&codec, &value) {
            let mut reencoded = &bytes[..];
            let value2 = cbor_codec::decode::decode(&codec, &mut reencoded).unwrap();
            assert_eq!(Some(value), value2);
        }
    }
});
