#![no_main]
use cbor_codec::Codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = Codec::default();
    let mut slice = data;
    let _ = cbor_codec::decode::decode(&codec, &mut slice);
});
