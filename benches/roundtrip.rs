use cbor_codec::{Codec, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_value() -> Value {
    Value::Array(
        vec![
            Value::from(0u8),
            Value::from(-1i8),
            Value::from("hello, cbor"),
            Value::Bytes(vec![1, 2, 3, 4, 5, 6, 7, 8]),
            Value::Map(
                vec![
                    (Value::from("a"), Value::from(1u8)),
                    (Value::from("b"), Value::from(2u8)),
                ],
                cbor_codec::Streamed(false),
            ),
            Value::F64(3.14159),
        ],
        cbor_codec::Streamed(false),
    )
}

fn bench_encode(c: &mut Criterion) {
    let codec = Codec::default();
    let value = sample_value();
    c.bench_function("encode", |b| {
        b.iter(|| cbor_codec::encode::encode(&codec, black_box(&value)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let codec = Codec::default();
    let bytes = cbor_codec::encode::encode(&codec, &sample_value()).unwrap();
    c.bench_function("decode", |b| {
        b.iter(|| {
            let mut slice = black_box(&bytes[..]);
            cbor_codec::decode::decode(&codec, &mut slice).unwrap()
        })
    });
}

fn bench_canonical_map_sort(c: &mut Criterion) {
    let codec = Codec::builder().canonical(true).build();
    let entries: Vec<(Value, Value)> = (0..64)
        .map(|i| (Value::from(i as u32), Value::from((i * 2) as u32)))
        .collect();
    let map = Value::Map(entries, cbor_codec::Streamed(false));
    c.bench_function("canonical_encode_64_key_map", |b| {
        b.iter(|| cbor_codec::encode::encode(&codec, black_box(&map)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_canonical_map_sort);
criterion_main!(benches);
