use rand::Rng;

use astropix::bits::reverse_bits;
use astropix::{decode, DecodeOpts};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

// Random DAQ-like stream of `readouts` lines, each with a few hits and some idle padding.
fn random_stream(readouts: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut stream = Vec::new();
    for _ in 0..readouts {
        stream.push(b'\'');
        for _ in 0..rng.gen_range(0..4) {
            let record: [u8; 4] = rng.gen();
            stream.extend_from_slice(format!("20{}", hex::encode(record)).as_bytes());
        }
        if rng.gen_bool(0.3) {
            stream.extend_from_slice(b"bcbcbcbc");
        }
        stream.push(b'\'');
        stream.extend_from_slice(b"ffff");
    }
    stream
}

fn bench_decode(c: &mut Criterion) {
    let stream = random_stream(10_000);
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| decode(&stream, &DecodeOpts::default()).unwrap());
    });
    group.bench_function("parallel", |b| {
        let opts = DecodeOpts::builder().num_threads(4).build();
        b.iter(|| decode(&stream, &opts).unwrap());
    });
    group.finish();
}

fn bench_reverse_bits(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let mut buf = [0u8; 1024];
    rng.fill(&mut buf[..]);

    let mut group = c.benchmark_group("reverse_bits");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("loop", |b| {
        b.iter(|| buf.iter().map(|x| reverse_bits(*x)).collect::<Vec<u8>>());
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_reverse_bits);
criterion_main!(benches);
