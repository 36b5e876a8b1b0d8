// In sevenpull-core/benches/pipeline_bench.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;

use sevenpull::source::{MemorySource, ShortReadSource};
use sevenpull::{ChainPlan, CodecMethod, Pipeline, PipelineConfig};

/// Generates a vector of highly compressible data.
fn generate_low_entropy_bytes(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let pattern = b"abcdefgABCDEFG12345";
    while data.len() < size {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn generate_high_entropy_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    rand::rng().fill(&mut data[..]);
    data
}

fn encode(data: &[u8], plan: &ChainPlan) -> Vec<u8> {
    Pipeline::encoder(MemorySource::new(data.to_vec()), plan, &PipelineConfig::default())
        .unwrap()
        .read_to_end()
        .unwrap()
}

const BENCH_DATA_SIZE: usize = 1 << 20; // 1 MiB

fn bench_decode_chains(c: &mut Criterion) {
    let low = generate_low_entropy_bytes(BENCH_DATA_SIZE);
    let high = generate_high_entropy_bytes(BENCH_DATA_SIZE);

    let zstd = ChainPlan::new(vec![CodecMethod::Zstd { level: 3 }]);
    let delta_zstd = ChainPlan::new(vec![
        CodecMethod::Delta { distance: 4 },
        CodecMethod::Zstd { level: 3 },
    ]);
    let deflate = ChainPlan::new(vec![CodecMethod::Deflate { level: 6 }]);

    let cases = [
        ("zstd (low entropy)", &zstd, encode(&low, &zstd)),
        ("zstd (high entropy)", &zstd, encode(&high, &zstd)),
        ("delta+zstd (low entropy)", &delta_zstd, encode(&low, &delta_zstd)),
        ("deflate (low entropy)", &deflate, encode(&low, &deflate)),
    ];

    let config = PipelineConfig::default();
    let mut group = c.benchmark_group("Pipeline Decode");
    group.throughput(Throughput::Bytes(BENCH_DATA_SIZE as u64));

    for (name, plan, encoded) in cases.iter() {
        let decode_plan = plan.inverse();
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut pipeline =
                    Pipeline::decoder(MemorySource::new(encoded.clone()), &decode_plan, &config)
                        .unwrap();
                black_box(pipeline.read_to_end().unwrap())
            })
        });
    }

    // Short reads stress the cursor refill path rather than the codec.
    let encoded = encode(&low, &zstd);
    group.bench_function("zstd (low entropy, 512 B reads)", |b| {
        b.iter(|| {
            let source = ShortReadSource::new(MemorySource::new(encoded.clone()), 512).unwrap();
            let mut pipeline = Pipeline::decoder(source, &zstd, &config).unwrap();
            black_box(pipeline.read_to_end().unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode_chains);
criterion_main!(benches);
