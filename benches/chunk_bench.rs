use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xorchunk::{Appender, Chunk, ChunkIterator, Sample, XORChunk};

/// Scrape-like series: 15s interval, slowly varying values.
fn generate_data(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let t = 1_609_459_200_000 + (i as i64) * 15_000;
            let v = 20.0 + 5.0 * ((i as f64) * 0.01).sin();
            Sample::new(t, v)
        })
        .collect()
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for size in [120, 1_000, 10_000] {
        let data = generate_data(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("varying", size), &data, |b, data| {
            b.iter(|| {
                let mut chunk = XORChunk::new();
                let mut a = chunk.xor_appender().unwrap();
                for s in data {
                    a.append(black_box(s.t), black_box(s.v)).unwrap();
                }
                black_box(chunk.num_samples())
            });
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for size in [120, 1_000, 10_000] {
        let chunk = XORChunk::from_samples(generate_data(size)).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("varying", size), &chunk, |b, chunk| {
            b.iter(|| {
                let mut it = chunk.xor_iterator();
                let mut sum = 0.0;
                while it.next().unwrap() {
                    sum += it.at().1;
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_iterate);
criterion_main!(benches);
