//! Criterion benchmark untuk dispatch dan stream codec
//!
//! Run dengan: cargo bench

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sub0pub::core::{Registry, Subscribe};
use sub0pub::protocol::{FrameConfig, FrameEncoder, StreamDeserializer, StreamSerializer};

struct Counter(Cell<u64>);

impl Subscribe<u64> for Counter {
    #[inline]
    fn receive(&self, data: &u64) {
        self.0.set(self.0.get().wrapping_add(*data));
    }
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.throughput(Throughput::Elements(1));

    for subscribers in [1usize, 4, 8] {
        group.bench_function(format!("fan_out_{}", subscribers), |b| {
            let registry = Registry::new();
            let counter = Rc::new(Counter(Cell::new(0)));
            let _subs: Vec<_> = (0..subscribers)
                .map(|_| registry.subscribe::<u64, _>(Rc::clone(&counter)).unwrap())
                .collect();
            let publisher = registry.publisher::<u64>();
            let mut i = 0u64;
            b.iter(|| {
                publisher.publish(black_box(&i));
                i = i.wrapping_add(1);
            });
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_frame", |b| {
        let mut encoder = FrameEncoder::new(256, FrameConfig::default());
        let payload = [7u8; 64];
        b.iter(|| {
            black_box(encoder.encode(black_box(42), black_box(&payload)));
        });
    });

    group.bench_function("forward", |b| {
        let registry = Registry::new();
        let serializer = StreamSerializer::new(&registry, Vec::with_capacity(1 << 20));
        let mut i = 0u64;
        b.iter(|| {
            serializer.forward(black_box(&i)).ok();
            i = i.wrapping_add(1);
            // Jaga sink tetap kecil
            if i % 10_000 == 0 {
                serializer.with_sink(|sink| sink.clear());
            }
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for batch_size in [100u64, 1000, 10000] {
        let registry = Registry::new();
        let serializer = StreamSerializer::new(&registry, Vec::new());
        for i in 0..batch_size {
            serializer.forward(&i).ok();
        }
        let bytes = serializer.into_inner();

        group.throughput(Throughput::Elements(batch_size));
        group.bench_function(format!("batch_{}", batch_size), |b| {
            let total = Rc::new(Cell::new(0u64));
            let sink = Rc::clone(&total);
            let mut de = StreamDeserializer::new();
            de.register_callback(registry.type_id::<u64>(), 8, move |bytes: &[u8]| {
                sink.set(sink.get() + bytes.len() as u64)
            })
            .ok();

            b.iter(|| {
                let mut source = &bytes[..];
                while de.feed(black_box(&mut source)).unwrap_or(false) {}
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_publish, bench_codec, bench_decode);
criterion_main!(benches);
