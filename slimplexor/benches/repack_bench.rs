//! Repacking Performance Benchmark
//!
//! Measures how fast one period of source frames is re-encoded into the
//! transfer buffer, and the cost of compacting after a partial write.
//!
//! **Goal:** One 16 KiB period should repack in well under its play time

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use slimplexor::audio::{FrameLayout, FrameRepacker, SampleFormat, TransferBuffer};
use slimplexor::HostConstraints;

fn bench_repack_period(c: &mut Criterion) {
    let constraints = HostConstraints::default();
    let mut group = c.benchmark_group("repack_period");

    for format in SampleFormat::ALL {
        let layout = FrameLayout::new(format, 2);
        let frames = constraints.period_frames(format, 2);
        let source = vec![0x5Au8; frames * layout.source_frame_size()];
        let repacker = FrameRepacker::new(layout);
        let mut buffer = TransferBuffer::allocate(frames, layout.target_frame_size()).unwrap();

        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format), &source, |b, source| {
            b.iter(|| {
                buffer.clear();
                repacker.repack(&mut buffer, black_box(source), frames);
                black_box(buffer.filled_frames());
            });
        });
    }

    group.finish();
}

fn bench_buffer_maintenance(c: &mut Criterion) {
    let layout = FrameLayout::new(SampleFormat::S16Le, 2);
    let frames = HostConstraints::default().period_frames(SampleFormat::S16Le, 2);
    let source = vec![0x11u8; frames * layout.source_frame_size()];
    let repacker = FrameRepacker::new(layout);
    let mut group = c.benchmark_group("buffer_maintenance");

    group.bench_function("compact_after_half_write", |b| {
        let mut buffer = TransferBuffer::allocate(frames, layout.target_frame_size()).unwrap();
        b.iter(|| {
            buffer.clear();
            repacker.repack(&mut buffer, &source, frames);
            buffer.consume(black_box(frames / 2));
        });
    });

    group.bench_function("marker_period", |b| {
        let mut buffer = TransferBuffer::allocate(frames, layout.target_frame_size()).unwrap();
        b.iter(|| {
            buffer.fill_with_marker(black_box(1));
            black_box(buffer.filled_frames());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_repack_period, bench_buffer_maintenance);
criterion_main!(benches);
