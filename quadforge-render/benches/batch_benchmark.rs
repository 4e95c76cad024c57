//! Benchmarks for quadforge-render batching and instance packing.

use std::collections::HashSet;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec2};
use quadforge_render::vertex::{CameraUniform, TexturedInstanceRaw};
use quadforge_render::{
    AtlasRegion, Batcher, BatcherConfig, Camera2D, InstanceBuffer, Quad, QuadRequest,
    TextureHandle,
};

const TEXTURES: u32 = 8;

fn registry() -> HashSet<TextureHandle> {
    (0..TEXTURES).map(TextureHandle::new).collect()
}

/// Generate `n` random-ish quad requests spread over a few textures.
fn make_requests(n: usize) -> Vec<QuadRequest> {
    (0..n)
        .map(|i| {
            let fi = i as f32;
            let quad = Quad::new(
                Vec2::new((fi * 7.3) % 1920.0, (fi * 13.7) % 1080.0),
                Vec2::new(16.0 + (fi * 3.1) % 64.0, 16.0 + (fi * 5.7) % 64.0),
            )
            .with_rotation((fi * 11.0) % 360.0)
            .with_color([(fi * 0.17) % 1.0, (fi * 0.31) % 1.0, (fi * 0.53) % 1.0, 1.0]);
            let texture = TextureHandle::new((i as u32 * 7) % TEXTURES);
            let region = AtlasRegion::new([0.25 * (i % 4) as f32, 0.0], [0.25, 1.0]);
            QuadRequest::textured(texture, quad.instance().with_region(region))
        })
        .collect()
}

fn bench_batcher_finish(c: &mut Criterion) {
    let textures = registry();
    let mut group = c.benchmark_group("batcher_finish");
    for &count in &[100, 1_000, 10_000] {
        let requests = make_requests(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &requests, |b, requests| {
            let mut batcher = Batcher::new(BatcherConfig::default().with_frames_in_flight(1));
            b.iter(|| {
                let frame = batcher.begin_frame().unwrap();
                for &request in requests {
                    batcher.submit(request).unwrap();
                }
                let list = batcher.finish(&textures).unwrap();
                black_box(list.len());
                batcher.acknowledge(frame);
            });
        });
    }
    group.finish();
}

fn bench_instance_push(c: &mut Criterion) {
    let record = Quad::new(Vec2::ZERO, Vec2::ONE).instance().to_textured();
    c.bench_function("InstanceBuffer::push_10k", |b| {
        let mut buffer = InstanceBuffer::<TexturedInstanceRaw>::new(1_024, 100_000);
        b.iter(|| {
            buffer.reset();
            for _ in 0..10_000 {
                black_box(buffer.push(black_box(record)).unwrap());
            }
        });
    });
}

fn bench_quad_transform(c: &mut Criterion) {
    c.bench_function("Quad::transform", |b| {
        let quad = Quad::new(Vec2::new(100.0, 200.0), Vec2::new(300.0, 150.0)).with_rotation(30.0);
        b.iter(|| {
            black_box(black_box(quad).transform());
        });
    });
}

fn bench_camera_orthographic(c: &mut Criterion) {
    c.bench_function("Camera2D::orthographic", |b| {
        b.iter(|| {
            black_box(CameraUniform::from_matrix(Camera2D::orthographic(
                black_box(1920.0),
                black_box(1080.0),
                black_box(100.0),
                black_box(50.0),
                black_box(1.5),
            )));
        });
    });
}

fn bench_bytemuck_cast(c: &mut Criterion) {
    let instances: Vec<TexturedInstanceRaw> = make_requests(1_000)
        .iter()
        .map(|r| r.instance().to_textured())
        .collect();

    c.bench_function("bytemuck_cast_1k_instances", |b| {
        b.iter(|| {
            let bytes: &[u8] = bytemuck::cast_slice(black_box(&instances));
            black_box(bytes.len());
        });
    });
}

fn bench_solid_pack(c: &mut Criterion) {
    c.bench_function("QuadRequest::solid", |b| {
        b.iter(|| black_box(QuadRequest::solid(black_box(Mat4::IDENTITY))));
    });
}

criterion_group!(
    benches,
    bench_batcher_finish,
    bench_instance_push,
    bench_quad_transform,
    bench_camera_orthographic,
    bench_bytemuck_cast,
    bench_solid_pack,
);
criterion_main!(benches);
