//! Integration tests for frame batching through the public API.
//!
//! Everything here runs on the CPU; textures are registered in a plain
//! `HashSet<TextureHandle>` instead of a GPU store.

use std::collections::HashSet;

use glam::{Mat4, Vec2, Vec3};
use quadforge_render::vertex::TexturedInstanceRaw;
use quadforge_render::{
    AtlasRegion, Batcher, BatcherConfig, Diagnostic, DrawBatch, InstanceBuffer, PipelineVariant,
    Quad, QuadInstance, QuadRequest, SpriteSheet, TextureHandle,
};

const A: TextureHandle = TextureHandle::new(10);
const B: TextureHandle = TextureHandle::new(11);
const C: TextureHandle = TextureHandle::new(12);
const MISSING: TextureHandle = TextureHandle::new(404);

fn registry() -> HashSet<TextureHandle> {
    [A, B, C].into()
}

/// Tag each quad with its submission index through the x translation.
fn tagged(texture: TextureHandle, tag: usize) -> QuadRequest {
    let transform = Mat4::from_translation(Vec3::new(tag as f32, 0.0, 0.0));
    QuadRequest::textured(texture, QuadInstance::new(transform))
}

fn tag(raw: &TexturedInstanceRaw) -> usize {
    raw.model[3][0] as usize
}

#[test]
fn test_one_batch_per_key() {
    let mut batcher = Batcher::default();
    batcher.begin_frame().unwrap();

    let pattern = [A, B, C, A, A, C, B, MISSING, A];
    for (i, &tex) in pattern.iter().enumerate() {
        batcher.submit(tagged(tex, i)).unwrap();
    }
    batcher.submit(QuadRequest::solid(Mat4::IDENTITY)).unwrap();

    let list = batcher.finish(&registry()).unwrap();
    // A, B, C textured plus one solid; MISSING contributes nothing.
    assert_eq!(list.len(), 4);
    assert_eq!(list.instance_count(), 9);
    assert_eq!(list.diagnostics().len(), 1);

    let keys: HashSet<_> = list.iter().map(|b| (b.variant, b.texture)).collect();
    assert_eq!(keys.len(), list.len(), "a key was split across batches");
}

#[test]
fn test_submission_order_within_batch() {
    let mut batcher = Batcher::default();
    batcher.begin_frame().unwrap();
    let pattern = [C, A, B, A, C, A, B];
    for (i, &tex) in pattern.iter().enumerate() {
        batcher.submit(tagged(tex, i)).unwrap();
    }
    let list = batcher.finish(&registry()).unwrap();

    let records = batcher.textured_instances().records();
    for batch in &list {
        let range = batch.instance_range();
        let tags: Vec<usize> = records[range.start as usize..range.end as usize]
            .iter()
            .map(tag)
            .collect();
        let expected: Vec<usize> = pattern
            .iter()
            .enumerate()
            .filter(|(_, t)| Some(**t) == batch.texture)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tags, expected);
    }
}

#[test]
fn test_layered_scenario_does_not_coalesce() {
    let mut batcher = Batcher::default();
    batcher.begin_frame().unwrap();
    batcher.submit(tagged(A, 0).with_layer(0)).unwrap();
    batcher.submit(tagged(B, 1).with_layer(1)).unwrap();
    batcher.submit(tagged(A, 2).with_layer(2)).unwrap();
    let list = batcher.finish(&registry()).unwrap();

    let batch = |texture, offset| DrawBatch {
        texture: Some(texture),
        variant: PipelineVariant::Textured,
        instance_offset: offset,
        instance_count: 1,
    };
    assert_eq!(list.batches(), &[batch(A, 0), batch(B, 1), batch(A, 2)]);
}

#[test]
fn test_empty_frame() {
    let mut batcher = Batcher::default();
    batcher.begin_frame().unwrap();
    let list = batcher.finish(&registry()).unwrap();
    assert!(list.is_empty());
    assert_eq!(list.instance_count(), 0);
    assert_eq!(batcher.instance_bytes(PipelineVariant::Textured).len(), 0);
    assert_eq!(batcher.instance_bytes(PipelineVariant::Solid).len(), 0);
}

#[test]
fn test_unknown_texture_leaves_rest_intact() {
    let mut batcher = Batcher::default();
    batcher.begin_frame().unwrap();
    batcher.submit(tagged(A, 0)).unwrap();
    batcher.submit(tagged(MISSING, 1)).unwrap();
    batcher.submit(tagged(B, 2)).unwrap();
    batcher.submit(tagged(A, 3)).unwrap();
    let list = batcher.finish(&registry()).unwrap();

    match list.diagnostics() {
        [Diagnostic::UnknownTexture(e)] => {
            assert_eq!(e.request, 1);
            assert_eq!(e.texture, MISSING);
        }
        other => panic!("Expected one UnknownTexture diagnostic, got {other:?}"),
    }
    let got: Vec<_> = list.iter().map(|b| (b.texture, b.instance_count)).collect();
    assert_eq!(got, vec![(Some(A), 2), (Some(B), 1)]);
    let tags: Vec<usize> = batcher.textured_instances().records().iter().map(tag).collect();
    assert_eq!(tags, vec![0, 3, 2]);
}

#[test]
fn test_reset_then_push_starts_at_zero() {
    let mut buffer = InstanceBuffer::<TexturedInstanceRaw>::new(2, 64);
    for i in 0..5 {
        buffer.push(tagged(A, i).instance().to_textured()).unwrap();
    }
    buffer.reset();
    for i in 0..3 {
        let offset = buffer.push(tagged(A, 100 + i).instance().to_textured()).unwrap();
        assert_eq!(offset, i);
    }
    assert_eq!(buffer.len(), 3);
    assert_eq!(tag(&buffer.records()[0]), 100);
}

#[test]
fn test_growth_keeps_records_in_order() {
    let mut buffer = InstanceBuffer::<TexturedInstanceRaw>::new(1, 1_000);
    for i in 0..100 {
        buffer.push(tagged(A, i).instance().to_textured()).unwrap();
    }
    assert!(buffer.capacity() >= 100);
    let records: &[TexturedInstanceRaw] = bytemuck::cast_slice(buffer.as_bytes());
    let tags: Vec<usize> = records.iter().map(tag).collect();
    assert_eq!(tags, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_right_half_atlas_region() {
    let region = AtlasRegion::new([0.5, 0.0], [0.5, 1.0]);
    assert_eq!(region.apply([0.0, 0.0]), [0.5, 0.0]);
    assert_eq!(region.apply([1.0, 1.0]), [1.0, 1.0]);

    let sheet = SpriteSheet::new((64, 32), (32, 32));
    assert_eq!(sheet.get(1, 0), Some(region));
}

#[test]
fn test_frames_alternate_slots_until_acknowledged() {
    let mut batcher = Batcher::new(BatcherConfig::default().with_frames_in_flight(2));
    let quad = Quad::new(Vec2::ZERO, Vec2::splat(8.0));

    let mut frames = Vec::new();
    for _ in 0..2 {
        let frame = batcher.begin_frame().unwrap();
        batcher.submit(QuadRequest::textured(A, quad.instance())).unwrap();
        assert_eq!(batcher.finish(&registry()).unwrap().frame(), frame);
        frames.push(frame);
    }
    assert!(batcher.begin_frame().is_err());

    for frame in frames {
        assert!(batcher.acknowledge(frame));
    }
    assert!(batcher.begin_frame().is_ok());
}
