//! Per-frame draw list handed from the batcher to the submission layer.

use std::fmt;
use std::ops::Range;

use crate::batcher::Diagnostic;
use crate::textures::TextureHandle;
use crate::vertex::PipelineVariant;

/// Monotonic frame counter assigned by the batcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

impl FrameId {
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame #{}", self.0)
    }
}

/// One instanced draw call: a contiguous run of instances sharing a
/// pipeline variant and texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBatch {
    /// `Some` exactly for [`PipelineVariant::Textured`].
    pub texture: Option<TextureHandle>,
    pub variant: PipelineVariant,
    /// First record in the variant's instance buffer.
    pub instance_offset: u32,
    /// Always > 0.
    pub instance_count: u32,
}

impl DrawBatch {
    /// Instance range for `draw_indexed`.
    pub fn instance_range(&self) -> Range<u32> {
        self.instance_offset..self.instance_offset + self.instance_count
    }
}

/// Ordered draw calls for one frame, plus what went wrong building them.
///
/// Immutable once produced; discarded after submission.
#[derive(Clone, Debug)]
pub struct FrameRenderList {
    frame: FrameId,
    batches: Vec<DrawBatch>,
    diagnostics: Vec<Diagnostic>,
}

impl FrameRenderList {
    pub(crate) fn new(frame: FrameId, batches: Vec<DrawBatch>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            frame,
            batches,
            diagnostics,
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Dropped or clamped requests, in submission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawBatch> {
        self.batches.iter()
    }

    /// Number of draw calls.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total instances across all batches.
    pub fn instance_count(&self) -> u32 {
        self.batches.iter().map(|b| b.instance_count).sum()
    }
}

impl<'a> IntoIterator for &'a FrameRenderList {
    type Item = &'a DrawBatch;
    type IntoIter = std::slice::Iter<'a, DrawBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_range() {
        let batch = DrawBatch {
            texture: None,
            variant: PipelineVariant::Solid,
            instance_offset: 3,
            instance_count: 4,
        };
        assert_eq!(batch.instance_range(), 3..7);
    }

    #[test]
    fn test_list_totals_and_iteration() {
        let batches = vec![
            DrawBatch {
                texture: Some(TextureHandle(0)),
                variant: PipelineVariant::Textured,
                instance_offset: 0,
                instance_count: 2,
            },
            DrawBatch {
                texture: None,
                variant: PipelineVariant::Solid,
                instance_offset: 0,
                instance_count: 5,
            },
        ];
        let list = FrameRenderList::new(FrameId(9), batches, Vec::new());
        assert_eq!(list.len(), 2);
        assert_eq!(list.instance_count(), 7);
        assert_eq!(list.frame().to_string(), "frame #9");
        let variants: Vec<_> = (&list).into_iter().map(|b| b.variant).collect();
        assert_eq!(variants, vec![PipelineVariant::Textured, PipelineVariant::Solid]);
    }
}
