//! CPU-side staging store for one frame's packed instance records.
//!
//! Records are kept contiguously in exactly the layout the pipeline binds,
//! so [`InstanceBuffer::as_bytes`] can be handed straight to
//! `Queue::write_buffer`.  The buffer also tracks the capacity the GPU-side
//! buffer must have: whenever it grows, a resync is pending until the
//! submission layer collects it with [`InstanceBuffer::take_resync`].

use bytemuck::Pod;
use log::debug;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Instance buffer needs {requested} records, hard maximum is {max}")]
pub struct CapacityError {
    pub requested: usize,
    pub max: usize,
}

/// Growable, per-frame-reset contiguous store of `T` records.
pub struct InstanceBuffer<T: Pod> {
    records: Vec<T>,
    /// Capacity (in records) the GPU-side buffer is synchronized against.
    capacity: usize,
    max_capacity: usize,
    pending_resync: Option<usize>,
}

impl<T: Pod> InstanceBuffer<T> {
    /// `initial_capacity` is clamped to `max_capacity`.
    pub fn new(initial_capacity: usize, max_capacity: usize) -> Self {
        let capacity = initial_capacity.min(max_capacity);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            max_capacity,
            pending_resync: None,
        }
    }

    /// Truncate to zero records.  Allocated capacity is kept.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Append one record and return its index.
    pub fn push(&mut self, record: T) -> Result<usize, CapacityError> {
        self.grow_to(self.records.len() + 1)?;
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Make room for `additional` more records up front.
    pub fn reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        self.grow_to(self.records.len().saturating_add(additional))
    }

    fn grow_to(&mut self, required: usize) -> Result<(), CapacityError> {
        if required <= self.capacity {
            return Ok(());
        }
        if required > self.max_capacity {
            return Err(CapacityError {
                requested: required,
                max: self.max_capacity,
            });
        }

        let grown = self
            .capacity
            .saturating_mul(2)
            .max(required)
            .min(self.max_capacity);
        self.records.reserve_exact(grown - self.records.len());
        debug!(
            "Instance buffer grew {} -> {} records ({} bytes each)",
            self.capacity,
            grown,
            self.stride()
        );
        self.capacity = grown;
        self.pending_resync = Some(grown);
        Ok(())
    }

    /// New capacity the GPU buffer must be reallocated to, if growth
    /// happened since the last call.
    pub fn take_resync(&mut self) -> Option<usize> {
        self.pending_resync.take()
    }

    pub fn needs_resync(&self) -> bool {
        self.pending_resync.is_some()
    }

    /// The packed region `[0, len * stride)`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Bytes per record.
    pub fn stride(&self) -> usize {
        std::mem::size_of::<T>()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_returns_sequential_indices() {
        let mut buf = InstanceBuffer::<u32>::new(4, 64);
        assert_eq!(buf.push(7).unwrap(), 0);
        assert_eq!(buf.push(8).unwrap(), 1);
        assert_eq!(buf.records(), &[7, 8]);
    }

    #[test]
    fn test_reset_then_push_starts_at_zero() {
        let mut buf = InstanceBuffer::<u32>::new(2, 64);
        for i in 0..10 {
            buf.push(i).unwrap();
        }
        buf.reset();
        assert!(buf.is_empty());
        for i in 100..103 {
            buf.push(i).unwrap();
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.records(), &[100, 101, 102]);
        assert_eq!(buf.as_bytes().len(), 3 * 4);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut buf = InstanceBuffer::<u32>::new(2, 64);
        for i in 0..9 {
            buf.push(i).unwrap();
        }
        let cap = buf.capacity();
        buf.reset();
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn test_growth_doubles_and_preserves_records() {
        let mut buf = InstanceBuffer::<u32>::new(2, 1024);
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        assert!(!buf.needs_resync());

        buf.push(3).unwrap();
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.take_resync(), Some(4));
        assert_eq!(buf.take_resync(), None);

        let bytes = buf.as_bytes();
        let values: &[u32] = bytemuck::cast_slice(bytes);
        assert_eq!(values, &[1, 2, 3]);
    }

    #[test]
    fn test_reserve_grows_to_required_size() {
        let mut buf = InstanceBuffer::<u32>::new(4, 1024);
        buf.reserve(100).unwrap();
        assert_eq!(buf.capacity(), 100);
        assert_eq!(buf.take_resync(), Some(100));
        // Within capacity: no further resync.
        buf.reserve(50).unwrap();
        assert_eq!(buf.take_resync(), None);
    }

    #[test]
    fn test_growth_is_capped_at_max() {
        let mut buf = InstanceBuffer::<u32>::new(6, 10);
        for i in 0..7 {
            buf.push(i).unwrap();
        }
        assert_eq!(buf.capacity(), 10);
    }

    #[test]
    fn test_capacity_error_beyond_max() {
        let mut buf = InstanceBuffer::<u32>::new(2, 3);
        for i in 0..3 {
            buf.push(i).unwrap();
        }
        let err = buf.push(99).unwrap_err();
        assert_eq!(err, CapacityError { requested: 4, max: 3 });
        // Existing records survive the failed push.
        assert_eq!(buf.records(), &[0, 1, 2]);

        assert!(buf.reserve(10).is_err());
    }

    #[test]
    fn test_initial_capacity_clamped() {
        let buf = InstanceBuffer::<u32>::new(100, 8);
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.max_capacity(), 8);
        assert_eq!(buf.stride(), 4);
    }

    #[test]
    fn test_zero_initial_capacity_grows() {
        let mut buf = InstanceBuffer::<[f32; 4]>::new(0, 16);
        buf.push([1.0; 4]).unwrap();
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.get(0), Some(&[1.0; 4]));
        assert_eq!(buf.as_bytes().len(), 16);
    }
}
