//! Local dataset buffer
//!
//! Each node keeps its own copy of the values for the partition it is working
//! on. Values are `start + i + 1` for the partition's `i`-th element, shuffled
//! with Fisher-Yates, so they are strictly positive by construction.
//!
//! Regeneration happens between phases and always finishes before any kernel
//! reads the buffer.

use crate::partition::Partition;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

/// Dataset errors
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("partition {partition} needs {requested} elements but dataset capacity is {capacity}")]
    CapacityExceeded {
        partition: Partition,
        requested: usize,
        capacity: usize,
    },

    #[error("failed to allocate buffer for {elements} elements")]
    Allocation { elements: usize },
}

/// Fixed-capacity buffer of single-precision values
pub struct Dataset {
    values: Vec<f32>,
    capacity: usize,
    rng: Xoshiro256PlusPlus,
}

impl Dataset {
    /// Create an empty dataset; no memory is reserved until the first fill
    pub fn new(capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        Self {
            values: Vec::new(),
            capacity,
            rng,
        }
    }

    /// Fill the buffer for `partition` and shuffle it
    pub fn regenerate(&mut self, partition: Partition) -> Result<(), DatasetError> {
        self.fill(partition)?;
        self.values.shuffle(&mut self.rng);
        Ok(())
    }

    /// Sequential fill without shuffling
    pub fn fill(&mut self, partition: Partition) -> Result<(), DatasetError> {
        if partition.len > self.capacity {
            return Err(DatasetError::CapacityExceeded {
                partition,
                requested: partition.len,
                capacity: self.capacity,
            });
        }

        self.values.clear();
        self.values
            .try_reserve_exact(partition.len)
            .map_err(|_| DatasetError::Allocation {
                elements: partition.len,
            })?;
        self.values
            .extend(partition.range().map(|i| (i + 1) as f32));

        Ok(())
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_values_follow_partition_start() {
        let mut dataset = Dataset::new(16, Some(1));
        dataset.fill(Partition::new(8, 8)).unwrap();
        let expected: Vec<f32> = (9..=16).map(|v| v as f32).collect();
        assert_eq!(dataset.values(), expected.as_slice());
    }

    #[test]
    fn test_regenerate_is_a_shuffle() {
        let mut dataset = Dataset::new(1000, Some(7));
        dataset.regenerate(Partition::new(0, 1000)).unwrap();

        let mut values = dataset.values().to_vec();
        assert_ne!(values, (1..=1000).map(|v| v as f32).collect::<Vec<_>>());
        values.sort_by(f32::total_cmp);
        assert_eq!(values, (1..=1000).map(|v| v as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_shuffles_are_reproducible() {
        let mut a = Dataset::new(500, Some(42));
        let mut b = Dataset::new(500, Some(42));
        a.regenerate(Partition::new(0, 500)).unwrap();
        b.regenerate(Partition::new(0, 500)).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut dataset = Dataset::new(10, None);
        let err = dataset.regenerate(Partition::new(0, 11)).unwrap_err();
        assert!(matches!(err, DatasetError::CapacityExceeded { requested: 11, capacity: 10, .. }));
    }

    #[test]
    fn test_regenerate_shrinks_and_grows() {
        let mut dataset = Dataset::new(100, Some(3));
        dataset.regenerate(Partition::new(0, 100)).unwrap();
        assert_eq!(dataset.len(), 100);
        dataset.regenerate(Partition::new(85, 15)).unwrap();
        assert_eq!(dataset.len(), 15);
        assert!(dataset.values().iter().all(|&v| (86.0..=100.0).contains(&v)));
        dataset.regenerate(Partition::EMPTY).unwrap();
        assert!(dataset.is_empty());
    }
}
