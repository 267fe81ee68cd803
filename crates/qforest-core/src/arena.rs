//! Chunk - growable block arena of fixed-size records
//!
//! Records live in equally sized blocks; a global index `i` resolves to
//! block `i / block_size`, slot `i % block_size`. Growing never moves
//! existing records, it only appends another block to the block table.
//! Memory is never released by [`Chunk::clear`]; records are reset to
//! their default value in place.

use crate::error::{Error, Result};
use std::ops::{Index, IndexMut};

/// Block arena of `T` records addressed by global index
///
/// # Examples
///
/// ```
/// use qforest_core::Chunk;
///
/// let mut chunk: Chunk<u32> = Chunk::new(2).unwrap();
/// let a = chunk.push(10).unwrap();
/// let b = chunk.push(20).unwrap();
/// let c = chunk.push(30).unwrap(); // grows by one block
/// assert_eq!(chunk.block_count(), 2);
/// assert_eq!(*chunk.get_item(c).unwrap(), 30);
/// assert_eq!((a, b, c), (0, 1, 2));
/// ```
#[derive(Debug, Clone)]
pub struct Chunk<T> {
    blocks: Vec<Vec<T>>,
    block_size: usize,
    count: usize,
}

impl<T: Default> Chunk<T> {
    /// Reserve an arena whose blocks hold `block_size` records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a zero block size and
    /// [`Error::ResourceExhausted`] if the first block cannot be reserved.
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidParameter(
                "chunk block size must be positive".to_string(),
            ));
        }
        let mut chunk = Self {
            blocks: Vec::new(),
            block_size,
            count: 0,
        };
        chunk.grow()?;
        Ok(chunk)
    }

    fn grow(&mut self) -> Result<()> {
        self.blocks.try_reserve(1).map_err(|e| {
            Error::ResourceExhausted(format!("chunk block table: {}", e))
        })?;
        let mut block = Vec::new();
        block.try_reserve_exact(self.block_size).map_err(|e| {
            Error::ResourceExhausted(format!(
                "chunk block of {} records: {}",
                self.block_size, e
            ))
        })?;
        block.resize_with(self.block_size, T::default);
        self.blocks.push(block);
        Ok(())
    }

    /// Allocate the next free record and return its global index.
    ///
    /// The record holds `T::default()`.
    pub fn alloc_item(&mut self) -> Result<usize> {
        if self.count == self.capacity() {
            self.grow()?;
        }
        let index = self.count;
        self.count += 1;
        Ok(index)
    }

    /// Allocate a record and store `value` in it.
    pub fn push(&mut self, value: T) -> Result<usize> {
        let index = self.alloc_item()?;
        *self.slot_mut(index) = value;
        Ok(index)
    }

    /// Reset every allocated record to its default value and the count to
    /// zero, keeping all blocks.
    pub fn clear(&mut self) {
        for index in 0..self.count {
            *self.slot_mut(index) = T::default();
        }
        self.count = 0;
    }
}

impl<T> Chunk<T> {
    #[inline]
    fn slot(&self, index: usize) -> &T {
        &self.blocks[index / self.block_size][index % self.block_size]
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> &mut T {
        let size = self.block_size;
        &mut self.blocks[index / size][index % size]
    }

    /// Resolve a global index to its record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the index was never allocated.
    pub fn get_item(&self, index: usize) -> Result<&T> {
        if index >= self.count {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.count,
            });
        }
        Ok(self.slot(index))
    }

    /// Resolve a global index to its record, mutably.
    pub fn get_item_mut(&mut self, index: usize) -> Result<&mut T> {
        if index >= self.count {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.count,
            });
        }
        Ok(self.slot_mut(index))
    }

    /// Get a record if the index is allocated.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        (index < self.count).then(|| self.slot(index))
    }

    /// Get a record mutably if the index is allocated.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.count {
            Some(self.slot_mut(index))
        } else {
            None
        }
    }

    /// Check whether `index` refers to a record of this arena.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.count
    }

    /// Number of allocated records
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of records the current blocks can hold
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.block_size
    }

    /// Records per block
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks reserved so far
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate allocated records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).map(move |i| self.slot(i))
    }
}

impl<T> Index<usize> for Chunk<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` was never allocated.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(record) => record,
            None => panic!("chunk index {} out of range (len {})", index, self.count),
        }
    }
}

impl<T> IndexMut<usize> for Chunk<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.count;
        match self.get_mut(index) {
            Some(record) => record,
            None => panic!("chunk index {} out of range (len {})", index, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_block_size() {
        assert!(Chunk::<u8>::new(0).is_err());
    }

    #[test]
    fn test_alloc_is_default() {
        let mut chunk: Chunk<(u32, f64)> = Chunk::new(4).unwrap();
        let i = chunk.alloc_item().unwrap();
        assert_eq!(*chunk.get_item(i).unwrap(), (0, 0.0));
    }

    #[test]
    fn test_growth_keeps_records() {
        let mut chunk: Chunk<usize> = Chunk::new(3).unwrap();
        for v in 0..10 {
            assert_eq!(chunk.push(v * 2).unwrap(), v);
        }
        assert_eq!(chunk.block_count(), 4);
        assert_eq!(chunk.capacity(), 12);
        for v in 0..10 {
            assert_eq!(*chunk.get_item(v).unwrap(), v * 2);
        }
    }

    #[test]
    fn test_get_out_of_range() {
        let mut chunk: Chunk<u8> = Chunk::new(8).unwrap();
        chunk.push(1).unwrap();
        assert!(matches!(
            chunk.get_item(1),
            Err(Error::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(chunk.get(5).is_none());
        assert!(!chunk.contains(1));
    }

    #[test]
    fn test_index_operator() {
        let mut chunk: Chunk<i32> = Chunk::new(2).unwrap();
        let i = chunk.push(5).unwrap();
        chunk[i] += 1;
        assert_eq!(chunk[i], 6);
    }

    #[test]
    #[should_panic]
    fn test_index_unallocated_panics() {
        let chunk: Chunk<i32> = Chunk::new(2).unwrap();
        let _ = chunk[1];
    }

    #[test]
    fn test_clear_keeps_memory() {
        let mut chunk: Chunk<u16> = Chunk::new(2).unwrap();
        for v in 1..=5 {
            chunk.push(v).unwrap();
        }
        let blocks = chunk.block_count();
        chunk.clear();
        assert!(chunk.is_empty());
        assert_eq!(chunk.block_count(), blocks);
        // re-allocated records come back zeroed
        let i = chunk.alloc_item().unwrap();
        assert_eq!(*chunk.get_item(i).unwrap(), 0);
    }
}
