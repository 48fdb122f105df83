use log::debug;
use thiserror::Error;

use crate::alloc::{Bitmap, State};

#[derive(Error, Debug, PartialEq)]
pub enum BlockError {
    /// Every slot in the pool is reserved. Nothing is rolled back on the
    /// caller's side; whatever was appended before exhaustion stays owned.
    #[error("no free blocks available")]
    OutOfSpace,
    /// Double-free, out-of-range slot, or an oversized buffer. This is a
    /// contract violation inside the engine, not a user-input error.
    #[error("invalid block slot {0}")]
    InvalidSlot(usize),
}

/// A fixed pool of `nblocks` storage blocks of `block_size` bytes each,
/// addressed by slot index. The store hands out and reclaims slots and moves
/// raw bytes in and out of them; it knows nothing about files or paths.
pub struct BlockStore {
    blocks: Vec<Vec<u8>>,
    map: Bitmap,
    block_size: usize,
}

impl BlockStore {
    /// Pool geometry is always supplied by the caller; blocks start zeroed.
    pub fn new(nblocks: usize, block_size: usize) -> Self {
        debug_assert!(nblocks > 0);
        debug_assert!(block_size > 0);
        Self {
            blocks: vec![vec![0; block_size]; nblocks],
            map: Bitmap::new(nblocks),
            block_size,
        }
    }

    pub fn nblocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Reserves the first free slot and returns its index.
    pub fn allocate(&mut self) -> Result<usize, BlockError> {
        let slot = self.map.first_free().ok_or(BlockError::OutOfSpace)?;
        self.map.set_reserved(slot);
        debug!("allocated block slot {}", slot);
        Ok(slot)
    }

    /// Zeroes the block and returns its slot to the pool. Freeing a slot that
    /// is not reserved is rejected; ignoring it would corrupt the free list.
    pub fn free(&mut self, slot: usize) -> Result<(), BlockError> {
        if slot >= self.blocks.len() || self.map.get(slot) == State::Free {
            return Err(BlockError::InvalidSlot(slot));
        }
        for byte in self.blocks[slot].iter_mut() {
            *byte = 0;
        }
        self.map.set_free(slot);
        debug!("freed block slot {}", slot);
        Ok(())
    }

    /// Raw block write. The buffer may be shorter than a block; the tail
    /// keeps its current contents (zeroes for freshly allocated slots).
    pub fn write(&mut self, slot: usize, buf: &[u8]) -> Result<(), BlockError> {
        if slot >= self.blocks.len() || buf.len() > self.block_size {
            return Err(BlockError::InvalidSlot(slot));
        }
        self.blocks[slot][..buf.len()].copy_from_slice(buf);
        Ok(())
    }

    /// Raw block read; always a full `block_size` bytes.
    pub fn read(&self, slot: usize) -> Result<&[u8], BlockError> {
        self.blocks
            .get(slot)
            .map(|block| block.as_slice())
            .ok_or(BlockError::InvalidSlot(slot))
    }

    /// One in-use marker per slot, in slot order.
    pub fn usage(&self) -> Vec<bool> {
        (0..self.blocks.len())
            .map(|slot| self.map.get(slot) == State::Used)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        (0..self.blocks.len())
            .filter(|&slot| self.map.get(slot) == State::Free)
            .count()
    }

    pub(crate) fn is_used(&self, slot: usize) -> bool {
        slot < self.map.len() && self.map.get(slot) == State::Used
    }

    /// Reserves a specific slot while rebuilding a pool from recorded state.
    /// The slot must be in range and not already reserved.
    pub(crate) fn mark_used(&mut self, slot: usize) -> Result<(), BlockError> {
        if slot >= self.blocks.len() || self.map.get(slot) == State::Used {
            return Err(BlockError::InvalidSlot(slot));
        }
        self.map.set_reserved(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_first_free_slots_in_order() {
        let mut store = BlockStore::new(4, 16);

        assert_eq!(store.allocate().unwrap(), 0);
        assert_eq!(store.allocate().unwrap(), 1);
        assert_eq!(store.allocate().unwrap(), 2);
    }

    #[test]
    fn exhausted_pool_returns_out_of_space() {
        let mut store = BlockStore::new(2, 16);

        store.allocate().unwrap();
        store.allocate().unwrap();
        assert_eq!(store.allocate().unwrap_err(), BlockError::OutOfSpace);
    }

    #[test]
    fn freed_slot_is_reused_by_next_allocation() {
        let mut store = BlockStore::new(2, 16);

        store.allocate().unwrap();
        store.allocate().unwrap();
        store.free(0).unwrap();

        assert_eq!(store.allocate().unwrap(), 0);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut store = BlockStore::new(2, 16);

        let slot = store.allocate().unwrap();
        store.free(slot).unwrap();
        assert_eq!(store.free(slot).unwrap_err(), BlockError::InvalidSlot(slot));
    }

    #[test]
    fn freeing_out_of_range_slot_is_rejected() {
        let mut store = BlockStore::new(2, 16);

        assert_eq!(store.free(7).unwrap_err(), BlockError::InvalidSlot(7));
    }

    #[test]
    fn free_zeroes_block_contents() {
        let mut store = BlockStore::new(2, 4);

        let slot = store.allocate().unwrap();
        store.write(slot, b"ABCD").unwrap();
        store.free(slot).unwrap();

        assert_eq!(store.read(slot).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn short_write_leaves_zero_tail() {
        let mut store = BlockStore::new(1, 8);

        let slot = store.allocate().unwrap();
        store.write(slot, b"hi").unwrap();

        assert_eq!(store.read(slot).unwrap(), b"hi\0\0\0\0\0\0");
    }

    #[test]
    fn oversized_write_is_rejected() {
        let mut store = BlockStore::new(1, 4);

        let slot = store.allocate().unwrap();
        assert_eq!(
            store.write(slot, b"too big").unwrap_err(),
            BlockError::InvalidSlot(slot)
        );
    }

    #[test]
    fn usage_tracks_allocations_and_frees() {
        let mut store = BlockStore::new(3, 4);

        store.allocate().unwrap();
        let slot = store.allocate().unwrap();
        store.free(slot).unwrap();

        assert_eq!(store.usage(), vec![true, false, false]);
        assert_eq!(store.free_count(), 2);
    }
}
