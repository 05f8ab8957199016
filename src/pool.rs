use std::{mem, ptr::NonNull, slice};

use log::{debug, trace};

use crate::{
  align::{align_down, align_up},
  block::{Block, BlockInfo, BlockState, FREE_NODE_SIZE, HEADER_SIZE, MIN_PAYLOAD, NIL, WORD_SIZE},
  config::PoolConfig,
  error::{PoolError, Result},
  free_list::{self, FreeList},
};

/// Handle to an allocated block: the arena offset of its payload.
///
/// Handles are neither `Copy` nor `Clone`. Releasing or reallocating one
/// consumes or replaces it, so a safe caller cannot release a block twice.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
  offset: usize,
}

impl Allocation {
  /// Payload offset from the start of the arena. Always word-aligned.
  pub fn offset(&self) -> usize {
    self.offset
  }
}

/// Snapshot of the pool's occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
  pub total_size: usize,
  pub free_space: usize,
  pub free_blocks: usize,
  pub used_blocks: usize,
  pub largest_free: usize,
}

/// First-fit allocator over one caller-supplied region.
///
/// The first word of the region is the header of the lowest block, so the
/// usable size is the region length minus one word. Each block carries a one
/// word header; free blocks additionally keep their list links in the first
/// two words of their payload.
#[derive(Debug)]
pub struct Pool<'a> {
  mem: &'a mut [u8],
  total: usize,
  free_space: usize,
  free: FreeList,
  config: PoolConfig,
}

impl<'a> Pool<'a> {
  pub fn init(region: &'a mut [u8]) -> Result<Self> {
    Self::with_config(region, PoolConfig::default())
  }

  /// Sets up a pool spanning `region`.
  ///
  /// Leading bytes up to the first word boundary and trailing bytes that do
  /// not fill a word are left unused. Nothing is written on failure.
  pub fn with_config(
    region: &'a mut [u8],
    config: PoolConfig,
  ) -> Result<Self> {
    let skip = region.as_ptr().align_offset(WORD_SIZE);
    if skip > region.len() {
      return Err(PoolError::InvalidArena("region smaller than one word"));
    }

    let len = align_down(region.len() - skip);
    if len <= FREE_NODE_SIZE {
      return Err(PoolError::InvalidArena("region cannot hold one free block"));
    }

    let mem: &'a mut [u8] = &mut region[skip..skip + len];
    let total = len - HEADER_SIZE;

    let mut free = FreeList::new();
    Block(0).set_size(mem, total);
    free.insert_before(mem, 0, NIL);

    debug!("pool initialized: {total} usable bytes at {:?}", mem.as_ptr());

    Ok(Self {
      mem,
      total,
      free_space: total,
      free,
      config,
    })
  }

  /// Sets up a pool over `size` bytes starting at `addr`.
  ///
  /// # Safety
  ///
  /// Unless `addr` is null, it must be valid for reads and writes of `size`
  /// bytes for `'a`, and nothing else may access that memory while the pool
  /// is alive.
  pub unsafe fn from_raw_parts(
    addr: *mut u8,
    size: usize,
  ) -> Result<Self> {
    if addr.is_null() {
      return Err(PoolError::InvalidArena("null address"));
    }

    let region = unsafe { slice::from_raw_parts_mut(addr, size) };
    Self::init(region)
  }

  /// Allocates at least `size` bytes with first-fit placement.
  ///
  /// The request is rounded up to a word multiple, and to no less than two
  /// words so the block can hold its links once released. Free space drops by
  /// that capacity plus `HEADER_SIZE`, so requests of one word or less cost
  /// `MIN_PAYLOAD + HEADER_SIZE`. The chosen free block is split: its head is
  /// returned and the tail stays in the free list in its place.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Allocation> {
    let rounded = round_request(size).ok_or(PoolError::InvalidSize { requested: size })?;

    // A candidate must leave room for a whole free node after the split.
    let needed = match rounded.checked_add(FREE_NODE_SIZE) {
      Some(needed) if needed <= self.free_space => needed,
      _ => return Err(self.out_of_memory(size)),
    };

    let Some(node) = self.free.find_first_fit(self.mem, needed) else {
      return Err(self.out_of_memory(size));
    };

    let block = Block(node);
    let remainder = Block(block.payload() + rounded);
    let left = block.size(self.mem) - rounded - HEADER_SIZE;

    remainder.set_size(self.mem, left);
    block.set_size(self.mem, rounded);
    self.free.replace(self.mem, node, remainder.offset());
    self.free_space -= rounded + HEADER_SIZE;

    trace!(
      "allocated {rounded} bytes at {:#x}, {left} bytes left at {:#x}",
      block.payload(),
      remainder.offset()
    );

    Ok(Allocation {
      offset: block.payload(),
    })
  }

  /// Same as [`Pool::allocate`], with the whole payload zeroed.
  pub fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> Result<Allocation> {
    let allocation = self.allocate(size)?;
    self.payload_mut(&allocation).fill(0);
    Ok(allocation)
  }

  /// Moves `allocation` into a fresh block of `new_size` bytes.
  ///
  /// Copies as many bytes as both blocks can hold, releases the old block and
  /// points `allocation` at the new one. On failure `allocation` and its
  /// contents are left as they were.
  pub fn reallocate(
    &mut self,
    allocation: &mut Allocation,
    new_size: usize,
  ) -> Result<()> {
    let fresh = self.allocate(new_size)?;

    let old = Block::from_payload(allocation.offset);
    let len = old.size(self.mem).min(self.capacity_of(&fresh));
    self.mem.copy_within(old.payload()..old.payload() + len, fresh.offset);

    let old = mem::replace(allocation, fresh);
    self.release(old);
    Ok(())
  }

  /// Returns a block to the free list, merging it with free neighbours.
  pub fn release(
    &mut self,
    allocation: Allocation,
  ) {
    let block = Block::from_payload(allocation.offset);
    self.free_space += block.size(self.mem);

    if self.config.scrub_on_release {
      block.payload_bytes_mut(self.mem).fill(0);
    }

    let after = self.free.find_insert_point(self.mem, block.offset());
    self.free.insert_before(self.mem, block.offset(), after);

    let next = self.free.next_of(self.mem, block.offset());
    self.try_merge(block.offset(), next);

    let prev = self.free.prev_of(self.mem, block.offset());
    self.try_merge(prev, block.offset());
  }

  fn try_merge(
    &mut self,
    first: usize,
    second: usize,
  ) {
    if first == NIL || second == NIL {
      return;
    }

    let block = Block(first);
    if block.end(self.mem) != second {
      return;
    }

    let merged = block.size(self.mem) + HEADER_SIZE + Block(second).size(self.mem);
    self.free.remove(self.mem, second);
    block.set_size(self.mem, merged);
    self.free_space += HEADER_SIZE;

    trace!("merged {second:#x} into {first:#x}: {merged} bytes");
  }

  fn out_of_memory(
    &self,
    requested: usize,
  ) -> PoolError {
    debug!(
      "cannot place {requested} bytes: {} free in {} blocks",
      self.free_space,
      self.free.len()
    );

    PoolError::OutOfMemory {
      requested,
      free: self.free_space,
    }
  }

  pub fn payload(
    &self,
    allocation: &Allocation,
  ) -> &[u8] {
    Block::from_payload(allocation.offset).payload_bytes(self.mem)
  }

  pub fn payload_mut(
    &mut self,
    allocation: &Allocation,
  ) -> &mut [u8] {
    Block::from_payload(allocation.offset).payload_bytes_mut(self.mem)
  }

  /// Address of the payload. Valid until the pool is next used.
  pub fn as_ptr(
    &mut self,
    allocation: &Allocation,
  ) -> NonNull<u8> {
    NonNull::from(self.payload_mut(allocation)).cast()
  }

  /// Payload capacity recorded in the block header.
  pub fn capacity_of(
    &self,
    allocation: &Allocation,
  ) -> usize {
    Block::from_payload(allocation.offset).size(self.mem)
  }

  pub fn total_size(&self) -> usize {
    self.total
  }

  pub fn free_space(&self) -> usize {
    self.free_space
  }

  pub fn config(&self) -> &PoolConfig {
    &self.config
  }

  /// Walks every block in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    let mut free = self.free.iter(self.mem);
    let next_free = free.next();

    Blocks {
      mem: self.mem,
      free,
      next_free,
      offset: 0,
    }
  }

  /// Walks the free list from head to tail.
  pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.free.iter(self.mem).map(|node| free_info(self.mem, node))
  }

  pub fn stats(&self) -> PoolStats {
    self.blocks().fold(
      PoolStats {
        total_size: self.total,
        free_space: self.free_space,
        ..PoolStats::default()
      },
      |mut stats, block| {
        if block.is_free() {
          stats.free_blocks += 1;
          stats.largest_free = stats.largest_free.max(block.size);
        } else {
          stats.used_blocks += 1;
        }
        stats
      },
    )
  }

  /// Audits the arena against every layout and accounting invariant.
  pub fn check(&self) -> Result<()> {
    let mut prev = NIL;
    let mut free_sum = 0;

    for node in self.free.iter(self.mem) {
      if node % WORD_SIZE != 0 || node > self.mem.len().saturating_sub(FREE_NODE_SIZE) {
        return corrupted(format!("free node {node:#x} outside the arena"));
      }
      if prev != NIL && node <= prev {
        return corrupted(format!("free list out of order at {node:#x}"));
      }
      if Block(node).prev(self.mem) != prev {
        return corrupted(format!("free node {node:#x} has a stale prev link"));
      }
      free_sum += Block(node).size(self.mem);
      prev = node;
    }

    if self.free.prev_of(self.mem, NIL) != prev {
      return corrupted("free list tail does not match its last node".to_string());
    }
    if free_sum != self.free_space {
      return corrupted(format!(
        "free space counter {} differs from free blocks total {free_sum}",
        self.free_space
      ));
    }

    let mut end = 0;
    let mut count = 0;
    let mut free_count = 0;
    let mut allocated = 0;
    let mut last_free = false;

    for block in self.blocks() {
      if block.offset != end {
        return corrupted(format!("block at {:#x} does not follow {end:#x}", block.offset));
      }
      if block.size % WORD_SIZE != 0 || block.size < MIN_PAYLOAD || block.size > self.mem.len() {
        return corrupted(format!("block at {:#x} has bad size {}", block.offset, block.size));
      }
      if block.is_free() {
        if last_free {
          return corrupted(format!("free block at {:#x} was not coalesced", block.offset));
        }
        free_count += 1;
      } else {
        allocated += block.size;
      }

      last_free = block.is_free();
      end = block.end();
      count += 1;
    }

    if end != self.mem.len() {
      return corrupted(format!("blocks end at {end:#x}, arena ends at {:#x}", self.mem.len()));
    }
    if free_count != self.free.len() {
      return corrupted(format!(
        "{} listed free blocks, {free_count} found in the arena",
        self.free.len()
      ));
    }
    if !last_free {
      return corrupted("last block is not free".to_string());
    }
    if allocated + HEADER_SIZE * (count - 1) + self.free_space != self.total {
      return corrupted("block sizes do not add up to the usable size".to_string());
    }

    Ok(())
  }
}

/// Physical walk over the arena; see [`Pool::blocks`].
pub struct Blocks<'p> {
  mem: &'p [u8],
  free: free_list::Iter<'p>,
  next_free: Option<usize>,
  offset: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.mem.len().saturating_sub(self.offset) < HEADER_SIZE {
      return None;
    }

    let offset = self.offset;
    let info = if self.next_free == Some(offset) {
      self.next_free = self.free.next();
      free_info(self.mem, offset)
    } else {
      let size = Block(offset).size(self.mem);
      BlockInfo {
        offset,
        size,
        state: BlockState::Allocated { payload_len: size },
      }
    };

    self.offset = info.offset.saturating_add(HEADER_SIZE).saturating_add(info.size);
    Some(info)
  }
}

fn free_info(
  mem: &[u8],
  node: usize,
) -> BlockInfo {
  let block = Block(node);
  let link = |offset: usize| (offset != NIL).then_some(offset);

  BlockInfo {
    offset: node,
    size: block.size(mem),
    state: BlockState::Free {
      prev: link(block.prev(mem)),
      next: link(block.next(mem)),
    },
  }
}

fn corrupted(message: String) -> Result<()> {
  Err(PoolError::Corrupted(message))
}

/// Word-rounded payload for a request; `None` for zero or overflowing sizes.
fn round_request(size: usize) -> Option<usize> {
  if size == 0 {
    return None;
  }

  align_up(size).map(|rounded| rounded.max(MIN_PAYLOAD))
}
