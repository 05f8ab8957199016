//! In-arena block layout.
//!
//! ```text
//!   allocated:  ┌──────┬──────────────────────────────┐
//!               │ size │ payload (size bytes)         │
//!               └──────┴──────────────────────────────┘
//!   free:       ┌──────┬──────┬──────┬────────────────┐
//!               │ size │ next │ prev │ unused         │
//!               └──────┴──────┴──────┴────────────────┘
//! ```
//!
//! Every field is one native-endian machine word. `next`/`prev` hold the
//! arena offset of the neighbouring free block's size word, or [`NIL`] for
//! the list sentinel.

use std::mem;

/// Size of a machine word, the allocation granule.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// Bookkeeping in front of every block's payload: the size word.
pub const HEADER_SIZE: usize = WORD_SIZE;

/// Smallest payload a block may have. A released block must fit its links.
pub const MIN_PAYLOAD: usize = 2 * WORD_SIZE;

/// Size word plus both links.
pub const FREE_NODE_SIZE: usize = HEADER_SIZE + MIN_PAYLOAD;

/// Link value standing for the free-list sentinel.
pub const NIL: usize = usize::MAX;

const NEXT_OFFSET: usize = HEADER_SIZE;
const PREV_OFFSET: usize = HEADER_SIZE + WORD_SIZE;

/// Decoded state of a block as reported by [`crate::Pool::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
  /// Linked into the free list. `None` means the neighbour is the sentinel.
  Free {
    prev: Option<usize>,
    next: Option<usize>,
  },
  /// Handed out to a caller.
  Allocated { payload_len: usize },
}

/// One block found by a physical walk of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Arena offset of the size word.
  pub offset: usize,
  /// Payload capacity in bytes.
  pub size: usize,
  pub state: BlockState,
}

impl BlockInfo {
  pub fn is_free(&self) -> bool {
    matches!(self.state, BlockState::Free { .. })
  }

  /// Offset one past the block's last payload byte.
  pub fn end(&self) -> usize {
    self.offset + HEADER_SIZE + self.size
  }
}

/// Offset of a block's size word inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Block(pub(crate) usize);

impl Block {
  pub(crate) fn from_payload(payload: usize) -> Self {
    Self(payload - HEADER_SIZE)
  }

  pub(crate) fn offset(self) -> usize {
    self.0
  }

  pub(crate) fn payload(self) -> usize {
    self.0 + HEADER_SIZE
  }

  pub(crate) fn size(
    self,
    mem: &[u8],
  ) -> usize {
    read_word(mem, self.0)
  }

  pub(crate) fn set_size(
    self,
    mem: &mut [u8],
    size: usize,
  ) {
    write_word(mem, self.0, size);
  }

  /// Offset of the block physically following this one.
  pub(crate) fn end(
    self,
    mem: &[u8],
  ) -> usize {
    self.payload() + self.size(mem)
  }

  pub(crate) fn next(
    self,
    mem: &[u8],
  ) -> usize {
    read_word(mem, self.0 + NEXT_OFFSET)
  }

  pub(crate) fn set_next(
    self,
    mem: &mut [u8],
    next: usize,
  ) {
    write_word(mem, self.0 + NEXT_OFFSET, next);
  }

  pub(crate) fn prev(
    self,
    mem: &[u8],
  ) -> usize {
    read_word(mem, self.0 + PREV_OFFSET)
  }

  pub(crate) fn set_prev(
    self,
    mem: &mut [u8],
    prev: usize,
  ) {
    write_word(mem, self.0 + PREV_OFFSET, prev);
  }

  pub(crate) fn payload_bytes(
    self,
    mem: &[u8],
  ) -> &[u8] {
    let start = self.payload();
    &mem[start..start + self.size(mem)]
  }

  pub(crate) fn payload_bytes_mut(
    self,
    mem: &mut [u8],
  ) -> &mut [u8] {
    let start = self.payload();
    let size = self.size(mem);
    &mut mem[start..start + size]
  }
}

fn read_word(
  mem: &[u8],
  offset: usize,
) -> usize {
  let mut word = [0u8; WORD_SIZE];
  word.copy_from_slice(&mem[offset..offset + WORD_SIZE]);
  usize::from_ne_bytes(word)
}

fn write_word(
  mem: &mut [u8],
  offset: usize,
  value: usize,
) {
  mem[offset..offset + WORD_SIZE].copy_from_slice(&value.to_ne_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout_constants() {
    assert_eq!(HEADER_SIZE, WORD_SIZE);
    assert_eq!(FREE_NODE_SIZE, 3 * WORD_SIZE);
    assert_eq!(MIN_PAYLOAD % WORD_SIZE, 0);
  }

  #[test]
  fn test_fields_share_trailing_storage() {
    let mut mem = [0u8; 8 * WORD_SIZE];
    let block = Block(2 * WORD_SIZE);

    block.set_size(&mut mem, 4 * WORD_SIZE);
    block.set_next(&mut mem, NIL);
    block.set_prev(&mut mem, 0);

    assert_eq!(block.size(&mem), 4 * WORD_SIZE);
    assert_eq!(block.next(&mem), NIL);
    assert_eq!(block.prev(&mem), 0);
    assert_eq!(block.payload(), 3 * WORD_SIZE);
    assert_eq!(block.end(&mem), 7 * WORD_SIZE);

    // The links live in the first two payload words.
    let payload = block.payload_bytes(&mem);
    assert_eq!(payload.len(), 4 * WORD_SIZE);
    assert_eq!(&payload[..WORD_SIZE], &NIL.to_ne_bytes());
    assert_eq!(&payload[WORD_SIZE..2 * WORD_SIZE], &0usize.to_ne_bytes());
  }

  #[test]
  fn test_from_payload() {
    let block = Block::from_payload(5 * WORD_SIZE);
    assert_eq!(block.offset(), 4 * WORD_SIZE);
    assert_eq!(block.payload(), 5 * WORD_SIZE);
  }

  #[test]
  fn test_block_info_end() {
    let info = BlockInfo {
      offset: WORD_SIZE,
      size: 2 * WORD_SIZE,
      state: BlockState::Allocated {
        payload_len: 2 * WORD_SIZE,
      },
    };

    assert!(!info.is_free());
    assert_eq!(info.end(), 4 * WORD_SIZE);
  }
}
