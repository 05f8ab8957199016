//! # rpool - A Fixed-Arena Memory Allocator
//!
//! This crate provides a **first-fit free-list allocator** that manages one
//! caller-supplied byte region. It never asks the operating system or a global
//! allocator for memory: every block, and every piece of bookkeeping, lives
//! inside the region it is given.
//!
//! ## Overview
//!
//! ```text
//!   Fixed Arena:
//!
//!   ┌────────┬─────────┬────────────┬────────┬──────┬─────────┬───────────┐
//!   │Block 0 │ Block 1 │ Free Space │ Block 3│ Free │ Block 4 │ Free Tail │
//!   └────────┴─────────┴────────────┴────────┴──────┴─────────┴───────────┘
//!                            ▲                  ▲                 ▲
//!                            └──── free list (address order) ─────┘
//!
//!   allocate(): first free block large enough, split at the front.
//!   release():  link back in address order, merge with free neighbours.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rpool
//!   ├── align      - Word rounding (align!, align_up, align_down)
//!   ├── block      - In-arena block layout
//!   ├── free_list  - Address-ordered doubly linked free list (internal)
//!   ├── pool       - Pool: allocate, allocate_zeroed, reallocate, release
//!   ├── config     - PoolConfig
//!   ├── error      - PoolError
//!   └── region     - mmap-backed regions for drivers (unix)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rpool::{Pool, PoolError};
//!
//! fn main() -> Result<(), PoolError> {
//!     let mut region = rpool::Region::reserve(4096)?;
//!     let mut pool = Pool::init(region.as_mut_slice())?;
//!
//!     let mut numbers = pool.allocate_zeroed(8 * 4)?;
//!     pool.payload_mut(&numbers)[0] = 42;
//!
//!     // Grow the block; the first 32 bytes come along.
//!     pool.reallocate(&mut numbers, 64)?;
//!     assert_eq!(pool.payload(&numbers)[0], 42);
//!
//!     pool.release(numbers);
//!     assert_eq!(pool.free_space(), pool.total_size());
//!     Ok(())
//! }
//! ```
//!
//! ## How It Works
//!
//! Every block starts with one machine word holding its payload size. A free
//! block reuses the first two payload words as links into the free list:
//!
//! ```text
//!              Free block                  In-use block
//!
//!          ┌────────────────┐           ┌────────────────┐
//!          │      Size      │           │      Size      │
//!          ├────────────────┤           ├────────────────┤
//!          │      Next      │           │                │
//!          ├────────────────┤           │                │
//!          │      Prev      │           │    Payload     │
//!          ├────────────────┤           │                │
//!          │    ........    │           │                │
//!          └────────────────┘           └────────────────┘
//! ```
//!
//! Allocating splits the first free block that can hold the request plus a
//! whole free node: the front becomes the allocation, the tail replaces the
//! block in the free list. Releasing inserts the block at its address-ordered
//! position and merges it with physically adjacent free neighbours.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: every operation takes `&mut self`
//! - **No compaction**: a request fails when no single free block fits it
//! - **Word alignment only**: payloads are aligned to `usize`, nothing more
//! - **No misuse detection**: a handle released into the wrong pool corrupts
//!   that pool's bookkeeping (bounds checks keep it memory-safe)

pub mod align;
mod block;
mod config;
mod error;
mod free_list;
mod pool;
#[cfg(unix)]
mod region;

pub use block::{BlockInfo, BlockState, FREE_NODE_SIZE, HEADER_SIZE, MIN_PAYLOAD, WORD_SIZE};
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use pool::{Allocation, Blocks, Pool, PoolStats};
#[cfg(unix)]
pub use region::Region;
