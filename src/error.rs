use thiserror::Error;

/// Failures reported by the pool. Misuse of handles is not one of them.
#[derive(Debug, Error)]
pub enum PoolError {
  /// Null base or a region too small for one free block.
  #[error("invalid arena: {0}")]
  InvalidArena(&'static str),

  /// Zero-byte request, or one that overflows when rounded to a word.
  #[error("invalid allocation size {requested}")]
  InvalidSize { requested: usize },

  /// No single free block is large enough, whatever the total free space.
  #[error("out of memory: requested {requested} bytes, {free} bytes free")]
  OutOfMemory { requested: usize, free: usize },

  /// An invariant check failed.
  #[error("pool corrupted: {0}")]
  Corrupted(String),

  /// The operating system refused to map a region.
  #[error("failed to reserve region")]
  Reserve(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
