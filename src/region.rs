use std::{io, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use log::debug;

use crate::error::{PoolError, Result};

/// Page-aligned, zero-filled anonymous mapping to host a pool.
///
/// The pool never calls this; it is for drivers that do not already own a
/// region. The mapping is released when the `Region` is dropped.
pub struct Region {
  base: NonNull<u8>,
  len: usize,
}

impl Region {
  pub fn reserve(len: usize) -> Result<Self> {
    if len == 0 {
      return Err(PoolError::InvalidArena("empty region"));
    }

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(io::Error::last_os_error().into());
    }

    let base = NonNull::new(address as *mut u8).ok_or(PoolError::InvalidArena("null mapping"))?;
    debug!("reserved {len} bytes at {base:?}");

    Ok(Self { base, len })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn as_ptr(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    unsafe {
      munmap(self.base.as_ptr() as *mut c_void, self.len);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::WORD_SIZE;

  #[test]
  fn test_reserve_is_zeroed_and_aligned() {
    let mut region = Region::reserve(4096).unwrap();

    assert_eq!(region.len(), 4096);
    assert_eq!(region.as_ptr() as usize % WORD_SIZE, 0);
    assert!(region.as_mut_slice().iter().all(|&b| b == 0));

    region.as_mut_slice()[4095] = 0xAB;
    assert_eq!(region.as_mut_slice()[4095], 0xAB);
  }

  #[test]
  fn test_reserve_rejects_empty() {
    assert!(matches!(Region::reserve(0), Err(PoolError::InvalidArena(_))));
  }
}
