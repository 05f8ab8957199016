/// Rounds `value` up to the next multiple of the machine word.
///
/// The caller must make sure the addition cannot overflow; use
/// [`align_up`] for untrusted sizes.
///
/// # Examples
///
/// ```rust
/// use rpool::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

/// Overflow-checked version of [`align!`].
pub fn align_up(value: usize) -> Option<usize> {
  value.checked_add(crate::block::WORD_SIZE - 1)?;
  Some(align!(value))
}

/// Rounds `value` down to a multiple of the machine word.
pub fn align_down(value: usize) -> usize {
  value & !(crate::block::WORD_SIZE - 1)
}

#[cfg(test)]
mod tests {
  use std::mem;

  use super::*;

  #[test]
  fn test_align() {
    let ptr_size = mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ptr_size * i + 1)..=(ptr_size * (i + 1));

      let expected_alignment = ptr_size * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), align_up(size));
      }
    }
  }

  #[test]
  fn test_align_up_overflow() {
    assert_eq!(align_up(usize::MAX), None);
    assert_eq!(align_up(usize::MAX - mem::size_of::<usize>() + 2), None);
    assert_eq!(align_up(0), Some(0));
  }

  #[test]
  fn test_align_down() {
    let word = mem::size_of::<usize>();

    assert_eq!(align_down(0), 0);
    assert_eq!(align_down(word - 1), 0);
    assert_eq!(align_down(word), word);
    assert_eq!(align_down(3 * word + 1), 3 * word);
  }
}
