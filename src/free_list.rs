use log::trace;

use crate::block::{Block, NIL};

/// Sentinel-anchored circular list of free blocks, sorted by offset.
///
/// The sentinel is not stored in the arena: `head` and `tail` are its
/// `next` and `prev` links, and [`NIL`] stands for it inside the blocks.
#[derive(Debug)]
pub(crate) struct FreeList {
  head: usize,
  tail: usize,
  len: usize,
}

impl FreeList {
  pub(crate) fn new() -> Self {
    Self {
      head: NIL,
      tail: NIL,
      len: 0,
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.len
  }

  pub(crate) fn is_singular(&self) -> bool {
    self.len == 1
  }

  pub(crate) fn first(&self) -> usize {
    self.head
  }

  /// Successor of `node`; the sentinel's successor is the head.
  pub(crate) fn next_of(
    &self,
    mem: &[u8],
    node: usize,
  ) -> usize {
    if node == NIL { self.head } else { Block(node).next(mem) }
  }

  pub(crate) fn prev_of(
    &self,
    mem: &[u8],
    node: usize,
  ) -> usize {
    if node == NIL { self.tail } else { Block(node).prev(mem) }
  }

  fn set_next(
    &mut self,
    mem: &mut [u8],
    node: usize,
    next: usize,
  ) {
    if node == NIL {
      self.head = next;
    } else {
      Block(node).set_next(mem, next);
    }
  }

  fn set_prev(
    &mut self,
    mem: &mut [u8],
    node: usize,
    prev: usize,
  ) {
    if node == NIL {
      self.tail = prev;
    } else {
      Block(node).set_prev(mem, prev);
    }
  }

  /// Links `node` in front of `after`, which may be the sentinel.
  pub(crate) fn insert_before(
    &mut self,
    mem: &mut [u8],
    node: usize,
    after: usize,
  ) {
    let prev = self.prev_of(mem, after);
    Block(node).set_prev(mem, prev);
    Block(node).set_next(mem, after);
    self.set_prev(mem, after, node);
    self.set_next(mem, prev, node);
    self.len += 1;
    trace!("free list: linked {node:#x} before {after:#x}");
  }

  /// Puts `to` in the list position held by `from`.
  pub(crate) fn replace(
    &mut self,
    mem: &mut [u8],
    from: usize,
    to: usize,
  ) {
    let next = self.next_of(mem, from);
    let prev = self.prev_of(mem, from);
    Block(to).set_next(mem, next);
    Block(to).set_prev(mem, prev);
    self.set_prev(mem, next, to);
    self.set_next(mem, prev, to);
  }

  pub(crate) fn remove(
    &mut self,
    mem: &mut [u8],
    node: usize,
  ) {
    let next = self.next_of(mem, node);
    let prev = self.prev_of(mem, node);
    self.set_next(mem, prev, next);
    self.set_prev(mem, next, prev);
    self.len -= 1;
  }

  /// First node, in address order, whose payload can hold `needed` bytes.
  pub(crate) fn find_first_fit(
    &self,
    mem: &[u8],
    needed: usize,
  ) -> Option<usize> {
    self.iter(mem).find(|&node| Block(node).size(mem) >= needed)
  }

  /// Node in front of which a block at `offset` keeps the list sorted.
  pub(crate) fn find_insert_point(
    &self,
    mem: &[u8],
    offset: usize,
  ) -> usize {
    // The last physical block is always free, so a single node must lie
    // above any released block.
    if self.is_singular() {
      return self.first();
    }

    self.iter(mem).find(|&node| node > offset).unwrap_or(NIL)
  }

  pub(crate) fn iter<'m>(
    &self,
    mem: &'m [u8],
  ) -> Iter<'m> {
    Iter {
      mem,
      node: self.head,
      remaining: self.len,
    }
  }
}

/// Walks the list from head to tail.
pub(crate) struct Iter<'m> {
  mem: &'m [u8],
  node: usize,
  remaining: usize,
}

impl Iterator for Iter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    // `remaining` bounds the walk even if a stale handle corrupted a link.
    if self.node == NIL || self.remaining == 0 {
      return None;
    }

    let node = self.node;
    self.node = Block(node).next(self.mem);
    self.remaining -= 1;
    Some(node)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::WORD_SIZE;

  const NODE: usize = 4 * WORD_SIZE;

  fn node(i: usize) -> usize {
    i * NODE
  }

  fn sized(
    mem: &mut [u8],
    sizes: &[usize],
  ) {
    for (i, &size) in sizes.iter().enumerate() {
      Block(node(i)).set_size(mem, size);
    }
  }

  fn collect(
    list: &FreeList,
    mem: &[u8],
  ) -> Vec<usize> {
    list.iter(mem).collect()
  }

  #[test]
  fn test_insert_keeps_links_circular() {
    let mut mem = vec![0u8; 4 * NODE];
    let mut list = FreeList::new();

    list.insert_before(&mut mem, node(2), NIL);
    list.insert_before(&mut mem, node(0), node(2));
    list.insert_before(&mut mem, node(1), node(2));

    assert_eq!(collect(&list, &mem), vec![node(0), node(1), node(2)]);
    assert_eq!(list.len(), 3);
    assert_eq!(list.prev_of(&mem, NIL), node(2));
    assert_eq!(list.next_of(&mem, node(2)), NIL);
    assert_eq!(list.prev_of(&mem, node(0)), NIL);
    assert_eq!(list.prev_of(&mem, node(2)), node(1));
  }

  #[test]
  fn test_replace_and_remove() {
    let mut mem = vec![0u8; 4 * NODE];
    let mut list = FreeList::new();

    list.insert_before(&mut mem, node(0), NIL);
    list.insert_before(&mut mem, node(2), NIL);

    list.replace(&mut mem, node(0), node(1));
    assert_eq!(collect(&list, &mem), vec![node(1), node(2)]);
    assert_eq!(list.first(), node(1));

    list.remove(&mut mem, node(2));
    assert_eq!(collect(&list, &mem), vec![node(1)]);
    assert!(list.is_singular());
    assert_eq!(list.prev_of(&mem, NIL), node(1));

    list.remove(&mut mem, node(1));
    assert_eq!(list.len(), 0);
    assert_eq!(list.first(), NIL);
  }

  #[test]
  fn test_find_first_fit_takes_lowest_address() {
    let mut mem = vec![0u8; 4 * NODE];
    let mut list = FreeList::new();
    sized(&mut mem, &[WORD_SIZE, 3 * WORD_SIZE, 3 * WORD_SIZE, 2 * WORD_SIZE]);

    for i in 0..4 {
      list.insert_before(&mut mem, node(i), NIL);
    }

    assert_eq!(list.find_first_fit(&mem, 2 * WORD_SIZE), Some(node(1)));
    assert_eq!(list.find_first_fit(&mem, WORD_SIZE), Some(node(0)));
    assert_eq!(list.find_first_fit(&mem, 4 * WORD_SIZE), None);
  }

  #[test]
  fn test_find_insert_point() {
    let mut mem = vec![0u8; 5 * NODE];
    let mut list = FreeList::new();

    list.insert_before(&mut mem, node(4), NIL);
    assert_eq!(list.find_insert_point(&mem, node(1)), node(4));

    list.insert_before(&mut mem, node(1), node(4));
    assert_eq!(list.find_insert_point(&mem, node(0)), node(1));
    assert_eq!(list.find_insert_point(&mem, node(2)), node(4));
    assert_eq!(list.find_insert_point(&mem, node(4) + NODE), NIL);
  }
}
