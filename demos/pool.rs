use rpool::{BlockInfo, BlockState, Pool, PoolConfig, PoolError, Region};

const ARENA_SIZE: usize = 512;

/// Prints every block of the arena in address order.
fn print_blocks(
  label: &str,
  pool: &Pool,
) {
  println!("[{}] free space = {} / {}", label, pool.free_space(), pool.total_size());

  for BlockInfo { offset, size, state } in pool.blocks() {
    match state {
      BlockState::Free { prev, next } => {
        println!("    {offset:#06x} free  {size:>4} bytes  prev = {prev:?}, next = {next:?}")
      },
      BlockState::Allocated { payload_len } => {
        println!("    {offset:#06x} used  {payload_len:>4} bytes")
      },
    }
  }
}

fn main() -> Result<(), PoolError> {
  env_logger::init();

  // The driver owns the memory; the pool only borrows it.
  let mut region = Region::reserve(ARENA_SIZE)?;
  let config = PoolConfig::new().with_scrub_on_release(true);
  let mut pool = Pool::with_config(region.as_mut_slice(), config)?;
  print_blocks("init", &pool);

  // --------------------------------------------------------------------
  // 1) Two arrays of eight u32, carved from the front of the arena.
  // --------------------------------------------------------------------
  let first = pool.allocate(size_of::<u32>() * 8)?;
  let second = pool.allocate(size_of::<u32>() * 8)?;

  for (i, chunk) in pool.payload_mut(&first).chunks_exact_mut(4).enumerate() {
    chunk.copy_from_slice(&(i as u32).to_ne_bytes());
  }
  print_blocks("two allocations", &pool);

  // --------------------------------------------------------------------
  // 2) Release the first one. It becomes a hole in front of `second`.
  // --------------------------------------------------------------------
  pool.release(first);
  print_blocks("first released", &pool);

  // --------------------------------------------------------------------
  // 3) Grow `second`. It moves to the tail and the old block is merged
  //    with the hole left by `first`.
  // --------------------------------------------------------------------
  let mut second = second;
  pool.reallocate(&mut second, 128)?;
  print_blocks("second grown", &pool);

  // --------------------------------------------------------------------
  // 4) A request larger than any single free block fails even though the
  //    total free space would cover it.
  // --------------------------------------------------------------------
  let request = pool.stats().largest_free + 1;
  match pool.allocate(request) {
    Ok(_) => println!("\n[4] unexpectedly placed a large block"),
    Err(err) => println!("\n[4] {err}"),
  }

  // --------------------------------------------------------------------
  // 5) Release everything; the arena is back to one free block.
  // --------------------------------------------------------------------
  pool.release(second);
  print_blocks("all released", &pool);
  pool.check()?;

  println!("\n{:?}", pool.stats());
  Ok(())
}
