//! Fills keyed tables and lists with and without the block pool:
//!
//! * A `BTreeMap` of key to factorial, using the global allocator.
//! * The same entries kept as `(key, value)` pairs in a `BlockList` backed by a pool of 10
//!   blocks. The list is only a sequence, not a map.
//! * Two lists of 0..9, one on the system allocator and one on the pool.
//!
//! Run with `RUST_LOG=trace` to see the pool expand and the lists being torn down.

use std::collections::BTreeMap;

use block_pool::{BlockList, PoolAllocator};
use tracing_subscriber::EnvFilter;

fn factorial(n: u32) -> u64 {
    (1..=u64::from(n)).product()
}

fn main() -> Result<(), block_pool::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut map1 = BTreeMap::new();

    for key in 0..10 {
        map1.insert(key, factorial(key));
    }

    // Not a map: there is no lookup by key. Entries are pushed in ascending key order, so
    // iterating the list prints the same sorted table as map1.
    let mut map2 =
        BlockList::<(u32, u64), _>::with_allocator(PoolAllocator::<(u32, u64), 10>::new());

    for key in 0..10 {
        map2.push((key, factorial(key)))?;
    }

    println!("map1:");
    for (key, value) in &map1 {
        println!("Key: {key}, Value: {value}");
    }

    println!("map2:");
    for (key, value) in &map2 {
        println!("Key: {key}, Value: {value}");
    }

    let mut container1 = BlockList::<u32>::new();

    for value in 0..10 {
        container1.push(value)?;
    }

    let mut container2 = BlockList::<u32, _>::with_allocator(PoolAllocator::<u32, 10>::new());

    for value in 0..10 {
        container2.push(value)?;
    }

    println!("container1: {container1}");
    println!("container2: {container2}");

    Ok(())
}
