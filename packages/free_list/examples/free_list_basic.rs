//! Basic usage example for `FreeList`.
//!
//! This example demonstrates inserting and erasing values, first-fit reuse of vacated slots
//! and growth in steps of the configured capacity increments.

use std::num::NonZero;

use free_list::FreeList;

fn main() {
    let mut list = FreeList::<u128>::builder()
        .capacity_increments(NonZero::new(4).unwrap())
        .build();

    println!("Created FreeList with capacity: {}", list.capacity());

    let first = list.push(0xdead_beef);
    let second = list.push(0xcafe_babe);
    let third = list.push(0xfeed_face);

    println!("Inserted 3 values at indices {first}, {second} and {third}");
    println!("Capacity after first growth: {}", list.capacity());

    list.erase(second, 1);
    println!("Erased index {second}, {} values remain", list.len());

    // The vacated slot is the lowest-indexed free slot, so the next value lands there.
    let reused = list.push(0x0123_4567);
    println!("New value landed at index {reused}");

    // A run of three does not fit in the one remaining free slot, so the list grows.
    let run = list.push_slice(&[1, 2, 3]);
    println!(
        "Run of 3 values starts at index {run}, capacity is now {}",
        list.capacity()
    );

    for (index, value) in &list {
        println!("  [{index}] = {value:#x}");
    }

    for (start, size) in list.free_regions() {
        println!("Free slots {start}..{}", start + size);
    }

    println!(
        "{} bytes of values in a block of {} bytes",
        list.size_in_bytes(),
        list.allocated_bytes()
    );
}
