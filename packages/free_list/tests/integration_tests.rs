//! Integration tests for the `free_list` package.
//!
//! These tests exercise `FreeList` through its public API only, covering first-fit reuse,
//! coalescing, growth, index stability, copying and region iteration with both linkage
//! strategies.

use std::collections::BTreeMap;
use std::num::NonZero;

use free_list::{
    DoublyLinked, Error, FreeList, IntegrityChecks, Linkage, SinglyLinked, SinglyLinkedFreeList,
};
use static_assertions::assert_impl_all;

assert_impl_all!(FreeList<i128>: Send, Sync, Clone, Default);
assert_impl_all!(SinglyLinkedFreeList<i64>: Send, Sync, Clone, Default);

fn checked_list<T, L: Linkage>(increments: usize) -> FreeList<T, L> {
    FreeList::builder()
        .capacity_increments(NonZero::new(increments).unwrap())
        .integrity_checks(IntegrityChecks::Always)
        .build()
}

fn five_values<T: From<i8>, L: Linkage>() -> FreeList<T, L> {
    let mut list = checked_list::<T, L>(5);

    for value in 1..=5 {
        list.push(T::from(value));
    }

    list
}

#[test]
fn five_pushes_fill_one_increment() {
    let list = five_values::<i128, DoublyLinked>();

    assert_eq!(list.capacity(), 5);
    assert_eq!(list.len(), 5);
    assert_eq!(list.first_free_slot(), None);

    let list = five_values::<i64, SinglyLinked>();

    assert_eq!(list.capacity(), 5);
    assert_eq!(list.len(), 5);
    assert_eq!(list.first_free_slot(), None);
}

fn erase_leaves_separate_free_slots<L: Linkage>() {
    let mut list = five_values::<i128, L>();

    list.erase(1, 1);
    list.erase(3, 1);

    assert_eq!(list.len(), 3);
    assert_eq!(list.free_regions().collect::<Vec<_>>(), vec![(1, 1), (3, 1)]);
}

#[test]
fn erase_leaves_separate_free_slots_doubly() {
    erase_leaves_separate_free_slots::<DoublyLinked>();
}

#[test]
fn erase_leaves_separate_free_slots_singly() {
    erase_leaves_separate_free_slots::<SinglyLinked>();
}

fn push_reuses_lowest_free_slot<L: Linkage>() {
    let mut list = five_values::<i128, L>();

    list.erase(1, 1);
    list.erase(3, 1);

    let index = list.push(99);

    assert_eq!(index, 1);
    assert_eq!(list[1], 99);
    assert_eq!(list.len(), 4);
    assert_eq!(list.capacity(), 5);
}

#[test]
fn push_reuses_lowest_free_slot_doubly() {
    push_reuses_lowest_free_slot::<DoublyLinked>();
}

#[test]
fn push_reuses_lowest_free_slot_singly() {
    push_reuses_lowest_free_slot::<SinglyLinked>();
}

#[test]
fn emplace_into_empty_grows_by_one_increment() {
    let mut list = checked_list::<i128, DoublyLinked>(7);
    assert_eq!(list.capacity(), 0);

    let index = list.emplace(|| 5);

    assert_eq!(index, 0);
    assert_eq!(list.capacity(), 7);

    let mut list = checked_list::<i64, SinglyLinked>(3);

    list.emplace_default();

    assert_eq!(list.capacity(), 3);
    assert_eq!(list[0], 0);
}

fn erased_pair_is_reused_without_growth<L: Linkage>() {
    let mut list = five_values::<i128, L>();

    list.erase(2, 2);

    assert_eq!(list.free_regions().collect::<Vec<_>>(), vec![(2, 2)]);

    let start = list.push_slice(&[20, 30]);

    assert_eq!(start, 2);
    assert_eq!(list.capacity(), 5);
    assert_eq!(list.first_free_slot(), None);
    assert_eq!(
        list.iter().map(|(_, value)| *value).collect::<Vec<_>>(),
        vec![1, 2, 20, 30, 5]
    );
}

#[test]
fn erased_pair_is_reused_without_growth_doubly() {
    erased_pair_is_reused_without_growth::<DoublyLinked>();
}

#[test]
fn erased_pair_is_reused_without_growth_singly() {
    erased_pair_is_reused_without_growth::<SinglyLinked>();
}

fn indices_survive_growth<L: Linkage>() {
    let mut list = checked_list::<String, L>(2);
    let mut expected = BTreeMap::new();

    for round in 0..50 {
        let value = format!("value {round}");
        let index = list.push(value.clone());
        expected.insert(index, value);
    }

    assert!(list.capacity() >= 50);

    for (index, value) in &expected {
        assert_eq!(&list[*index], value);
    }
}

#[test]
fn indices_survive_growth_doubly() {
    indices_survive_growth::<DoublyLinked>();
}

#[test]
fn indices_survive_growth_singly() {
    indices_survive_growth::<SinglyLinked>();
}

fn pushed_run_is_one_region<L: Linkage>() {
    let mut list = checked_list::<i128, L>(4);

    list.push_slice(&[1, 2, 3]);
    list.erase(1, 1);
    let start = list.push_slice(&[10, 11, 12, 13, 14]);

    let region = list
        .regions()
        .find(|(region_start, values)| {
            *region_start <= start && region_start + values.len() >= start + 5
        })
        .map(|(region_start, values)| values[start - region_start..][..5].to_vec());

    assert_eq!(region, Some(vec![10, 11, 12, 13, 14]));
}

#[test]
fn pushed_run_is_one_region_doubly() {
    pushed_run_is_one_region::<DoublyLinked>();
}

#[test]
fn pushed_run_is_one_region_singly() {
    pushed_run_is_one_region::<SinglyLinked>();
}

fn copy_is_independent<L: Linkage>() {
    let mut original = checked_list::<String, L>(4);

    for value in ["a", "b", "c", "d", "e", "f"] {
        original.push(value.to_string());
    }

    original.erase(1, 2);
    original.erase(4, 1);

    let mut copy = original.clone();

    assert_eq!(
        original.iter().collect::<Vec<_>>(),
        copy.iter().collect::<Vec<_>>()
    );
    assert_eq!(
        original.free_regions().collect::<Vec<_>>(),
        copy.free_regions().collect::<Vec<_>>()
    );
    assert_eq!(original.capacity(), copy.capacity());

    drop(original);

    copy.integrity_check();
    assert_eq!(copy[0], "a");
    assert_eq!(copy[5], "f");

    // The copied free list is fully functional.
    assert_eq!(copy.push("x".to_string()), 1);
}

#[test]
fn copy_is_independent_doubly() {
    copy_is_independent::<DoublyLinked>();
}

#[test]
fn copy_is_independent_singly() {
    copy_is_independent::<SinglyLinked>();
}

/// Small deterministic pseudo-random sequence, so the mixed workload is reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self, bound: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;

        usize::try_from(self.0 % bound as u64).unwrap()
    }
}

fn mixed_workload_keeps_invariants<L: Linkage>() {
    let mut list = checked_list::<i128, L>(8);
    let mut live: BTreeMap<usize, i128> = BTreeMap::new();
    let mut random = XorShift(0x2545_F491_4F6C_DD1D);

    for step in 0..2_000_i128 {
        match random.next(4) {
            0 | 1 => {
                let index = list.push(step);
                assert!(live.insert(index, step).is_none());
            }
            2 => {
                let run = random.next(4) + 1;
                let values: Vec<i128> = (0..run).map(|offset| step * 10 + offset as i128).collect();
                let start = list.push_slice(&values);

                for (offset, value) in values.into_iter().enumerate() {
                    assert!(live.insert(start + offset, value).is_none());
                }
            }
            _ => {
                if live.is_empty() {
                    continue;
                }

                let nth = random.next(live.len());
                let index = *live.keys().nth(nth).unwrap();

                // Erase the longest live run starting here, up to 3 slots.
                let mut count = 1;
                while count < 3 && live.contains_key(&(index + count)) {
                    count += 1;
                }

                list.erase(index, count);

                for offset in 0..count {
                    live.remove(&(index + offset));
                }
            }
        }

        assert_eq!(list.len(), live.len());
    }

    let free: Vec<_> = list.free_regions().collect();
    for pair in free.windows(2) {
        let (start, size) = pair[0];
        assert!(start + size < pair[1].0, "free slots {pair:?} are adjacent");
    }

    let actual: BTreeMap<usize, i128> = list.iter().map(|(index, value)| (index, *value)).collect();
    assert_eq!(actual, live);
}

#[test]
fn mixed_workload_keeps_invariants_doubly() {
    mixed_workload_keeps_invariants::<DoublyLinked>();
}

#[test]
fn mixed_workload_keeps_invariants_singly() {
    mixed_workload_keeps_invariants::<SinglyLinked>();
}

#[test]
fn errors_describe_the_problem() {
    let mut list = five_values::<i128, DoublyLinked>();
    list.erase(4, 1);

    let error = list.try_erase(3, 2).unwrap_err();
    assert_eq!(error, Error::Vacant { index: 4 });
    assert_eq!(error.to_string(), "slot 4 is vacant");

    let error = list.try_erase(4, 2).unwrap_err();
    assert!(matches!(error, Error::OutOfBounds { capacity: 5, .. }));
}

#[test]
fn clear_keeps_capacity_for_reuse() {
    let mut list = five_values::<i64, SinglyLinked>();

    list.clear();

    assert!(list.is_empty());
    assert_eq!(list.capacity(), 5);
    assert_eq!(list.push_slice(&[7, 8, 9, 10, 11]), 0);
    assert_eq!(list.capacity(), 5);
}

#[test]
fn shrink_after_erasing_tail() {
    let mut list = five_values::<i128, DoublyLinked>();

    list.erase(2, 3);
    list.shrink_to_fit();

    assert_eq!(list.capacity(), 2);
    assert_eq!(list.first_free_slot(), None);
    assert_eq!(list.allocated_bytes(), 2 * size_of::<i128>());
}
