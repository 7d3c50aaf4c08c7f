use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

use crate::FreeLinks;

/// Position of a walk over the occupied slots of a block: the next slot to visit and the
/// first free slot at or after it. Free slots are skipped by jumping over their whole size.
#[derive(Clone, Copy, Debug)]
struct Cursor<'a> {
    links: FreeLinks<'a>,
    index: usize,
    next_free: Option<usize>,
    capacity: usize,
}

impl<'a> Cursor<'a> {
    fn new(links: FreeLinks<'a>, capacity: usize) -> Self {
        let mut cursor = Self {
            links,
            index: 0,
            next_free: links.first(),
            capacity,
        };

        cursor.skip_free();
        cursor
    }

    fn skip_free(&mut self) {
        while let Some(free) = self.next_free {
            if free != self.index {
                break;
            }

            let header = self.links.get(free);

            // Cannot overflow because free slots are within the block.
            self.index = free.wrapping_add(header.size);
            self.next_free = header.next;
        }
    }

    fn next_slot(&mut self) -> Option<usize> {
        if self.index >= self.capacity {
            return None;
        }

        let index = self.index;

        // Cannot overflow because index < capacity.
        self.index = index.wrapping_add(1);
        self.skip_free();

        Some(index)
    }

    /// Returns the next maximal run of occupied slots as `(start, length)`.
    fn next_run(&mut self) -> Option<(usize, usize)> {
        if self.index >= self.capacity {
            return None;
        }

        let start = self.index;
        let end = self.next_free.unwrap_or(self.capacity);

        self.index = end;
        self.skip_free();

        // Cannot underflow because the cursor never rests inside or after the next free slot.
        Some((start, end.wrapping_sub(start)))
    }
}

/// Iterator over `(index, &value)` pairs of a [`FreeList`][crate::FreeList], in index order.
///
/// Created by [`FreeList::iter()`][crate::FreeList::iter].
#[derive(Debug)]
pub struct Iter<'a, T> {
    base: NonNull<T>,
    cursor: Cursor<'a>,
    remaining: usize,

    _values: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(base: NonNull<T>, links: FreeLinks<'a>, capacity: usize, len: usize) -> Self {
        Self {
            base,
            cursor: Cursor::new(links, capacity),
            remaining: len,
            _values: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor.next_slot()?;
        self.remaining = self.remaining.wrapping_sub(1);

        // SAFETY: The cursor only stops on occupied slots within the block, and the free list
        // stays borrowed for 'a so nothing can erase or move the value meanwhile.
        Some((index, unsafe { self.base.add(index).as_ref() }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

// SAFETY: The iterator only hands out shared references, like slice::Iter.
unsafe impl<T: Sync> Send for Iter<'_, T> {}
// SAFETY: The iterator only hands out shared references, like slice::Iter.
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

/// Iterator over `(index, &mut value)` pairs of a [`FreeList`][crate::FreeList], in index
/// order.
///
/// Created by [`FreeList::iter_mut()`][crate::FreeList::iter_mut].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    base: NonNull<T>,
    cursor: Cursor<'a>,
    remaining: usize,

    _values: PhantomData<&'a mut T>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(base: NonNull<T>, links: FreeLinks<'a>, capacity: usize, len: usize) -> Self {
        Self {
            base,
            cursor: Cursor::new(links, capacity),
            remaining: len,
            _values: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (usize, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor.next_slot()?;
        self.remaining = self.remaining.wrapping_sub(1);

        // SAFETY: The cursor only stops on occupied slots within the block and visits each
        // slot once, so the exclusive references never alias. The free list is exclusively
        // borrowed for 'a. Free-slot headers are only read, and never inside occupied slots.
        Some((index, unsafe { self.base.add(index).as_mut() }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

// SAFETY: The iterator hands out exclusive references, like slice::IterMut.
unsafe impl<T: Send> Send for IterMut<'_, T> {}
// SAFETY: The iterator hands out exclusive references, like slice::IterMut.
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

/// Iterator over the maximal runs of occupied slots of a [`FreeList`][crate::FreeList], as
/// `(start_index, values)` pairs.
///
/// Created by [`FreeList::regions()`][crate::FreeList::regions].
#[derive(Debug)]
pub struct Regions<'a, T> {
    base: NonNull<T>,
    cursor: Cursor<'a>,

    _values: PhantomData<&'a T>,
}

impl<'a, T> Regions<'a, T> {
    pub(crate) fn new(base: NonNull<T>, links: FreeLinks<'a>, capacity: usize) -> Self {
        Self {
            base,
            cursor: Cursor::new(links, capacity),
            _values: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Regions<'a, T> {
    type Item = (usize, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        let (start, len) = self.cursor.next_run()?;

        // SAFETY: The run lies within the block and every slot in it is occupied. The free
        // list stays borrowed for 'a.
        let values = unsafe { slice::from_raw_parts(self.base.add(start).as_ptr(), len) };

        Some((start, values))
    }
}

impl<T> FusedIterator for Regions<'_, T> {}

// SAFETY: The iterator only hands out shared slices, like slice::Iter.
unsafe impl<T: Sync> Send for Regions<'_, T> {}
// SAFETY: The iterator only hands out shared slices, like slice::Iter.
unsafe impl<T: Sync> Sync for Regions<'_, T> {}

/// Iterator over the maximal runs of occupied slots of a [`FreeList`][crate::FreeList], as
/// `(start_index, values)` pairs with exclusive access to the values.
///
/// Created by [`FreeList::regions_mut()`][crate::FreeList::regions_mut].
#[derive(Debug)]
pub struct RegionsMut<'a, T> {
    base: NonNull<T>,
    cursor: Cursor<'a>,

    _values: PhantomData<&'a mut T>,
}

impl<'a, T> RegionsMut<'a, T> {
    pub(crate) fn new(base: NonNull<T>, links: FreeLinks<'a>, capacity: usize) -> Self {
        Self {
            base,
            cursor: Cursor::new(links, capacity),
            _values: PhantomData,
        }
    }
}

impl<'a, T> Iterator for RegionsMut<'a, T> {
    type Item = (usize, &'a mut [T]);

    fn next(&mut self) -> Option<Self::Item> {
        let (start, len) = self.cursor.next_run()?;

        // SAFETY: The run lies within the block, every slot in it is occupied and runs never
        // overlap, so the slices never alias. The free list is exclusively borrowed for 'a.
        let values = unsafe { slice::from_raw_parts_mut(self.base.add(start).as_ptr(), len) };

        Some((start, values))
    }
}

impl<T> FusedIterator for RegionsMut<'_, T> {}

// SAFETY: The iterator hands out exclusive slices, like slice::IterMut.
unsafe impl<T: Send> Send for RegionsMut<'_, T> {}
// SAFETY: The iterator hands out exclusive slices, like slice::IterMut.
unsafe impl<T: Sync> Sync for RegionsMut<'_, T> {}

/// Iterator over the free runs of a [`FreeList`][crate::FreeList], as `(start_index, length)`
/// pairs in index order.
///
/// Created by [`FreeList::free_regions()`][crate::FreeList::free_regions].
#[derive(Debug)]
pub struct FreeRegions<'a> {
    links: FreeLinks<'a>,
    next: Option<usize>,
}

impl<'a> FreeRegions<'a> {
    pub(crate) fn new(links: FreeLinks<'a>) -> Self {
        Self {
            next: links.first(),
            links,
        }
    }
}

impl Iterator for FreeRegions<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        let header = self.links.get(slot);

        self.next = header.next;

        Some((slot, header.size))
    }
}

impl FusedIterator for FreeRegions<'_> {}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::num::NonZero;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{DoublyLinked, FreeList, IntegrityChecks, SinglyLinked};

    assert_impl_all!(Iter<'static, u128>: Send, Sync, ExactSizeIterator, FusedIterator);
    assert_impl_all!(IterMut<'static, u128>: Send, Sync, ExactSizeIterator, FusedIterator);
    assert_impl_all!(Regions<'static, u128>: Send, Sync, FusedIterator);
    assert_impl_all!(RegionsMut<'static, u128>: Send, Sync, FusedIterator);
    assert_not_impl_any!(FreeRegions<'static>: Send, Sync);

    fn list_with_holes() -> FreeList<u128, DoublyLinked> {
        let mut list = FreeList::builder()
            .capacity_increments(NonZero::new(10).unwrap())
            .integrity_checks(IntegrityChecks::Always)
            .build();

        list.push_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);
        list.erase(0, 1);
        list.erase(3, 2);
        list.erase(7, 1);

        list
    }

    #[test]
    fn iter_skips_free_slots() {
        let list = list_with_holes();

        let visited: Vec<_> = list.iter().map(|(index, value)| (index, *value)).collect();

        assert_eq!(visited, vec![(1, 1), (2, 2), (5, 5), (6, 6)]);
    }

    #[test]
    fn iter_reports_exact_length() {
        let list = list_with_holes();
        let mut iter = list.iter();

        assert_eq!(iter.len(), 4);
        iter.next();
        assert_eq!(iter.len(), 3);
        iter.by_ref().for_each(drop);
        assert_eq!(iter.len(), 0);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn iter_mut_modifies_in_place() {
        let mut list = list_with_holes();

        for (index, value) in &mut list {
            *value += index as u128 * 100;
        }

        assert_eq!(list[2], 202);
        assert_eq!(list[6], 606);
    }

    #[test]
    fn regions_yield_maximal_runs() {
        let list = list_with_holes();

        let regions: Vec<_> = list.regions().collect();

        assert_eq!(regions, vec![(1, &[1, 2][..]), (5, &[5, 6][..])]);
    }

    #[test]
    fn regions_mut_yield_maximal_runs() {
        let mut list = list_with_holes();

        for (_, values) in list.regions_mut() {
            values.reverse();
        }

        assert_eq!(list[1], 2);
        assert_eq!(list[2], 1);
        assert_eq!(list[5], 6);
    }

    #[test]
    fn full_list_is_one_region() {
        let mut list = FreeList::<u64, SinglyLinked>::builder()
            .capacity_increments(NonZero::new(4).unwrap())
            .build();

        list.push_slice(&[1, 2, 3, 4]);

        let regions: Vec<_> = list.regions().collect();
        assert_eq!(regions, vec![(0, &[1, 2, 3, 4][..])]);
    }

    #[test]
    fn empty_list_yields_nothing() {
        let list = FreeList::<u128>::new();

        assert_eq!(list.iter().next(), None);
        assert_eq!(list.regions().next(), None);
        assert_eq!(list.free_regions().next(), None);

        let list = FreeList::<u128>::with_capacity(5);

        assert_eq!(list.iter().next(), None);
        assert_eq!(list.regions().next(), None);
        assert_eq!(list.free_regions().collect::<Vec<_>>(), vec![(0, 5)]);
    }

    #[test]
    fn free_regions_follow_index_order() {
        let list = list_with_holes();

        let free: Vec<_> = list.free_regions().collect();

        assert_eq!(free, vec![(0, 1), (3, 2), (7, 3)]);
    }
}
