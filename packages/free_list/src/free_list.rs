use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::num::NonZero;
use std::ops::{Index, IndexMut};

use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use scopeguard::ScopeGuard;
use tracing::{debug, trace};

use crate::{
    DoublyLinked, Error, FreeLinks, FreeListBuilder, FreeRegions, FreeSlot, IntegrityChecks, Iter,
    IterMut, Linkage, Regions, RegionsMut, Result, SinglyLinked, SlotStorage,
};

/// The largest number of slots any free list can hold (2^31).
pub const MAX_CAPACITY: usize = 1 << 31;

/// A dense collection of `T` stored in one contiguous block, addressed by stable indices.
///
/// Values are inserted with [`push()`][Self::push], [`push_slice()`][Self::push_slice] or
/// [`emplace()`][Self::emplace], each of which returns the index of the slot the value landed
/// in. The index stays valid until the value is [erased][Self::erase], even when the block is
/// reallocated to grow.
///
/// # Free list
///
/// Vacant slots are not tracked in a side table. Instead, every maximal run of vacant slots
/// stores a small header (`{size, next}` or `{size, next, prev}`, depending on the
/// [`Linkage`] strategy `L`) in its own first bytes, forming a free list ordered by index.
/// Insertion takes the first free run large enough for the request (first fit), consuming it
/// from the front. Erasure returns a range to the free list and merges it with any adjacent
/// free runs, so no two free runs are ever adjacent.
///
/// Because headers live inside vacant slots, `T` must be at least as large as the header:
/// 12 bytes for [`DoublyLinked`] (the default) and 8 bytes for [`SinglyLinked`]. This is
/// checked at compile time.
///
/// # Growth
///
/// When no free run fits, the block grows by the smallest multiple of the
/// [capacity increments][Self::capacity_increments] that satisfies the request. A free run at
/// the very end of the block is extended rather than left behind. Growth moves the whole block,
/// which invalidates references but not indices - the borrow checker ensures no references
/// survive a mutation.
///
/// The free list never shrinks on its own. Use [`shrink_to_fit()`][Self::shrink_to_fit] to
/// release vacant slots at the end of the block.
///
/// # Iteration
///
/// * [`iter()`][Self::iter] and [`iter_mut()`][Self::iter_mut] visit every value in index
///   order, jumping over free runs.
/// * [`regions()`][Self::regions] and [`regions_mut()`][Self::regions_mut] yield each maximal
///   run of occupied slots as one slice, for bulk processing such as uploading to a GPU buffer.
///
/// # Thread safety
///
/// The free list is thread-mobile ([`Send`]) if `T` is [`Send`] and can be shared ([`Sync`])
/// if `T` is [`Sync`]. It has no internal synchronization; mutation requires `&mut self`.
///
/// # Examples
///
/// ```
/// use free_list::FreeList;
///
/// let mut list = FreeList::<String>::new();
///
/// let hello = list.push("hello".to_string());
/// let world = list.push("world".to_string());
///
/// list.erase(hello, 1);
/// assert_eq!(list[world], "world");
///
/// // The vacated slot is reused first.
/// let again = list.push("again".to_string());
/// assert_eq!(again, hello);
/// ```
pub struct FreeList<T, L: Linkage = DoublyLinked> {
    slots: SlotStorage<T>,

    /// One bit per slot, set while the slot holds a live `T`. The free list itself is the
    /// authority for allocation decisions; this map backs the safety checks of the public
    /// API and the destruction of live values.
    occupied: BitVec,

    /// Lowest-indexed free slot, `None` if the block has no vacant slots.
    first_free: Option<usize>,

    /// Highest-indexed free slot, `None` if the block has no vacant slots.
    last_free: Option<usize>,

    len: usize,

    capacity_increments: NonZero<usize>,
    resize_threshold: f32,
    integrity_checks: IntegrityChecks,

    _linkage: PhantomData<L>,
}

/// A [`FreeList`] using the [`DoublyLinked`] strategy.
pub type DoublyLinkedFreeList<T> = FreeList<T, DoublyLinked>;

/// A [`FreeList`] using the [`SinglyLinked`] strategy.
pub type SinglyLinkedFreeList<T> = FreeList<T, SinglyLinked>;

impl<T, L: Linkage> FreeList<T, L> {
    const ELEMENT_FITS_HEADER: () = assert!(
        size_of::<T>() >= L::HEADER_BYTES,
        "the element type is too small to hold a free-slot header of the chosen linkage"
    );

    /// Creates an empty free list with the default configuration.
    ///
    /// No memory is allocated until the first value is inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use free_list::FreeList;
    ///
    /// let list = FreeList::<[f32; 4]>::new();
    /// assert_eq!(list.capacity(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty free list with `capacity` vacant slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_CAPACITY`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().initial_capacity(capacity).build()
    }

    /// Creates a builder for a free list with a custom configuration.
    pub fn builder() -> FreeListBuilder<T, L> {
        FreeListBuilder::new()
    }

    pub(crate) fn new_inner(
        capacity_increments: NonZero<usize>,
        initial_capacity: usize,
        resize_threshold: f32,
        integrity_checks: IntegrityChecks,
    ) -> Self {
        let () = Self::ELEMENT_FITS_HEADER;

        let mut list = Self {
            slots: SlotStorage::new(),
            occupied: BitVec::new(),
            first_free: None,
            last_free: None,
            len: 0,
            capacity_increments,
            resize_threshold,
            integrity_checks,
            _linkage: PhantomData,
        };

        if initial_capacity > 0 {
            list.grow_to(initial_capacity)
                .unwrap_or_else(|error| panic!("{error}"));
            list.after_mutation();
        }

        list
    }

    /// Number of slots in the block, occupied or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the free list holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes occupied by live values.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        // Cannot overflow because the live values fit in the block.
        self.len.wrapping_mul(size_of::<T>())
    }

    /// Number of bytes in the block.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        // Cannot overflow because the block exists.
        self.capacity().wrapping_mul(size_of::<T>())
    }

    /// Index of the lowest-indexed free slot, `None` if every slot is occupied.
    #[must_use]
    pub fn first_free_slot(&self) -> Option<usize> {
        self.first_free
    }

    /// Index of the highest-indexed free slot, `None` if every slot is occupied.
    #[must_use]
    pub fn last_free_slot(&self) -> Option<usize> {
        self.last_free
    }

    /// Number of slots added per growth step.
    #[must_use]
    pub fn capacity_increments(&self) -> NonZero<usize> {
        self.capacity_increments
    }

    /// Changes the number of slots added per growth step. Takes effect on the next growth.
    pub fn set_capacity_increments(&mut self, increments: NonZero<usize>) {
        self.capacity_increments = increments;
    }

    /// The advisory resize threshold. See [`FreeListBuilder::resize_threshold()`].
    #[must_use]
    pub fn resize_threshold(&self) -> f32 {
        self.resize_threshold
    }

    /// Changes the advisory resize threshold.
    ///
    /// # Panics
    ///
    /// Panics if the threshold is negative, infinite or NaN.
    pub fn set_resize_threshold(&mut self, threshold: f32) {
        assert!(
            threshold.is_finite() && threshold >= 0.0,
            "resize threshold must be a finite non-negative number, got {threshold}"
        );

        self.resize_threshold = threshold;
    }

    /// Whether the slot at `index` holds a value. Out of bounds indices hold no value.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.occupied.get(index).is_some_and(|bit| *bit)
    }

    /// Moves `value` into the first free slot and returns the slot index.
    ///
    /// # Panics
    ///
    /// Panics if the free list would have to grow beyond [`MAX_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use free_list::FreeList;
    ///
    /// let mut list = FreeList::<u128>::new();
    ///
    /// assert_eq!(list.push(10), 0);
    /// assert_eq!(list.push(20), 1);
    /// assert_eq!(list[1], 20);
    /// ```
    pub fn push(&mut self, value: T) -> usize {
        let index = self
            .commit_first_fit(1)
            .unwrap_or_else(|error| panic!("{error}"));

        // SAFETY: The slot was just committed, so it is in bounds and holds no live value.
        unsafe {
            self.slots.write(index, value);
        }

        self.after_mutation();

        index
    }

    /// Constructs a value with `f` and moves it into the first free slot, returning the slot
    /// index.
    ///
    /// If `f` panics, the free list is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the free list would have to grow beyond [`MAX_CAPACITY`].
    pub fn emplace(&mut self, f: impl FnOnce() -> T) -> usize {
        let value = f();
        self.push(value)
    }

    /// Inserts `T::default()` into the first free slot and returns the slot index.
    ///
    /// # Panics
    ///
    /// Panics if the free list would have to grow beyond [`MAX_CAPACITY`].
    pub fn emplace_default(&mut self) -> usize
    where
        T: Default,
    {
        self.emplace(T::default)
    }

    /// Clones `values` into the first run of free slots long enough to hold all of them and
    /// returns the index of the first.
    ///
    /// The run is physically contiguous, so the values are subsequently available as one
    /// slice via [`regions()`][Self::regions].
    ///
    /// If cloning panics, the values cloned so far are dropped and the run is returned to
    /// the free list.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or if the free list would have to grow beyond
    /// [`MAX_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use free_list::FreeList;
    ///
    /// let mut list = FreeList::<[f32; 4]>::new();
    ///
    /// let start = list.push_slice(&[[0.0; 4], [1.0; 4], [2.0; 4]]);
    /// assert_eq!(list[start + 2], [2.0; 4]);
    /// ```
    pub fn push_slice(&mut self, values: &[T]) -> usize
    where
        T: Clone,
    {
        assert!(!values.is_empty(), "cannot push an empty run of values");

        let run = values.len();
        let start = self
            .commit_first_fit(run)
            .unwrap_or_else(|error| panic!("{error}"));

        let mut progress = scopeguard::guard((&mut *self, 0_usize), |(list, written)| {
            list.abandon_run(start, run, written);
        });

        for value in values {
            let (list, written) = &mut *progress;

            let value = value.clone();

            // SAFETY: The whole run was committed above and slots are written in order, so
            // this slot is in bounds and holds no live value yet.
            unsafe {
                list.slots.write(start.wrapping_add(*written), value);
            }

            *written = written.wrapping_add(1);
        }

        ScopeGuard::into_inner(progress);

        self.after_mutation();

        start
    }

    /// Drops the `count` values starting at `start` and returns their slots to the free list.
    ///
    /// Erasing zero values is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the end of the block or if any slot in the range is
    /// vacant. Use [`try_erase()`][Self::try_erase] to handle these cases as errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use free_list::FreeList;
    ///
    /// let mut list = FreeList::<u128>::new();
    /// let start = list.push_slice(&[1, 2, 3, 4]);
    ///
    /// list.erase(start + 1, 2);
    ///
    /// assert_eq!(list.len(), 2);
    /// assert!(!list.contains(start + 1));
    /// ```
    pub fn erase(&mut self, start: usize, count: usize) {
        self.try_erase(start, count)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    /// Drops the `count` values starting at `start` and returns their slots to the free list,
    /// or reports why the range cannot be erased. The free list is unchanged on error.
    ///
    /// # Errors
    ///
    /// * [`Error::OutOfBounds`] if the range extends past the end of the block.
    /// * [`Error::Vacant`] if any slot in the range is vacant.
    pub fn try_erase(&mut self, start: usize, count: usize) -> Result<()> {
        let end = self.validate_range(start, count)?;

        if let Some(offset) = self.occupancy(start, end).first_zero() {
            return Err(Error::Vacant {
                index: start.wrapping_add(offset),
            });
        }

        // SAFETY: We just verified that the range is in bounds and fully occupied.
        unsafe {
            self.erase_unchecked(start, count);
        }

        Ok(())
    }

    /// Drops the `count` values starting at `start` and returns their slots to the free list,
    /// without checking the range first.
    ///
    /// # Safety
    ///
    /// The range must be within the block and every slot in it must hold a value.
    pub unsafe fn erase_unchecked(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }

        let (prev, next) = L::find_adjacent(self.links(), start);

        // The slots are returned to the free list even if dropping a value panics, so they
        // are never dropped a second time.
        let mut list = scopeguard::guard(&mut *self, |list| {
            list.release(start, count, prev, next);
        });

        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            list.slots.drop_range(start, count);
        }

        drop(list);

        self.after_mutation();
    }

    /// Drops every value and turns the whole block into a single free run. The block itself
    /// is kept.
    pub fn clear(&mut self) {
        let mut list = scopeguard::guard(&mut *self, |list| list.reset());

        list.drop_live_values();

        drop(list);

        debug!(
            element_type = type_name::<T>(),
            capacity = self.capacity(),
            "cleared free list"
        );

        self.after_mutation();
    }

    /// Makes sure a run of at least `additional` contiguous free slots exists, so that
    /// inserting that many values does not reallocate the block.
    ///
    /// # Panics
    ///
    /// Panics if the free list would have to grow beyond [`MAX_CAPACITY`].
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    /// Makes sure a run of at least `additional` contiguous free slots exists, so that
    /// inserting that many values does not reallocate the block.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityOverflow`] if the free list would have to grow beyond
    /// [`MAX_CAPACITY`]. The free list is unchanged on error.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        if additional == 0 || self.free_regions().any(|(_, size)| size >= additional) {
            return Ok(());
        }

        self.grow_to_fit(additional)?;
        self.after_mutation();

        Ok(())
    }

    /// Releases the free run at the end of the block, if there is one.
    ///
    /// This is the only way the block ever becomes smaller. Erasing values never shrinks it.
    pub fn shrink_to_fit(&mut self) {
        let old_capacity = self.capacity();

        let Some(last) = self.last_free else {
            return;
        };

        if !self.touches_end(last, old_capacity) {
            return;
        }

        let predecessor = L::predecessor(self.links(), last);
        self.connect(predecessor, None);

        self.slots.relocate(last);
        self.occupied.truncate(last);

        debug!(
            element_type = type_name::<T>(),
            linkage = type_name::<L>(),
            old_capacity,
            new_capacity = last,
            "shrank free list"
        );

        self.after_mutation();
    }

    /// Returns a reference to the value at `index`, or `None` if the slot is vacant or out
    /// of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: We just verified that the slot holds a value.
        Some(unsafe { self.get_unchecked(index) })
    }

    /// Returns an exclusive reference to the value at `index`, or `None` if the slot is vacant
    /// or out of bounds.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.contains(index) {
            return None;
        }

        // SAFETY: We just verified that the slot holds a value.
        Some(unsafe { self.get_unchecked_mut(index) })
    }

    /// Returns a reference to the value at `index` without checking the slot.
    ///
    /// # Safety
    ///
    /// The slot must be in bounds and hold a value.
    #[must_use]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        // SAFETY: Forwarding guarantees from the caller. The shared reference to the free list
        // guarantees nobody holds an exclusive reference to the value.
        unsafe { self.slots.slot_ptr(index).as_ref() }
    }

    /// Returns an exclusive reference to the value at `index` without checking the slot.
    ///
    /// # Safety
    ///
    /// The slot must be in bounds and hold a value.
    #[must_use]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: Forwarding guarantees from the caller. The exclusive reference to the free
        // list guarantees nobody else holds a reference to the value.
        unsafe { self.slots.slot_ptr(index).as_mut() }
    }

    /// Iterates over `(index, &value)` pairs in index order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.slots.base(), self.links(), self.capacity(), self.len)
    }

    /// Iterates over `(index, &mut value)` pairs in index order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let links = self.links_unbounded();
        IterMut::new(self.slots.base(), links, self.capacity(), self.len)
    }

    /// Iterates over maximal runs of occupied slots as `(start_index, values)` pairs, in
    /// index order.
    ///
    /// # Examples
    ///
    /// ```
    /// use free_list::FreeList;
    ///
    /// let mut list = FreeList::<u128>::new();
    /// list.push_slice(&[1, 2, 3, 4, 5]);
    /// list.erase(2, 1);
    ///
    /// let regions: Vec<_> = list.regions().collect();
    /// assert_eq!(regions, vec![(0, &[1, 2][..]), (3, &[4, 5][..])]);
    /// ```
    pub fn regions(&self) -> Regions<'_, T> {
        Regions::new(self.slots.base(), self.links(), self.capacity())
    }

    /// Iterates over maximal runs of occupied slots as `(start_index, values)` pairs with
    /// exclusive access to the values, in index order.
    pub fn regions_mut(&mut self) -> RegionsMut<'_, T> {
        let links = self.links_unbounded();
        RegionsMut::new(self.slots.base(), links, self.capacity())
    }

    /// Iterates over the free runs as `(start_index, length)` pairs, in index order.
    pub fn free_regions(&self) -> FreeRegions<'_> {
        FreeRegions::new(self.links())
    }

    /// Verifies the structure of the free list.
    ///
    /// This is called automatically after every mutation as configured by
    /// [`IntegrityChecks`].
    ///
    /// # Panics
    ///
    /// Panics if the structure is inconsistent: free runs out of order, adjacent, overlapping
    /// live values or outside the block, broken back links, wrong first or last free slot, or
    /// a value count that does not match the block.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub fn integrity_check(&self) {
        let capacity = self.capacity();

        assert_eq!(
            self.occupied.len(),
            capacity,
            "occupancy map length does not match capacity {capacity}"
        );

        let mut free_total: usize = 0;
        let mut previous: Option<(usize, usize)> = None;
        let mut steps: usize = 0;
        let mut cursor = self.first_free;

        while let Some(slot) = cursor {
            assert!(
                slot < capacity,
                "free slot {slot} out of bounds in free list of capacity {capacity}"
            );

            let header = self.header(slot);
            let end = slot.saturating_add(header.size);

            assert!(
                header.size > 0 && end <= capacity,
                "free slot {slot} has invalid size {} in free list of capacity {capacity}",
                header.size
            );

            if let Some((previous_start, previous_size)) = previous {
                assert!(
                    previous_start.saturating_add(previous_size) < slot,
                    "free slot {slot} is adjacent to, overlaps or precedes free slot {previous_start}"
                );
            }

            if L::TRACKS_PREV {
                assert_eq!(
                    header.prev,
                    previous.map(|(start, _)| start),
                    "free slot {slot} has a broken back link"
                );
            }

            assert!(
                self.occupancy(slot, end).not_any(),
                "free slot {slot} overlaps live values"
            );

            free_total = free_total.saturating_add(header.size);
            previous = Some((slot, header.size));
            cursor = header.next;

            steps = steps.saturating_add(1);
            assert!(steps <= capacity, "free list contains a cycle");
        }

        assert_eq!(
            self.last_free,
            previous.map(|(start, _)| start),
            "last free slot is not the end of the free list"
        );

        assert_eq!(
            self.len,
            self.occupied.count_ones(),
            "value count does not match the occupancy map"
        );

        assert_eq!(
            self.len.saturating_add(free_total),
            capacity,
            "live values and free runs do not add up to capacity {capacity}"
        );
    }

    fn after_mutation(&self) {
        if self.integrity_checks.enabled() {
            self.integrity_check();
        }
    }

    fn links(&self) -> FreeLinks<'_> {
        self.links_unbounded()
    }

    /// Same as [`links()`][Self::links] but with a lifetime chosen by the caller, for iterators
    /// that also hand out exclusive references to occupied slots.
    fn links_unbounded<'a>(&self) -> FreeLinks<'a> {
        // SAFETY: Every slot chained from first_free starts with a header written by
        // set_header() with the same TRACKS_PREV value, and the block is not relocated while
        // the view is in use because the view borrows the free list.
        unsafe {
            FreeLinks::new(
                self.slots.base().cast(),
                size_of::<T>(),
                L::TRACKS_PREV,
                self.first_free,
                self.last_free,
            )
        }
    }

    fn occupancy(&self, start: usize, end: usize) -> &BitSlice {
        self.occupied
            .get(start..end)
            .expect("slot ranges are validated against capacity before use")
    }

    fn occupancy_mut(&mut self, start: usize, end: usize) -> &mut BitSlice {
        self.occupied
            .get_mut(start..end)
            .expect("slot ranges are validated against capacity before use")
    }

    fn header(&self, slot: usize) -> FreeSlot {
        self.links().get(slot)
    }

    fn set_header(&mut self, slot: usize, header: FreeSlot) {
        let slot_ptr = self.slots.slot_ptr(slot).cast::<u8>();

        // SAFETY: The slot is vacant (callers only write headers to slots they are returning
        // to or keeping in the free list) and T is at least HEADER_BYTES large.
        unsafe {
            header.write(slot_ptr, L::TRACKS_PREV);
        }
    }

    fn touches_end(&self, slot: usize, capacity: usize) -> bool {
        slot.wrapping_add(self.header(slot).size) == capacity
    }

    /// Makes `second` follow `first` in the free list. `None` on either side stands for the
    /// corresponding end of the list.
    fn connect(&mut self, first: Option<usize>, second: Option<usize>) {
        match first {
            Some(slot) => {
                let mut header = self.header(slot);
                header.next = second;
                self.set_header(slot, header);
            }
            None => self.first_free = second,
        }

        match second {
            Some(slot) => {
                if L::TRACKS_PREV {
                    let mut header = self.header(slot);
                    header.prev = first;
                    self.set_header(slot, header);
                }
            }
            None => self.last_free = first,
        }
    }

    /// Folds `second` into `first` if `second` starts right where `first` ends.
    fn merge_if_adjacent(&mut self, first: usize, second: Option<usize>) -> bool {
        let Some(second) = second else {
            return false;
        };

        let head = self.header(first);

        if first.wrapping_add(head.size) != second {
            return false;
        }

        let tail = self.header(second);

        self.set_header(
            first,
            FreeSlot {
                // Cannot overflow because both runs are within the block.
                size: head.size.wrapping_add(tail.size),
                next: tail.next,
                prev: head.prev,
            },
        );
        self.connect(Some(first), tail.next);

        true
    }

    /// Takes `run` slots from the front of the first free slot that can hold them, growing
    /// the block if none can.
    fn commit_first_fit(&mut self, run: usize) -> Result<usize> {
        let mut before_previous = None;
        let mut previous = None;
        let mut cursor = self.first_free;

        while let Some(slot) = cursor {
            let header = self.header(slot);

            if header.size >= run {
                self.commit(previous, slot, header, run);
                return Ok(slot);
            }

            before_previous = previous;
            previous = Some(slot);
            cursor = header.next;
        }

        // The walk ended at the last free slot (if any), with `before_previous` being its
        // predecessor. Growth either extends that slot or appends a new one after it.
        let old_last = self.last_free;

        self.grow_to_fit(run)?;

        let slot = self
            .last_free
            .expect("growth always leaves a free slot at the end of the block");

        let predecessor = if Some(slot) == old_last {
            before_previous
        } else {
            old_last
        };

        let header = self.header(slot);
        self.commit(predecessor, slot, header, run);

        Ok(slot)
    }

    fn commit(&mut self, previous: Option<usize>, slot: usize, header: FreeSlot, run: usize) {
        debug_assert!(
            header.size >= run,
            "free slot {slot} of size {} cannot hold a run of {run}",
            header.size
        );

        // Cannot overflow because the run is within the block.
        let end = slot.wrapping_add(run);

        self.occupancy_mut(slot, end).fill(true);
        self.len = self.len.wrapping_add(run);

        if header.size > run {
            self.set_header(
                end,
                FreeSlot {
                    size: header.size.wrapping_sub(run),
                    next: header.next,
                    prev: previous,
                },
            );
            self.connect(previous, Some(end));
            self.connect(Some(end), header.next);
        } else {
            self.connect(previous, header.next);
        }
    }

    /// Returns a range whose values have already been dropped (or never existed) to the
    /// free list, merging it with its neighbors `prev` and `next` where adjacent.
    fn release(&mut self, start: usize, count: usize, prev: Option<usize>, next: Option<usize>) {
        // Cannot overflow because the range is within the block.
        let end = start.wrapping_add(count);

        self.occupancy_mut(start, end).fill(false);
        self.len = self.len.wrapping_sub(count);

        #[cfg(debug_assertions)]
        self.slots.poison(start, count);

        self.set_header(
            start,
            FreeSlot {
                size: count,
                next,
                prev,
            },
        );
        self.connect(prev, Some(start));
        self.connect(Some(start), next);

        let merged_next = self.merge_if_adjacent(start, next);
        let merged_prev = prev.is_some_and(|prev| self.merge_if_adjacent(prev, Some(start)));

        trace!(
            start,
            count, merged_prev, merged_next, "returned slots to free list"
        );
    }

    /// Cleans up after a `push_slice()` whose cloning panicked after `written` values.
    fn abandon_run(&mut self, start: usize, run: usize, written: usize) {
        // SAFETY: Exactly the first `written` slots of the committed run were initialized.
        unsafe {
            self.slots.drop_range(start, written);
        }

        let (prev, next) = L::find_adjacent(self.links(), start);
        self.release(start, run, prev, next);
    }

    fn drop_live_values(&mut self) {
        if !mem::needs_drop::<T>() {
            return;
        }

        self.drop_live_values_from(0);
    }

    /// Drops every live value at or after `from`, one occupied run at a time. If a drop
    /// panics, the rest of the block is still dropped while unwinding.
    fn drop_live_values_from(&mut self, from: usize) {
        let mut cursor = from;

        while let Some((start, end)) = self.next_occupied_run(cursor) {
            let mut list = scopeguard::guard(&mut *self, |list| list.drop_live_values_from(end));

            // SAFETY: The occupancy map marks exactly the slots holding live values, and each
            // run is dropped once because the caller resets the map afterwards.
            unsafe {
                list.slots.drop_range(start, end.wrapping_sub(start));
            }

            ScopeGuard::into_inner(list);
            cursor = end;
        }
    }

    /// Returns the first maximal run of occupied slots at or after `from` as `start..end`.
    fn next_occupied_run(&self, from: usize) -> Option<(usize, usize)> {
        let start = from.wrapping_add(self.occupied.get(from..)?.first_one()?);

        let end = self
            .occupied
            .get(start..)
            .and_then(BitSlice::first_zero)
            .map_or(self.occupied.len(), |offset| start.wrapping_add(offset));

        Some((start, end))
    }

    /// Turns the whole block into one free slot.
    fn reset(&mut self) {
        let capacity = self.capacity();

        self.occupied.fill(false);
        self.len = 0;

        if capacity == 0 {
            self.first_free = None;
            self.last_free = None;
            return;
        }

        #[cfg(debug_assertions)]
        self.slots.poison(0, capacity);

        self.set_header(
            0,
            FreeSlot {
                size: capacity,
                next: None,
                prev: None,
            },
        );
        self.first_free = Some(0);
        self.last_free = Some(0);
    }

    /// Grows the block enough for a run of `run` slots to fit, either in a new free slot at
    /// the end or by extending a free slot that already touches the end.
    fn grow_to_fit(&mut self, run: usize) -> Result<()> {
        let capacity = self.capacity();

        let tail_size = self
            .last_free
            .filter(|&last| self.touches_end(last, capacity))
            .map_or(0, |last| self.header(last).size);

        let shortfall = run.saturating_sub(tail_size);

        let increase = shortfall
            .div_ceil(self.capacity_increments.get())
            .saturating_mul(self.capacity_increments.get());

        self.grow_to(capacity.saturating_add(increase))
    }

    fn grow_to(&mut self, new_capacity: usize) -> Result<()> {
        let old_capacity = self.capacity();

        debug_assert!(
            new_capacity > old_capacity,
            "grow_to({new_capacity}) would not grow a free list of capacity {old_capacity}"
        );

        if new_capacity > MAX_CAPACITY {
            return Err(Error::CapacityOverflow {
                requested: new_capacity,
                max: MAX_CAPACITY,
            });
        }

        let tail = self
            .last_free
            .filter(|&last| self.touches_end(last, old_capacity));

        self.slots.relocate(new_capacity);
        self.occupied.resize(new_capacity, false);

        let added = new_capacity.wrapping_sub(old_capacity);

        if let Some(tail) = tail {
            let mut header = self.header(tail);
            header.size = header.size.wrapping_add(added);
            self.set_header(tail, header);
        } else {
            let previous_last = self.last_free;

            self.set_header(
                old_capacity,
                FreeSlot {
                    size: added,
                    next: None,
                    prev: previous_last,
                },
            );
            self.connect(previous_last, Some(old_capacity));
            self.connect(Some(old_capacity), None);
        }

        debug!(
            element_type = type_name::<T>(),
            linkage = type_name::<L>(),
            old_capacity,
            new_capacity,
            "grew free list"
        );

        Ok(())
    }

    fn validate_range(&self, start: usize, count: usize) -> Result<usize> {
        let capacity = self.capacity();

        match start.checked_add(count) {
            Some(end) if end <= capacity => Ok(end),
            _ => Err(Error::OutOfBounds {
                start,
                end: start.saturating_add(count),
                capacity,
            }),
        }
    }
}

impl<T, L: Linkage> Default for FreeList<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L: Linkage> Drop for FreeList<T, L> {
    fn drop(&mut self) {
        // The storage releases the block itself when it is dropped right after this.
        self.drop_live_values();
    }
}

impl<T: Clone, L: Linkage> Clone for FreeList<T, L> {
    /// Deep-copies the free list: every value is cloned into the same index of a new block
    /// of equal capacity, and the free list structure is copied as-is.
    fn clone(&self) -> Self {
        let mut copy = Self::new_inner(
            self.capacity_increments,
            0,
            self.resize_threshold,
            self.integrity_checks,
        );

        copy.slots.relocate(self.capacity());
        copy.occupied.resize(self.capacity(), false);

        // If a clone panics, the copy drops exactly the values marked in its occupancy map.
        for (index, value) in self.iter() {
            let value = value.clone();

            // SAFETY: The copy has the same capacity and this slot is still vacant in it.
            unsafe {
                copy.slots.write(index, value);
            }

            copy.occupied.set(index, true);
            copy.len = copy.len.wrapping_add(1);
        }

        for (slot, _) in self.free_regions() {
            copy.set_header(slot, self.header(slot));
        }

        copy.first_free = self.first_free;
        copy.last_free = self.last_free;

        copy.after_mutation();

        copy
    }
}

impl<T, L: Linkage> Index<usize> for FreeList<T, L> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    fn index(&self, index: usize) -> &T {
        let capacity = self.capacity();

        self.get(index).unwrap_or_else(|| {
            panic!("slot {index} is out of bounds or vacant in free list of capacity {capacity}")
        })
    }
}

impl<T, L: Linkage> IndexMut<usize> for FreeList<T, L> {
    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    fn index_mut(&mut self, index: usize) -> &mut T {
        let capacity = self.capacity();

        self.get_mut(index).unwrap_or_else(|| {
            panic!("slot {index} is out of bounds or vacant in free list of capacity {capacity}")
        })
    }
}

impl<'a, T, L: Linkage> IntoIterator for &'a FreeList<T, L> {
    type Item = (usize, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, L: Linkage> IntoIterator for &'a mut FreeList<T, L> {
    type Item = (usize, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug, L: Linkage> fmt::Debug for FreeList<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeList")
            .field("linkage", &format_args!("{}", type_name::<L>()))
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("first_free", &self.first_free)
            .field("last_free", &self.last_free)
            .field("capacity_increments", &self.capacity_increments)
            .field("resize_threshold", &self.resize_threshold)
            .field("integrity_checks", &self.integrity_checks)
            .field("values", &ValuesDebug(self))
            .finish_non_exhaustive()
    }
}

struct ValuesDebug<'a, T, L: Linkage>(&'a FreeList<T, L>);

impl<T: fmt::Debug, L: Linkage> fmt::Debug for ValuesDebug<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

// SAFETY: The free list owns its values exclusively, exactly like Vec<T>. The raw pointer to
// the block is never shared with anything that outlives a borrow of the free list.
unsafe impl<T: Send, L: Linkage> Send for FreeList<T, L> {}

// SAFETY: Shared access only hands out shared references to values, exactly like Vec<T>.
unsafe impl<T: Sync, L: Linkage> Sync for FreeList<T, L> {}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::builder::{DEFAULT_CAPACITY_INCREMENTS, DEFAULT_RESIZE_THRESHOLD};

    assert_impl_all!(FreeList<String>: Send, Sync, Default);
    assert_impl_all!(FreeList<u64, SinglyLinked>: Send, Sync);
    assert_not_impl_any!(FreeList<Rc<u64>, SinglyLinked>: Send, Sync);
    assert_not_impl_any!(FreeList<Cell<u128>>: Sync);

    fn list_with_increments<T, L: Linkage>(increments: usize) -> FreeList<T, L> {
        FreeList::builder()
            .capacity_increments(NonZero::new(increments).unwrap())
            .integrity_checks(IntegrityChecks::Always)
            .build()
    }

    fn free_runs<T, L: Linkage>(list: &FreeList<T, L>) -> Vec<(usize, usize)> {
        list.free_regions().collect()
    }

    fn first_fit_split_reinserts_remainder<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(8);

        assert_eq!(list.push(1), 0);
        assert_eq!(free_runs(&list), vec![(1, 7)]);

        assert_eq!(list.push_slice(&[2, 3]), 1);
        assert_eq!(free_runs(&list), vec![(3, 5)]);
        assert_eq!(list.first_free_slot(), Some(3));
        assert_eq!(list.last_free_slot(), Some(3));
    }

    #[test]
    fn first_fit_split_reinserts_remainder_doubly() {
        first_fit_split_reinserts_remainder::<DoublyLinked>();
    }

    #[test]
    fn first_fit_split_reinserts_remainder_singly() {
        first_fit_split_reinserts_remainder::<SinglyLinked>();
    }

    fn exact_fit_unlinks_slot<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(6);

        list.push_slice(&[0, 1, 2, 3, 4, 5]);
        list.erase(1, 1);
        list.erase(3, 1);
        list.erase(5, 1);
        assert_eq!(free_runs(&list), vec![(1, 1), (3, 1), (5, 1)]);

        // Takes the middle of three slots when the first is too small for the request.
        list.erase(0, 1);
        assert_eq!(free_runs(&list), vec![(0, 2), (3, 1), (5, 1)]);

        assert_eq!(list.push(9), 0);
        assert_eq!(free_runs(&list), vec![(1, 1), (3, 1), (5, 1)]);

        assert_eq!(list.push(10), 1);
        assert_eq!(list.push(11), 3);
        assert_eq!(free_runs(&list), vec![(5, 1)]);

        assert_eq!(list.push(12), 5);
        assert_eq!(free_runs(&list), vec![]);
        assert_eq!(list.first_free_slot(), None);
        assert_eq!(list.last_free_slot(), None);
    }

    #[test]
    fn exact_fit_unlinks_slot_doubly() {
        exact_fit_unlinks_slot::<DoublyLinked>();
    }

    #[test]
    fn exact_fit_unlinks_slot_singly() {
        exact_fit_unlinks_slot::<SinglyLinked>();
    }

    fn erase_merges_both_neighbors<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(7);

        list.push_slice(&[0, 1, 2, 3, 4, 5, 6]);
        list.erase(1, 1);
        list.erase(3, 1);
        assert_eq!(free_runs(&list), vec![(1, 1), (3, 1)]);

        list.erase(2, 1);
        assert_eq!(free_runs(&list), vec![(1, 3)]);

        list.erase(5, 2);
        assert_eq!(free_runs(&list), vec![(1, 3), (5, 2)]);

        list.erase(4, 1);
        assert_eq!(free_runs(&list), vec![(1, 6)]);

        list.erase(0, 1);
        assert_eq!(free_runs(&list), vec![(0, 7)]);
        assert!(list.is_empty());
    }

    #[test]
    fn erase_merges_both_neighbors_doubly() {
        erase_merges_both_neighbors::<DoublyLinked>();
    }

    #[test]
    fn erase_merges_both_neighbors_singly() {
        erase_merges_both_neighbors::<SinglyLinked>();
    }

    fn growth_extends_trailing_free_slot<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(4);

        list.push_slice(&[0, 1, 2]);
        assert_eq!(list.capacity(), 4);
        assert_eq!(free_runs(&list), vec![(3, 1)]);

        // Needs 3 slots, the trailing slot has 1, so growth adds one increment to it.
        assert_eq!(list.push_slice(&[3, 4, 5]), 3);
        assert_eq!(list.capacity(), 8);
        assert_eq!(free_runs(&list), vec![(6, 2)]);
    }

    #[test]
    fn growth_extends_trailing_free_slot_doubly() {
        growth_extends_trailing_free_slot::<DoublyLinked>();
    }

    #[test]
    fn growth_extends_trailing_free_slot_singly() {
        growth_extends_trailing_free_slot::<SinglyLinked>();
    }

    fn growth_appends_after_interior_free_slot<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(4);

        list.push_slice(&[0, 1, 2, 3]);
        list.erase(1, 1);

        assert_eq!(list.push_slice(&[7, 8]), 4);
        assert_eq!(list.capacity(), 8);
        assert_eq!(free_runs(&list), vec![(1, 1), (6, 2)]);
        assert_eq!(list.first_free_slot(), Some(1));
        assert_eq!(list.last_free_slot(), Some(6));
    }

    #[test]
    fn growth_appends_after_interior_free_slot_doubly() {
        growth_appends_after_interior_free_slot::<DoublyLinked>();
    }

    #[test]
    fn growth_appends_after_interior_free_slot_singly() {
        growth_appends_after_interior_free_slot::<SinglyLinked>();
    }

    fn growth_rounds_to_increments<L: Linkage>() {
        let mut list = list_with_increments::<u128, L>(4);

        list.push_slice(&[0; 9]);
        assert_eq!(list.capacity(), 12);
        assert_eq!(free_runs(&list), vec![(9, 3)]);
    }

    #[test]
    fn growth_rounds_to_increments_doubly() {
        growth_rounds_to_increments::<DoublyLinked>();
    }

    #[test]
    fn growth_rounds_to_increments_singly() {
        growth_rounds_to_increments::<SinglyLinked>();
    }

    #[test]
    fn growth_beyond_maximum_is_error() {
        let mut list = list_with_increments::<u128, DoublyLinked>(1);

        assert_eq!(
            list.try_reserve(MAX_CAPACITY + 1),
            Err(Error::CapacityOverflow {
                requested: MAX_CAPACITY + 1,
                max: MAX_CAPACITY,
            })
        );
        assert_eq!(list.capacity(), 0);
    }

    #[test]
    fn reserve_guarantees_contiguous_run() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);

        list.push_slice(&[0, 1, 2, 3]);
        list.erase(1, 1);

        list.reserve(3);
        let capacity = list.capacity();

        assert_eq!(list.push_slice(&[5, 6, 7]), 4);
        assert_eq!(list.capacity(), capacity);

        // Already satisfied, nothing happens.
        list.reserve(1);
        assert_eq!(list.capacity(), capacity);
    }

    #[test]
    fn erase_out_of_bounds_is_error() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push(1);

        assert_eq!(
            list.try_erase(3, 2),
            Err(Error::OutOfBounds {
                start: 3,
                end: 5,
                capacity: 4,
            })
        );
        assert_eq!(
            list.try_erase(usize::MAX, 2),
            Err(Error::OutOfBounds {
                start: usize::MAX,
                end: usize::MAX,
                capacity: 4,
            })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn erase_vacant_is_error() {
        let mut list = list_with_increments::<u128, SinglyLinked>(4);
        list.push_slice(&[1, 2]);

        assert_eq!(list.try_erase(1, 2), Err(Error::Vacant { index: 2 }));
        assert_eq!(list.len(), 2);

        list.erase(1, 1);
        assert_eq!(list.try_erase(1, 1), Err(Error::Vacant { index: 1 }));
    }

    #[test]
    #[should_panic]
    fn erase_vacant_panics() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push(1);

        list.erase(2, 1);
    }

    #[test]
    fn erase_zero_is_noop() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push(1);

        list.erase(0, 0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn clear_resets_to_single_free_slot() {
        let tracker = Rc::new(());
        let mut list = list_with_increments::<Rc<()>, SinglyLinked>(3);

        for _ in 0..5 {
            list.push(Rc::clone(&tracker));
        }

        list.erase(1, 1);
        assert_eq!(Rc::strong_count(&tracker), 5);

        list.clear();

        assert_eq!(Rc::strong_count(&tracker), 1);
        assert_eq!(list.capacity(), 6);
        assert!(list.is_empty());
        assert_eq!(free_runs(&list), vec![(0, 6)]);
    }

    #[test]
    fn clear_without_allocation() {
        let mut list = list_with_increments::<u128, DoublyLinked>(3);

        list.clear();

        assert_eq!(list.capacity(), 0);
        assert_eq!(list.first_free_slot(), None);
    }

    #[test]
    fn drop_releases_live_values() {
        let tracker = Rc::new(());

        {
            let mut list = list_with_increments::<Rc<()>, SinglyLinked>(2);

            for _ in 0..4 {
                list.push(Rc::clone(&tracker));
            }

            list.erase(2, 1);
            assert_eq!(Rc::strong_count(&tracker), 4);
        }

        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn shrink_to_fit_releases_tail() {
        let mut list = list_with_increments::<u128, SinglyLinked>(4);

        list.push_slice(&[0, 1, 2, 3, 4, 5]);
        list.erase(1, 1);
        list.erase(4, 2);
        assert_eq!(free_runs(&list), vec![(1, 1), (4, 4)]);

        list.shrink_to_fit();

        assert_eq!(list.capacity(), 4);
        assert_eq!(free_runs(&list), vec![(1, 1)]);
        assert_eq!(list.last_free_slot(), Some(1));
        assert_eq!(list[3], 3);
    }

    #[test]
    fn shrink_to_fit_without_tail_is_noop() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);

        list.push_slice(&[0, 1, 2, 3]);
        list.erase(1, 1);

        list.shrink_to_fit();

        assert_eq!(list.capacity(), 4);
    }

    #[test]
    fn shrink_to_fit_empty_releases_everything() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);

        list.push(1);
        list.erase(0, 1);
        list.shrink_to_fit();

        assert_eq!(list.capacity(), 0);
        assert_eq!(list.first_free_slot(), None);
        assert_eq!(list.last_free_slot(), None);

        assert_eq!(list.push(2), 0);
        assert_eq!(list.capacity(), 4);
    }

    #[test]
    fn panicking_clone_in_push_slice_restores_free_list() {
        #[derive(Debug)]
        struct Fragile {
            value: u128,
            drops: Rc<Cell<usize>>,
        }

        impl Clone for Fragile {
            fn clone(&self) -> Self {
                assert!(self.value != 2, "refusing to clone 2");

                Self {
                    value: self.value,
                    drops: Rc::clone(&self.drops),
                }
            }
        }

        impl Drop for Fragile {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let values: Vec<Fragile> = (0..4)
            .map(|value| Fragile {
                value,
                drops: Rc::clone(&drops),
            })
            .collect();

        let mut list = list_with_increments::<Fragile, DoublyLinked>(8);

        let result = catch_unwind(AssertUnwindSafe(|| list.push_slice(&values)));
        assert!(result.is_err());

        // The two clones made before the panic were dropped again.
        assert_eq!(drops.get(), 2);
        assert!(list.is_empty());
        assert_eq!(free_runs(&list), vec![(0, 8)]);

        list.integrity_check();
    }

    #[test]
    fn panicking_drop_in_erase_keeps_slots_released() {
        struct Bomb(u128);

        impl Drop for Bomb {
            fn drop(&mut self) {
                assert!(self.0 != 1, "boom");
            }
        }

        let mut list = list_with_increments::<Bomb, SinglyLinked>(4);
        list.push(Bomb(0));
        list.push(Bomb(1));
        list.push(Bomb(2));

        let result = catch_unwind(AssertUnwindSafe(|| list.erase(0, 3)));
        assert!(result.is_err());

        assert!(list.is_empty());
        assert_eq!(free_runs(&list), vec![(0, 4)]);
    }

    struct CountedBomb {
        armed: bool,
        drops: Rc<Cell<usize>>,
    }

    impl Drop for CountedBomb {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
            assert!(!self.armed, "boom");
        }
    }

    fn bombs_with_gap(drops: &Rc<Cell<usize>>) -> FreeList<CountedBomb, SinglyLinked> {
        let mut list = list_with_increments::<CountedBomb, SinglyLinked>(8);

        for index in 0..6 {
            list.push(CountedBomb {
                armed: index == 1,
                drops: Rc::clone(drops),
            });
        }

        // Two occupied runs, 0..3 and 4..6, with the armed value in the first.
        list.erase(3, 1);
        assert_eq!(drops.get(), 1);

        list
    }

    #[test]
    fn panicking_drop_in_clear_drops_remaining() {
        let drops = Rc::new(Cell::new(0));
        let mut list = bombs_with_gap(&drops);

        let result = catch_unwind(AssertUnwindSafe(|| list.clear()));
        assert!(result.is_err());

        assert_eq!(drops.get(), 6);
        assert!(list.is_empty());
        assert_eq!(free_runs(&list), vec![(0, 8)]);
    }

    #[test]
    fn panicking_drop_in_drop_drops_remaining() {
        let drops = Rc::new(Cell::new(0));
        let list = bombs_with_gap(&drops);

        let result = catch_unwind(AssertUnwindSafe(move || drop(list)));
        assert!(result.is_err());

        assert_eq!(drops.get(), 6);
    }

    #[test]
    fn emplace_panic_leaves_list_untouched() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push(5);

        let result = catch_unwind(AssertUnwindSafe(|| {
            list.emplace(|| panic!("construction failed"))
        }));
        assert!(result.is_err());

        assert_eq!(list.len(), 1);
        assert_eq!(free_runs(&list), vec![(1, 3)]);
    }

    #[test]
    fn get_checks_occupancy() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        let index = list.push(7);

        assert_eq!(list.get(index), Some(&7));
        assert_eq!(list.get(index + 1), None);
        assert_eq!(list.get(100), None);

        *list.get_mut(index).unwrap() = 8;
        assert_eq!(list[index], 8);

        list[index] += 1;
        assert_eq!(unsafe { *list.get_unchecked(index) }, 9);
    }

    #[test]
    #[should_panic]
    fn index_vacant_panics() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push(7);

        _ = list[1];
    }

    #[test]
    fn byte_accounting() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);
        list.push_slice(&[1, 2, 3]);

        assert_eq!(list.size_in_bytes(), 3 * 16);
        assert_eq!(list.allocated_bytes(), 4 * 16);
    }

    #[test]
    fn settings_are_adjustable() {
        let mut list = list_with_increments::<u128, DoublyLinked>(4);

        list.set_capacity_increments(NonZero::new(16).unwrap());
        list.set_resize_threshold(2.5);

        assert_eq!(list.capacity_increments().get(), 16);
        assert!((list.resize_threshold() - 2.5).abs() < f32::EPSILON);

        list.push(1);
        assert_eq!(list.capacity(), 16);
    }

    #[test]
    fn default_configuration() {
        let mut list = FreeList::<u128>::default();

        assert_eq!(list.capacity_increments(), DEFAULT_CAPACITY_INCREMENTS);
        assert!((list.resize_threshold() - DEFAULT_RESIZE_THRESHOLD).abs() < f32::EPSILON);

        list.push(1);
        assert_eq!(list.capacity(), 10);
    }

    #[test]
    fn debug_output_lists_values() {
        let mut list = list_with_increments::<u128, SinglyLinked>(4);
        list.push(41);
        list.push(42);
        list.erase(0, 1);

        let output = format!("{list:?}");

        assert!(output.contains("SinglyLinked"));
        assert!(output.contains("1: 42"));
        assert!(!output.contains("41"));
    }
}
