use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// Byte pattern written over vacant slots in debug builds, to make reads of
/// erased elements stand out.
#[cfg(debug_assertions)]
const POISON: u8 = 0xCC;

/// One contiguous, untyped-per-slot block of `capacity` element-sized slots.
///
/// The storage does not know which slots hold a live `T` - that is tracked by the owning
/// free list. Consequently it never drops elements; dropping the storage only releases
/// the memory.
///
/// # Relocation
///
/// Growing or shrinking the block moves every slot to a new allocation with a bitwise copy.
/// Pointers into the block are invalidated; slot indices are not.
#[derive(Debug)]
pub(crate) struct SlotStorage<T> {
    /// Base of the allocation, dangling while `capacity` is zero.
    ptr: NonNull<T>,

    capacity: usize,

    _owns: PhantomData<T>,
}

impl<T> SlotStorage<T> {
    pub(crate) const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _owns: PhantomData,
        }
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub(crate) fn base(&self) -> NonNull<T> {
        self.ptr
    }

    /// Moves the block to a new allocation of `new_capacity` slots, keeping the contents of
    /// the first `min(capacity, new_capacity)` slots. Releases the block entirely if
    /// `new_capacity` is zero.
    ///
    /// The caller is responsible for ensuring no live elements exist beyond `new_capacity`.
    pub(crate) fn relocate(&mut self, new_capacity: usize) {
        if new_capacity == self.capacity {
            return;
        }

        let new_ptr = if new_capacity == 0 {
            NonNull::dangling()
        } else {
            let layout = Self::layout(new_capacity);

            // SAFETY: T is never zero-sized (enforced by the free list) and capacity is
            // non-zero, so the layout has a non-zero size.
            let raw = unsafe { alloc(layout) };

            let Some(new_ptr) = NonNull::new(raw.cast::<T>()) else {
                handle_alloc_error(layout);
            };

            // SAFETY: Both blocks are valid for at least `retained` slots and the new block
            // was freshly allocated, so they cannot overlap. Copying bytes is valid whatever
            // the slots contain (live elements or free-slot headers).
            unsafe {
                ptr::copy_nonoverlapping(
                    self.ptr.as_ptr(),
                    new_ptr.as_ptr(),
                    self.capacity.min(new_capacity),
                );
            }

            new_ptr
        };

        self.release();

        self.ptr = new_ptr;
        self.capacity = new_capacity;
    }

    /// Returns a pointer to the slot at `index`.
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        debug_assert!(
            index < self.capacity,
            "slot {index} out of bounds in block of capacity {}",
            self.capacity
        );

        // SAFETY: In bounds per the assertion above (and per every caller's own bounds check
        // in release builds), so the result stays within the allocation.
        unsafe { self.ptr.add(index) }
    }

    /// Moves `value` into the slot at `index`.
    ///
    /// # Safety
    ///
    /// The slot must be in bounds and must not hold a live element.
    pub(crate) unsafe fn write(&mut self, index: usize, value: T) {
        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            self.slot_ptr(index).write(value);
        }
    }

    /// Drops the `count` live elements starting at `start` in place.
    ///
    /// # Safety
    ///
    /// Every slot in the range must hold a live element, and the elements must not be used
    /// again afterwards.
    pub(crate) unsafe fn drop_range(&mut self, start: usize, count: usize) {
        let run = ptr::slice_from_raw_parts_mut(self.slot_ptr(start).as_ptr(), count);

        // SAFETY: Forwarding guarantees from the caller. drop_in_place on a slice keeps
        // dropping the remaining elements if one of them panics.
        unsafe {
            ptr::drop_in_place(run);
        }
    }

    /// Overwrites the bytes of `count` vacant slots starting at `start` with a recognizable
    /// pattern.
    #[cfg(debug_assertions)]
    pub(crate) fn poison(&mut self, start: usize, count: usize) {
        // SAFETY: The range is within the block (callers validate it) and vacant slots
        // contain no live elements, so overwriting their bytes is harmless.
        unsafe {
            self.slot_ptr(start).cast::<u8>().write_bytes(
                POISON,
                count.wrapping_mul(size_of::<T>()),
            );
        }
    }

    fn layout(capacity: usize) -> Layout {
        Layout::array::<T>(capacity)
            .expect("layout calculation cannot fail for capacities below the free list maximum")
    }

    fn release(&mut self) {
        if self.capacity == 0 {
            return;
        }

        // SAFETY: The block was allocated by relocate() with the layout for the current
        // capacity, and is released only once because capacity is reset by every caller.
        unsafe {
            dealloc(self.ptr.as_ptr().cast(), Self::layout(self.capacity));
        }

        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }
}

impl<T> Drop for SlotStorage<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_allocation() {
        let storage = SlotStorage::<u64>::new();

        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.base(), NonNull::dangling());
    }

    #[test]
    fn growth_preserves_contents() {
        let mut storage = SlotStorage::<u64>::new();
        storage.relocate(4);

        for index in 0..4 {
            unsafe { storage.write(index, index as u64 * 10) };
        }

        storage.relocate(16);
        assert_eq!(storage.capacity(), 16);

        for index in 0..4 {
            assert_eq!(unsafe { storage.slot_ptr(index).read() }, index as u64 * 10);
        }
    }

    #[test]
    fn shrink_keeps_prefix() {
        let mut storage = SlotStorage::<u64>::new();
        storage.relocate(8);

        for index in 0..8 {
            unsafe { storage.write(index, index as u64) };
        }

        storage.relocate(3);
        assert_eq!(storage.capacity(), 3);

        for index in 0..3 {
            assert_eq!(unsafe { storage.slot_ptr(index).read() }, index as u64);
        }

        storage.relocate(0);
        assert_eq!(storage.capacity(), 0);
    }

    #[test]
    fn drop_range_runs_destructors() {
        use std::rc::Rc;

        let tracker = Rc::new(());
        let mut storage = SlotStorage::<Rc<()>>::new();
        storage.relocate(3);

        for index in 0..3 {
            unsafe { storage.write(index, Rc::clone(&tracker)) };
        }

        assert_eq!(Rc::strong_count(&tracker), 4);

        unsafe { storage.drop_range(0, 2) };
        assert_eq!(Rc::strong_count(&tracker), 2);

        unsafe { storage.drop_range(2, 1) };
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn poison_fills_bytes() {
        let mut storage = SlotStorage::<u64>::new();
        storage.relocate(2);

        storage.poison(0, 2);

        assert_eq!(unsafe { storage.slot_ptr(1).read() }, 0xCCCC_CCCC_CCCC_CCCC);
    }
}
