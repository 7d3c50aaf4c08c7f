use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{FreeList, Linkage};

/// Default number of slots added to a free list whenever it grows.
pub(crate) const DEFAULT_CAPACITY_INCREMENTS: NonZero<usize> = NonZero::new(10).unwrap();

/// Default value of the advisory [resize threshold][FreeListBuilder::resize_threshold].
pub(crate) const DEFAULT_RESIZE_THRESHOLD: f32 = 1.1;

/// Determines when a [`FreeList`] verifies its own structure.
///
/// The check walks the whole free list and the whole occupancy map, so it is `O(capacity)`
/// per mutation. It exists to catch bugs in the free list itself, not in callers - callers
/// are protected by the bounds and occupancy checks that every safe operation performs
/// regardless of this setting.
///
/// # Examples
///
/// ```
/// use free_list::{FreeList, IntegrityChecks};
///
/// let list = FreeList::<u128>::builder()
///     .integrity_checks(IntegrityChecks::Always)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum IntegrityChecks {
    /// Verify after every mutation in builds with debug assertions enabled. This is the default.
    #[default]
    DebugOnly,

    /// Verify after every mutation in every build.
    Always,

    /// Never verify automatically. [`FreeList::integrity_check()`] can still be called explicitly.
    Never,
}

impl IntegrityChecks {
    pub(crate) fn enabled(self) -> bool {
        match self {
            Self::DebugOnly => cfg!(debug_assertions),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Builder for creating an instance of [`FreeList`].
///
/// You only need to use this builder if you want to customize the configuration. The defaults
/// used by [`FreeList::new()`] grow the list in steps of 10 slots and allocate nothing until
/// the first insertion.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use free_list::{FreeList, SinglyLinked};
///
/// let list = FreeList::<u64, SinglyLinked>::builder()
///     .capacity_increments(NonZero::new(256).unwrap())
///     .initial_capacity(1024)
///     .build();
///
/// assert_eq!(list.capacity(), 1024);
/// ```
#[must_use]
pub struct FreeListBuilder<T, L: Linkage> {
    capacity_increments: NonZero<usize>,
    initial_capacity: usize,
    resize_threshold: f32,
    integrity_checks: IntegrityChecks,

    _list: PhantomData<fn() -> FreeList<T, L>>,
}

impl<T, L: Linkage> fmt::Debug for FreeListBuilder<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeListBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("linkage", &format_args!("{}", type_name::<L>()))
            .field("capacity_increments", &self.capacity_increments)
            .field("initial_capacity", &self.initial_capacity)
            .field("resize_threshold", &self.resize_threshold)
            .field("integrity_checks", &self.integrity_checks)
            .finish()
    }
}

impl<T, L: Linkage> FreeListBuilder<T, L> {
    pub(crate) fn new() -> Self {
        Self {
            capacity_increments: DEFAULT_CAPACITY_INCREMENTS,
            initial_capacity: 0,
            resize_threshold: DEFAULT_RESIZE_THRESHOLD,
            integrity_checks: IntegrityChecks::default(),
            _list: PhantomData,
        }
    }

    /// Sets the granularity of growth: whenever the free list has to grow, it grows by the
    /// smallest multiple of this many slots that satisfies the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use free_list::FreeList;
    ///
    /// let mut list = FreeList::<u128>::builder()
    ///     .capacity_increments(NonZero::new(5).unwrap())
    ///     .build();
    ///
    /// list.push(1);
    /// assert_eq!(list.capacity(), 5);
    /// ```
    pub fn capacity_increments(mut self, increments: NonZero<usize>) -> Self {
        self.capacity_increments = increments;
        self
    }

    /// Sets the number of slots to allocate when the free list is built.
    ///
    /// Unlike growth, the initial capacity is not rounded to the capacity increments.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the resize threshold.
    ///
    /// The threshold is the fraction of one capacity increment by which a free list would
    /// have to be oversized before it is worth shrinking. The free list never shrinks
    /// automatically today, so the value is only stored and reported back via
    /// [`FreeList::resize_threshold()`].
    ///
    /// # Panics
    ///
    /// Panics if the threshold is negative, infinite or NaN.
    pub fn resize_threshold(mut self, threshold: f32) -> Self {
        assert!(
            threshold.is_finite() && threshold >= 0.0,
            "resize threshold must be a finite non-negative number, got {threshold}"
        );

        self.resize_threshold = threshold;
        self
    }

    /// Sets when the free list verifies its own structure.
    pub fn integrity_checks(mut self, checks: IntegrityChecks) -> Self {
        self.integrity_checks = checks;
        self
    }

    /// Builds the free list with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the initial capacity exceeds [`MAX_CAPACITY`][crate::MAX_CAPACITY].
    #[must_use]
    pub fn build(self) -> FreeList<T, L> {
        FreeList::new_inner(
            self.capacity_increments,
            self.initial_capacity,
            self.resize_threshold,
            self.integrity_checks,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DoublyLinked, SinglyLinked};

    #[test]
    fn defaults() {
        let list = FreeListBuilder::<u128, DoublyLinked>::new().build();

        assert_eq!(list.capacity(), 0);
        assert_eq!(list.capacity_increments(), DEFAULT_CAPACITY_INCREMENTS);
        assert!((list.resize_threshold() - DEFAULT_RESIZE_THRESHOLD).abs() < f32::EPSILON);
    }

    #[test]
    fn initial_capacity_is_exact() {
        let list = FreeListBuilder::<u64, SinglyLinked>::new()
            .capacity_increments(NonZero::new(8).unwrap())
            .initial_capacity(3)
            .build();

        assert_eq!(list.capacity(), 3);
        assert_eq!(list.first_free_slot(), Some(0));
        assert_eq!(list.last_free_slot(), Some(0));
    }

    #[test]
    #[should_panic]
    fn negative_threshold_panics() {
        _ = FreeListBuilder::<u128, DoublyLinked>::new().resize_threshold(-1.0);
    }

    #[test]
    #[should_panic]
    fn nan_threshold_panics() {
        _ = FreeListBuilder::<u128, DoublyLinked>::new().resize_threshold(f32::NAN);
    }

    #[test]
    fn debug_output_names_types() {
        let builder = FreeListBuilder::<u128, SinglyLinked>::new();
        let output = format!("{builder:?}");

        assert!(output.contains("u128"));
        assert!(output.contains("SinglyLinked"));
    }

    #[test]
    fn integrity_check_modes() {
        assert!(IntegrityChecks::Always.enabled());
        assert!(!IntegrityChecks::Never.enabled());
        assert_eq!(IntegrityChecks::DebugOnly.enabled(), cfg!(debug_assertions));
    }
}
