use thiserror::Error;

/// Errors reported by the fallible operations of a [`FreeList`][crate::FreeList].
///
/// The panicking counterparts of these operations (e.g. [`erase()`][crate::FreeList::erase]
/// for [`try_erase()`][crate::FreeList::try_erase]) panic with the [`Display`][std::fmt::Display]
/// text of the same error.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller referenced a slot range that extends past the end of the block.
    #[error(
        "slot range {start}..{end} is out of bounds for a free list of capacity {capacity}"
    )]
    OutOfBounds {
        /// First slot of the referenced range.
        start: usize,

        /// One past the last slot of the referenced range.
        end: usize,

        /// Capacity of the free list at the time of the call.
        capacity: usize,
    },

    /// The caller referenced a slot that does not hold a value.
    #[error("slot {index} is vacant")]
    Vacant {
        /// The first vacant slot found in the referenced range.
        index: usize,
    },

    /// Satisfying the request would require more slots than a free list can address.
    #[error("a capacity of {requested} slots exceeds the maximum of {max} slots")]
    CapacityOverflow {
        /// The capacity that would have been required.
        requested: usize,

        /// The maximum capacity of any free list.
        max: usize,
    },
}

/// A specialized `Result` type for free list operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug, Clone);

    #[test]
    fn out_of_bounds_message_names_range() {
        let error = Error::OutOfBounds {
            start: 3,
            end: 7,
            capacity: 5,
        };

        assert_eq!(
            error.to_string(),
            "slot range 3..7 is out of bounds for a free list of capacity 5"
        );
    }

    #[test]
    fn vacant_message_names_slot() {
        let error = Error::Vacant { index: 4 };

        assert_eq!(error.to_string(), "slot 4 is vacant");
    }
}
