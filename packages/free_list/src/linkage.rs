use std::fmt::Debug;

use crate::FreeLinks;

/// Strategy that decides how vacant slots of a [`FreeList`][crate::FreeList] are linked to
/// each other and how the free slots around an erased range are located.
///
/// The first-fit search, slot commit, growth and iteration logic is shared by all strategies.
/// The strategy only influences the size of the header stored in every free slot and the cost
/// of finding neighbors when a range is returned to the free list.
///
/// Two strategies are provided:
///
/// * [`DoublyLinked`] - headers carry a back link, so neighbors can be located by walking from
///   whichever end of the free list is closer. Requires elements of at least 12 bytes.
/// * [`SinglyLinked`] - headers carry only a forward link, so neighbors are located by walking
///   forward from the first free slot. Requires elements of at least 8 bytes.
///
/// This trait is sealed and cannot be implemented outside this crate.
#[expect(private_bounds, reason = "intentional - sealed trait")]
pub trait Linkage: LinkagePrivate + Clone + Copy + Debug + Default + Send + Sync + 'static {
    /// Number of bytes the free-slot header occupies. The element type of a free list
    /// must be at least this large.
    const HEADER_BYTES: usize;
}

/// The crate-internal half of a [`Linkage`] strategy. Also seals [`Linkage`].
pub(crate) trait LinkagePrivate {
    /// Whether free-slot headers carry a link to the previous free slot.
    const TRACKS_PREV: bool;

    /// Locates the free slots immediately before and after the slot at `index`, which
    /// must not itself lie inside a free slot.
    fn find_adjacent(links: FreeLinks<'_>, index: usize) -> (Option<usize>, Option<usize>);

    /// Locates the free slot that precedes the free slot `slot` in the free list.
    fn predecessor(links: FreeLinks<'_>, slot: usize) -> Option<usize>;
}

/// Walks forward from the first free slot to find the free slots around `index`.
///
/// Shared by both strategies: the singly-linked one always uses it, the doubly-linked one
/// uses it when `index` is closer to the start of the free list than to its end.
pub(crate) fn search_forward(links: FreeLinks<'_>, index: usize) -> (Option<usize>, Option<usize>) {
    let Some(first) = links.first() else {
        return (None, None);
    };

    if index < first {
        return (None, Some(first));
    }

    let mut current = first;

    while let Some(next) = links.next(current) {
        if next > index {
            return (Some(current), Some(next));
        }

        current = next;
    }

    (Some(current), None)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::ptr::NonNull;

    use crate::{FreeLinks, FreeSlot};

    /// A block of `u128` slots with hand-written free-slot headers, for exercising
    /// the strategies without going through a full free list.
    pub(crate) struct FakeBlock {
        slots: Vec<u128>,
        tracks_prev: bool,
        first: Option<usize>,
        last: Option<usize>,
    }

    impl FakeBlock {
        /// Builds a block of `capacity` slots where each `(start, size)` pair is a free slot.
        /// The pairs must be sorted and non-adjacent.
        pub(crate) fn new(capacity: usize, free: &[(usize, usize)], tracks_prev: bool) -> Self {
            let mut block = Self {
                slots: vec![0; capacity],
                tracks_prev,
                first: free.first().map(|&(start, _)| start),
                last: free.last().map(|&(start, _)| start),
            };

            for (position, &(start, size)) in free.iter().enumerate() {
                let header = FreeSlot {
                    size,
                    next: free.get(position + 1).map(|&(next, _)| next),
                    prev: position.checked_sub(1).map(|prev| free[prev].0),
                };

                let base = NonNull::new(block.slots.as_mut_ptr()).unwrap();

                // SAFETY: The slot is within the vector and u128 is larger than any header.
                unsafe {
                    header.write(base.add(start).cast(), tracks_prev);
                }
            }

            block
        }

        pub(crate) fn links(&mut self) -> FreeLinks<'_> {
            let base = NonNull::new(self.slots.as_mut_ptr()).unwrap().cast();

            // SAFETY: Every chained slot received a header in new().
            unsafe {
                FreeLinks::new(
                    base,
                    size_of::<u128>(),
                    self.tracks_prev,
                    self.first,
                    self.last,
                )
            }
        }
    }
}
