use std::marker::PhantomData;
use std::ptr::NonNull;

/// Encodes "no link" in the `next` and `prev` words of a free-slot header.
const NO_LINK: u32 = u32::MAX;

const WORD_SIZE: usize = size_of::<u32>();

/// Decoded header of a free slot.
///
/// The header lives in the first bytes of the free slot itself, as two (`size`, `next`) or
/// three (`size`, `next`, `prev`) unaligned 32-bit words. Indices are slot indices, not byte
/// offsets, so headers survive relocation of the block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct FreeSlot {
    /// Number of consecutive vacant slots starting at this one.
    pub(crate) size: usize,

    /// The next free slot in index order.
    pub(crate) next: Option<usize>,

    /// The previous free slot in index order. Always `None` when read from a header
    /// that does not track back links.
    pub(crate) prev: Option<usize>,
}

impl FreeSlot {
    /// Number of bytes a header occupies.
    pub(crate) const fn header_bytes(tracks_prev: bool) -> usize {
        if tracks_prev {
            WORD_SIZE * 3
        } else {
            WORD_SIZE * 2
        }
    }

    /// # Safety
    ///
    /// `slot` must be valid for reads of [`header_bytes(tracks_prev)`][Self::header_bytes]
    /// bytes that were previously written by [`write()`][Self::write] with the same
    /// `tracks_prev` value.
    pub(crate) unsafe fn read(slot: NonNull<u8>, tracks_prev: bool) -> Self {
        let words = slot.cast::<u32>().as_ptr();

        // SAFETY: Forwarding guarantees from the caller. Headers are not aligned to u32
        // because the element type may have a smaller alignment.
        let (size, next) = unsafe { (words.read_unaligned(), words.add(1).read_unaligned()) };

        let prev = if tracks_prev {
            // SAFETY: Forwarding guarantees from the caller, who promised the third word exists.
            decode(unsafe { words.add(2).read_unaligned() })
        } else {
            None
        };

        Self {
            size: usize::try_from(size).expect("slot sizes always fit in usize"),
            next: decode(next),
            prev,
        }
    }

    /// # Safety
    ///
    /// `slot` must be valid for writes of [`header_bytes(tracks_prev)`][Self::header_bytes]
    /// bytes and must not currently hold a live element.
    pub(crate) unsafe fn write(self, slot: NonNull<u8>, tracks_prev: bool) {
        let words = slot.cast::<u32>().as_ptr();

        let size = u32::try_from(self.size).expect("capacity is bounded well below u32::MAX");

        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            words.write_unaligned(size);
            words.add(1).write_unaligned(encode(self.next));
        }

        if tracks_prev {
            // SAFETY: Forwarding guarantees from the caller, who promised the third word exists.
            unsafe {
                words.add(2).write_unaligned(encode(self.prev));
            }
        }
    }
}

fn encode(link: Option<usize>) -> u32 {
    link.map_or(NO_LINK, |index| {
        u32::try_from(index).expect("slot indices are bounded well below u32::MAX")
    })
}

fn decode(word: u32) -> Option<usize> {
    (word != NO_LINK).then(|| usize::try_from(word).expect("slot indices always fit in usize"))
}

/// Read-only view of the free list threaded through a block, handed to the
/// [`Linkage`][crate::Linkage] strategies so they can walk it without knowing the element type.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FreeLinks<'a> {
    base: NonNull<u8>,
    stride: usize,
    tracks_prev: bool,
    first: Option<usize>,
    last: Option<usize>,

    _block: PhantomData<&'a [u8]>,
}

impl FreeLinks<'_> {
    /// # Safety
    ///
    /// Every slot reachable from `first` through `next` links must start with a valid header
    /// written with the same `tracks_prev` value, at `base + slot * stride`, for the
    /// lifetime of the view.
    pub(crate) unsafe fn new(
        base: NonNull<u8>,
        stride: usize,
        tracks_prev: bool,
        first: Option<usize>,
        last: Option<usize>,
    ) -> Self {
        Self {
            base,
            stride,
            tracks_prev,
            first,
            last,
            _block: PhantomData,
        }
    }

    /// The lowest-indexed free slot.
    pub(crate) fn first(&self) -> Option<usize> {
        self.first
    }

    /// The highest-indexed free slot.
    pub(crate) fn last(&self) -> Option<usize> {
        self.last
    }

    /// Reads the header of a free slot that is part of the chain.
    pub(crate) fn get(&self, slot: usize) -> FreeSlot {
        // Cannot overflow because that would imply the block extends beyond virtual memory.
        let offset = slot.wrapping_mul(self.stride);

        // SAFETY: The constructor's caller guaranteed that every chained slot holds a valid
        // header within the block, and only chained slot indices are passed in here.
        unsafe { FreeSlot::read(self.base.byte_add(offset), self.tracks_prev) }
    }

    pub(crate) fn next(&self, slot: usize) -> Option<usize> {
        self.get(slot).next
    }

    pub(crate) fn prev(&self, slot: usize) -> Option<usize> {
        debug_assert!(
            self.tracks_prev,
            "prev() called on a free list whose headers carry no back links"
        );

        self.get(slot).prev
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
    fn header_round_trips_through_unaligned_bytes() {
        // Offset by one byte to force a misaligned header.
        let mut bytes = [0_u8; 13];
        let slot = unsafe { NonNull::new(bytes.as_mut_ptr()).unwrap().byte_add(1) };

        let header = FreeSlot {
            size: 7,
            next: Some(42),
            prev: None,
        };

        unsafe {
            header.write(slot, true);
            assert_eq!(FreeSlot::read(slot, true), header);
        }
    }

    #[test]
    fn two_word_header_drops_back_link() {
        let mut bytes = [0xCC_u8; 8];
        let slot = NonNull::new(bytes.as_mut_ptr()).unwrap();

        let header = FreeSlot {
            size: 3,
            next: None,
            prev: Some(1),
        };

        unsafe {
            header.write(slot, false);

            let read = FreeSlot::read(slot, false);
            assert_eq!(read.size, 3);
            assert_eq!(read.next, None);
            assert_eq!(read.prev, None);
        }
    }

    #[test]
    fn header_sizes() {
        assert_eq!(FreeSlot::header_bytes(true), 12);
        assert_eq!(FreeSlot::header_bytes(false), 8);
    }
}
