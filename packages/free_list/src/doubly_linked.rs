use crate::linkage::search_forward;
use crate::{FreeLinks, FreeSlot, Linkage, LinkagePrivate};

/// Free-slot strategy whose headers store `{size, next, prev}`.
///
/// Neighbors of an erased range are found by walking from whichever end of the free list is
/// closer to the range, and the free-list predecessor of any free slot is known directly. The
/// price is one extra 32-bit word per free slot, which raises the minimum element size to
/// 12 bytes.
///
/// This is the default strategy of [`FreeList`][crate::FreeList].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DoublyLinked;

impl Linkage for DoublyLinked {
    const HEADER_BYTES: usize = FreeSlot::header_bytes(true);
}

impl LinkagePrivate for DoublyLinked {
    const TRACKS_PREV: bool = true;

    fn find_adjacent(links: FreeLinks<'_>, index: usize) -> (Option<usize>, Option<usize>) {
        let (Some(first), Some(last)) = (links.first(), links.last()) else {
            return (None, None);
        };

        if index < first {
            return (None, Some(first));
        }

        if index > last {
            return (Some(last), None);
        }

        // Both subtractions are guarded by the range checks above.
        if index.wrapping_sub(first) <= last.wrapping_sub(index) {
            return search_forward(links, index);
        }

        let mut current = last;

        while let Some(prev) = links.prev(current) {
            if prev < index {
                return (Some(prev), Some(current));
            }

            current = prev;
        }

        (None, Some(current))
    }

    fn predecessor(links: FreeLinks<'_>, slot: usize) -> Option<usize> {
        links.prev(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::test_support::FakeBlock;

    #[test]
    fn empty_free_list_has_no_neighbors() {
        let mut block = FakeBlock::new(8, &[], true);

        assert_eq!(DoublyLinked::find_adjacent(block.links(), 3), (None, None));
    }

    #[test]
    fn index_before_first_free_slot() {
        let mut block = FakeBlock::new(10, &[(4, 2), (8, 1)], true);

        assert_eq!(DoublyLinked::find_adjacent(block.links(), 1), (None, Some(4)));
    }

    #[test]
    fn index_after_last_free_slot() {
        let mut block = FakeBlock::new(10, &[(1, 2), (5, 1)], true);

        assert_eq!(DoublyLinked::find_adjacent(block.links(), 8), (Some(5), None));
    }

    #[test]
    fn index_near_start_walks_forward() {
        let mut block = FakeBlock::new(40, &[(0, 1), (4, 1), (10, 2), (30, 1), (38, 2)], true);

        assert_eq!(
            DoublyLinked::find_adjacent(block.links(), 6),
            (Some(4), Some(10))
        );
    }

    #[test]
    fn index_near_end_walks_backward() {
        let mut block = FakeBlock::new(40, &[(0, 1), (4, 1), (10, 2), (30, 1), (38, 2)], true);

        assert_eq!(
            DoublyLinked::find_adjacent(block.links(), 33),
            (Some(30), Some(38))
        );
        assert_eq!(
            DoublyLinked::find_adjacent(block.links(), 20),
            (Some(10), Some(30))
        );
    }

    #[test]
    fn predecessor_follows_back_link() {
        let mut block = FakeBlock::new(20, &[(2, 1), (6, 3), (15, 1)], true);

        assert_eq!(DoublyLinked::predecessor(block.links(), 15), Some(6));
        assert_eq!(DoublyLinked::predecessor(block.links(), 2), None);
    }

    #[test]
    fn header_is_three_words() {
        assert_eq!(DoublyLinked::HEADER_BYTES, 12);
    }
}
