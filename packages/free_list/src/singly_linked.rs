use crate::linkage::search_forward;
use crate::{FreeLinks, FreeSlot, Linkage, LinkagePrivate};

/// Free-slot strategy whose headers store only `{size, next}`.
///
/// Neighbors of an erased range are found by walking forward from the first free slot. The
/// walk is bounded by the number of free slots, not by capacity. Headers are one word smaller
/// than with [`DoublyLinked`][crate::DoublyLinked], so elements of 8 bytes (e.g. `u64` or a
/// pair of `f32`) can be stored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SinglyLinked;

impl Linkage for SinglyLinked {
    const HEADER_BYTES: usize = FreeSlot::header_bytes(false);
}

impl LinkagePrivate for SinglyLinked {
    const TRACKS_PREV: bool = false;

    fn find_adjacent(links: FreeLinks<'_>, index: usize) -> (Option<usize>, Option<usize>) {
        search_forward(links, index)
    }

    fn predecessor(links: FreeLinks<'_>, slot: usize) -> Option<usize> {
        let mut current = links.first()?;

        if current == slot {
            return None;
        }

        while let Some(next) = links.next(current) {
            if next == slot {
                return Some(current);
            }

            current = next;
        }

        panic!("free slot {slot} is not part of the free list");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::test_support::FakeBlock;

    #[test]
    fn empty_free_list_has_no_neighbors() {
        let mut block = FakeBlock::new(8, &[], false);

        assert_eq!(SinglyLinked::find_adjacent(block.links(), 3), (None, None));
    }

    #[test]
    fn index_before_first_free_slot() {
        let mut block = FakeBlock::new(10, &[(4, 2), (8, 1)], false);

        assert_eq!(SinglyLinked::find_adjacent(block.links(), 1), (None, Some(4)));
    }

    #[test]
    fn index_between_free_slots() {
        let mut block = FakeBlock::new(40, &[(0, 1), (4, 1), (10, 2), (30, 1), (38, 2)], false);

        assert_eq!(
            SinglyLinked::find_adjacent(block.links(), 33),
            (Some(30), Some(38))
        );
        assert_eq!(
            SinglyLinked::find_adjacent(block.links(), 2),
            (Some(0), Some(4))
        );
    }

    #[test]
    fn index_after_last_free_slot() {
        let mut block = FakeBlock::new(10, &[(1, 2), (5, 1)], false);

        assert_eq!(SinglyLinked::find_adjacent(block.links(), 8), (Some(5), None));
    }

    #[test]
    fn predecessor_walks_forward() {
        let mut block = FakeBlock::new(20, &[(2, 1), (6, 3), (15, 1)], false);

        assert_eq!(SinglyLinked::predecessor(block.links(), 15), Some(6));
        assert_eq!(SinglyLinked::predecessor(block.links(), 6), Some(2));
        assert_eq!(SinglyLinked::predecessor(block.links(), 2), None);
    }

    #[test]
    #[should_panic]
    fn predecessor_of_unknown_slot_panics() {
        let mut block = FakeBlock::new(20, &[(2, 1), (6, 3)], false);

        _ = SinglyLinked::predecessor(block.links(), 12);
    }

    #[test]
    fn header_is_two_words() {
        assert_eq!(SinglyLinked::HEADER_BYTES, 8);
    }
}
