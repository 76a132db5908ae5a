//! Array-backed binary min-heap with a key to position index.
//!
//! The position map is what makes `remove` by key O(log n): every swap the
//! heap performs also rewrites the map entries of both swapped elements, so
//! an arbitrary element can be located without a scan.

use std::collections::HashMap;
use std::hash::Hash;

use crate::errors::HeapError;

/// Something that can be queued in a [`PriorityIndex`].
pub trait Prioritized {
    type Key: Copy + Eq + Hash;
    type Priority: Ord;

    /// Identity of the element. Must not change while the element is queued.
    fn key(&self) -> Self::Key;

    /// Lower values are extracted first.
    fn priority(&self) -> Self::Priority;
}

pub struct PriorityIndex<T: Prioritized> {
    heap: Vec<T>,
    capacity: usize,
    positions: HashMap<T::Key, usize>,
}

impl<T: Prioritized> PriorityIndex<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            capacity,
            positions: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// The element with the lowest priority, if any.
    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.positions.contains_key(key)
    }

    /// Current array slot of `key`.
    pub fn position_of(&self, key: &T::Key) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.position_of(key).map(|index| &self.heap[index])
    }

    /// Elements in array order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.heap.iter()
    }

    /// Queues `item`. Nothing is mutated when the index is full or the key
    /// is already queued.
    pub fn insert(&mut self, item: T) -> Result<(), HeapError> {
        if self.is_full() {
            return Err(HeapError::Full {
                capacity: self.capacity,
            });
        }
        let key = item.key();
        if self.positions.contains_key(&key) {
            return Err(HeapError::DuplicateKey);
        }

        let index = self.heap.len();
        self.heap.push(item);
        self.positions.insert(key, index);
        self.sift_up(index);
        Ok(())
    }

    /// Removes and returns the element with the lowest priority. An empty
    /// index yields `None`.
    pub fn extract_min(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let min = self.heap.pop()?;
        self.positions.remove(&min.key());
        self.sift_down(0);
        Some(min)
    }

    /// Removes the element queued under `key`; `None` if it isn't queued.
    ///
    /// The element is first carried to the root as if its priority were
    /// below every real priority, then extracted as the minimum.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let index = self.position_of(key)?;
        self.float_to_root(index);
        self.extract_min()
    }

    /// Applies `modifier` to the element queued under `key` and restores heap
    /// order around it. Returns `false` if the key isn't queued.
    ///
    /// `modifier` may change the priority but not the key.
    pub fn modify<F>(&mut self, key: &T::Key, modifier: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(index) = self.position_of(key) else {
            return false;
        };

        modifier(&mut self.heap[index]);
        debug_assert!(self.heap[index].key() == *key);

        let index = self.sift_up(index);
        self.sift_down(index);
        true
    }

    /// Verifies heap order and that every map entry points at its element.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.heap.len() > self.capacity {
            return Err(format!(
                "{} elements exceed capacity {}",
                self.heap.len(),
                self.capacity
            ));
        }
        if self.positions.len() != self.heap.len() {
            return Err(format!(
                "position map holds {} keys for {} elements",
                self.positions.len(),
                self.heap.len()
            ));
        }

        for (index, item) in self.heap.iter().enumerate() {
            match self.positions.get(&item.key()) {
                Some(&mapped) if mapped == index => {}
                Some(&mapped) => {
                    return Err(format!("slot {index} is mapped to slot {mapped}"));
                }
                None => return Err(format!("slot {index} has no map entry")),
            }
            if index > 0 && item.priority() < self.heap[parent(index)].priority() {
                return Err(format!("slot {index} is lower than its parent"));
            }
        }
        Ok(())
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].key(), a);
        self.positions.insert(self.heap[b].key(), b);
    }

    /// Returns the slot the element settled in.
    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = parent(index);
            if self.heap[index].priority() >= self.heap[parent].priority() {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn float_to_root(&mut self, mut index: usize) {
        while index > 0 {
            let parent = parent(index);
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            if left >= len {
                break;
            }

            // left wins ties
            let mut child = left;
            if right < len && self.heap[right].priority() < self.heap[left].priority() {
                child = right;
            }
            if self.heap[child].priority() >= self.heap[index].priority() {
                break;
            }
            self.swap(index, child);
            index = child;
        }
    }
}

fn parent(index: usize) -> usize {
    (index - 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ride::Ride;

    fn filled(rides: &[(i64, i64, i64)]) -> PriorityIndex<Ride> {
        let mut heap = PriorityIndex::with_capacity(64);
        for &(id, cost, duration) in rides {
            heap.insert(Ride::new(id, cost, duration)).unwrap();
        }
        heap
    }

    fn drain_ids(heap: &mut PriorityIndex<Ride>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(ride) = heap.extract_min() {
            heap.check_invariants().unwrap();
            ids.push(ride.ride_id);
        }
        ids
    }

    #[test]
    fn test_extract_min_orders_by_cost_then_duration() {
        let mut heap = filled(&[(1, 10, 5), (2, 5, 8), (3, 5, 3), (4, 1, 100)]);
        heap.check_invariants().unwrap();

        assert_eq!(heap.peek(), Some(&Ride::new(4, 1, 100)));
        assert_eq!(drain_ids(&mut heap), vec![4, 3, 2, 1]);
        assert_eq!(heap.extract_min(), None);
    }

    #[test]
    fn test_insert_full() {
        let mut heap = PriorityIndex::with_capacity(2);
        heap.insert(Ride::new(1, 1, 1)).unwrap();
        heap.insert(Ride::new(2, 2, 2)).unwrap();

        let result = heap.insert(Ride::new(3, 0, 0));
        assert_eq!(result, Err(HeapError::Full { capacity: 2 }));
        assert_eq!(heap.len(), 2);
        assert!(!heap.contains_key(&3));
        assert_eq!(heap.peek(), Some(&Ride::new(1, 1, 1)));
    }

    #[test]
    fn test_insert_duplicate_key() {
        let mut heap = filled(&[(1, 4, 4)]);
        assert_eq!(heap.insert(Ride::new(1, 0, 0)), Err(HeapError::DuplicateKey));
        assert_eq!(heap.get(&1), Some(&Ride::new(1, 4, 4)));
    }

    #[test]
    fn test_remove_root_inner_and_leaf() {
        let mut heap = filled(&[
            (1, 1, 1),
            (2, 2, 2),
            (3, 3, 3),
            (4, 4, 4),
            (5, 5, 5),
            (6, 6, 6),
            (7, 7, 7),
        ]);

        assert_eq!(heap.remove(&2), Some(Ride::new(2, 2, 2)));
        heap.check_invariants().unwrap();
        assert_eq!(heap.remove(&7), Some(Ride::new(7, 7, 7)));
        heap.check_invariants().unwrap();
        assert_eq!(heap.remove(&1), Some(Ride::new(1, 1, 1)));
        heap.check_invariants().unwrap();

        assert_eq!(drain_ids(&mut heap), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_remove_absent_key() {
        let mut heap = filled(&[(1, 1, 1), (2, 2, 2)]);
        assert_eq!(heap.remove(&9), None);
        assert_eq!(heap.len(), 2);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_keeps_equal_priorities() {
        let mut heap = filled(&[(1, 5, 5), (2, 5, 5), (3, 5, 5), (4, 5, 5)]);
        assert!(heap.remove(&3).is_some());
        heap.check_invariants().unwrap();

        let mut ids = drain_ids(&mut heap);
        ids.sort();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_positions_follow_swaps() {
        let heap = filled(&[(1, 9, 0), (2, 8, 0), (3, 7, 0)]);
        assert_eq!(heap.position_of(&3), Some(0));
        assert_eq!(heap.get(&1), Some(&Ride::new(1, 9, 0)));
        for ride in heap.iter() {
            assert_eq!(heap.get(&ride.ride_id), Some(ride));
        }
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_modify_decrease_and_increase() {
        let mut heap = filled(&[(1, 10, 10), (2, 20, 20), (3, 30, 30), (4, 40, 40)]);

        assert!(heap.modify(&4, |ride| ride.cost = 5));
        heap.check_invariants().unwrap();
        assert_eq!(heap.peek().map(|ride| ride.ride_id), Some(4));

        assert!(heap.modify(&4, |ride| ride.cost = 50));
        heap.check_invariants().unwrap();
        assert_eq!(drain_ids(&mut heap), vec![1, 2, 3, 4]);

        assert!(!heap.modify(&4, |ride| ride.cost = 0));
    }

    #[test]
    fn test_sift_down_prefers_left_on_ties() {
        let mut heap = filled(&[(1, 1, 1), (2, 5, 5), (3, 5, 5), (4, 9, 9)]);
        heap.extract_min();
        assert_eq!(heap.peek().map(|ride| ride.ride_id), Some(2));
        assert_eq!(heap.position_of(&4), Some(1));
        assert_eq!(heap.position_of(&3), Some(2));
    }
}
