//! Indexed binary max-heap over arcs keyed by tie-point lambda.

use std::cmp::Ordering;

const NO_SLOT: usize = usize::MAX;

/// Max-heap of `(arc, key)` entries with a reverse index, so any entry can
/// be re-keyed or removed in O(log n). Keys are ordered by `f64::total_cmp`,
/// which floats NaN keys to the top where the caller's iteration guard can
/// catch them instead of corrupting the heap order.
#[derive(Debug, Clone)]
pub(crate) struct ArcHeap {
    /// Heap-ordered `(arc, key)` entries.
    entries: Vec<(usize, f64)>,
    /// Position of each arc in `entries`, or `NO_SLOT` when absent.
    slot: Vec<usize>,
}

impl ArcHeap {
    /// Creates an empty heap able to hold arcs `0..arc_count`.
    pub fn with_capacity(arc_count: usize) -> Self {
        Self {
            entries: Vec::new(),
            slot: vec![NO_SLOT; arc_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, arc: usize) -> bool {
        self.slot[arc] != NO_SLOT
    }

    /// Inserts an arc.
    ///
    /// # Panics
    ///
    /// Panics if the arc is already present.
    pub fn push(&mut self, arc: usize, key: f64) {
        assert!(!self.contains(arc), "arc {arc} is already on the heap");
        let position = self.entries.len();
        self.entries.push((arc, key));
        self.slot[arc] = position;
        self.sift_up(position);
    }

    /// Removes and returns the entry with the largest key.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        if self.entries.is_empty() {
            return None;
        }
        let top = self.entries[0];
        self.slot[top.0] = NO_SLOT;
        if let Some(last) = self.entries.pop() {
            if !self.entries.is_empty() {
                self.entries[0] = last;
                self.slot[last.0] = 0;
                self.sift_down(0);
            }
        }
        Some(top)
    }

    /// Removes an arbitrary arc.
    pub fn remove(&mut self, arc: usize) {
        let position = self.slot[arc];
        assert!(position != NO_SLOT, "arc {arc} is not on the heap");
        self.slot[arc] = NO_SLOT;
        let last = self.entries.len() - 1;
        if position != last {
            self.entries.swap(position, last);
            let moved = self.entries[position].0;
            self.slot[moved] = position;
        }
        self.entries.pop();
        if position < self.entries.len() {
            self.sift_down(position);
            self.sift_up(position);
        }
    }

    /// Changes the key of an arc already on the heap.
    pub fn update(&mut self, arc: usize, key: f64) {
        let position = self.slot[arc];
        assert!(position != NO_SLOT, "arc {arc} is not on the heap");
        self.entries[position].1 = key;
        self.sift_down(position);
        self.sift_up(self.slot[arc]);
    }

    fn greater(a: f64, b: f64) -> bool {
        a.total_cmp(&b) == Ordering::Greater
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !Self::greater(self.entries[position].1, self.entries[parent].1) {
                break;
            }
            self.entries.swap(position, parent);
            self.slot[self.entries[position].0] = position;
            self.slot[self.entries[parent].0] = parent;
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            if left >= self.entries.len() {
                break;
            }
            let right = left + 1;
            let mut largest = left;
            if right < self.entries.len()
                && Self::greater(self.entries[right].1, self.entries[left].1)
            {
                largest = right;
            }
            if !Self::greater(self.entries[largest].1, self.entries[position].1) {
                break;
            }
            self.entries.swap(position, largest);
            self.slot[self.entries[position].0] = position;
            self.slot[self.entries[largest].0] = largest;
            position = largest;
        }
    }
}
