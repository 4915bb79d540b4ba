//! Free-slot bookkeeping for transition-array construction.
//!
//! Free slots form an index-based doubly linked list kept beside the output
//! arrays, so nothing has to be scrubbed out of `base`/`check` afterwards.
//! Slots `[0, code_limit)` are never handed out: the root lives at 0 and no
//! child may land where a zero base would probe.

use tracing::debug;

const NIL: u32 = u32::MAX;

/// Finds collision-free base offsets for sibling code sets.
#[derive(Debug)]
pub struct NodeAllocator {
    code_limit: u32,
    next: Vec<u32>,
    prev: Vec<u32>,
    taken: Vec<bool>,
    head: u32,
    last: u32,
}

impl NodeAllocator {
    /// Create an allocator over at least `capacity` slots.
    pub fn new(capacity: usize, code_limit: u32) -> Self {
        let reserved = code_limit as usize;
        let mut alloc = Self {
            code_limit,
            next: vec![NIL; reserved],
            prev: vec![NIL; reserved],
            taken: vec![true; reserved],
            head: NIL,
            last: NIL,
        };
        alloc.grow(capacity.max(reserved * 2 + 1));
        alloc
    }

    /// Current number of slots, free or taken.
    #[inline]
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    /// Whether the slot at `index` has been handed out or is reserved.
    #[inline]
    pub fn is_taken(&self, index: usize) -> bool {
        self.taken[index]
    }

    /// Reserve slots `x + c` for every `c` in `children` and return `x`.
    ///
    /// Candidates are tried in free-list order, anchored on the first code,
    /// so the slot for `children[0]` is known free without probing. An
    /// accepted offset is final.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty or holds a code `>= code_limit`.
    pub fn allocate(&mut self, children: &[u32]) -> u32 {
        let first = children[0];
        debug_assert!(children.iter().all(|&c| c < self.code_limit));

        let mut cur = self.head;
        loop {
            if cur == NIL {
                let old = self.len();
                self.grow(old + old / 2 + self.code_limit as usize);
                cur = old as u32;
            }
            let x = cur - first;
            let reach = x as usize + self.code_limit as usize;
            if reach > self.len() {
                self.grow(reach + reach / 2);
            }
            if children[1..].iter().all(|&c| !self.taken[(x + c) as usize]) {
                for &c in children {
                    self.unlink(x + c);
                }
                return x;
            }
            cur = self.next[cur as usize];
        }
    }

    fn unlink(&mut self, index: u32) {
        let i = index as usize;
        debug_assert!(!self.taken[i]);
        let (p, n) = (self.prev[i], self.next[i]);
        if p == NIL {
            self.head = n;
        } else {
            self.next[p as usize] = n;
        }
        if n == NIL {
            self.last = p;
        } else {
            self.prev[n as usize] = p;
        }
        self.taken[i] = true;
    }

    /// Append free slots up to `new_len` at the tail of the list.
    fn grow(&mut self, new_len: usize) {
        let old = self.len();
        if new_len <= old {
            return;
        }
        debug!(from = old, to = new_len, "growing node arena");
        self.next.resize(new_len, NIL);
        self.prev.resize(new_len, NIL);
        self.taken.resize(new_len, false);
        for i in old..new_len {
            let idx = i as u32;
            self.prev[i] = self.last;
            if self.last == NIL {
                self.head = idx;
            } else {
                self.next[self.last as usize] = idx;
            }
            self.last = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_count(alloc: &NodeAllocator) -> usize {
        let mut n = 0;
        let mut cur = alloc.head;
        while cur != NIL {
            n += 1;
            cur = alloc.next[cur as usize];
        }
        n
    }

    #[test]
    fn test_reserved_region_never_allocated() {
        let mut alloc = NodeAllocator::new(64, 8);
        for _ in 0..20 {
            let x = alloc.allocate(&[3, 0, 7]);
            assert!(x >= 1);
            for c in [3, 0, 7] {
                assert!((x + c) as usize >= 8, "slot {} is reserved", x + c);
            }
        }
    }

    #[test]
    fn test_no_overlap() {
        let mut alloc = NodeAllocator::new(32, 4);
        let mut claimed = std::collections::HashSet::new();
        let sets: [&[u32]; 5] = [&[0, 1, 2, 3], &[1, 3], &[2], &[0, 2], &[3, 1, 0]];
        for _ in 0..10 {
            for set in sets {
                let x = alloc.allocate(set);
                for &c in set {
                    assert!(claimed.insert(x + c), "slot {} handed out twice", x + c);
                    assert!(alloc.is_taken((x + c) as usize));
                }
            }
        }
    }

    #[test]
    fn test_grows_on_exhaustion() {
        let mut alloc = NodeAllocator::new(1, 2);
        let start = alloc.len();
        for _ in 0..100 {
            alloc.allocate(&[0, 1]);
        }
        assert!(alloc.len() > start);
        let taken = alloc.taken.iter().filter(|&&t| t).count();
        assert_eq!(taken, 2 + 200);
        assert_eq!(free_count(&alloc), alloc.len() - taken);
    }

    #[test]
    fn test_dense_packing() {
        let mut alloc = NodeAllocator::new(16, 1);
        // With a single code every free slot is a valid anchor.
        let xs: Vec<u32> = (0..5).map(|_| alloc.allocate(&[0])).collect();
        assert_eq!(xs, vec![1, 2, 3, 4, 5]);
    }
}
