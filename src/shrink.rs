//! Tail deduplication.
//!
//! Sorting leaf suffixes by their reversed text puts every suffix right after
//! the longest suffix that ends with it, so one linear pass can point the
//! shorter one into the longer one's bytes instead of copying it.

use std::cmp::Ordering;
use std::ops::Range;

use crate::trie::Slot;

/// Rewrites leaf tail offsets so shared trailing runs are stored once.
pub struct TailShrinker<'a> {
    tail: &'a [u16],
    pairs: Vec<(u32, Range<usize>)>,
}

impl<'a> TailShrinker<'a> {
    /// Collect `(leaf node, suffix)` pairs in node order.
    pub fn new(base: &[i32], tail: &'a [u16]) -> Self {
        let pairs = base
            .iter()
            .enumerate()
            .filter_map(|(node, &b)| match Slot::decode(b) {
                Slot::Leaf(offset) => {
                    let beg = offset as usize;
                    let len = tail[beg..].iter().position(|&u| u == 0).unwrap_or(tail.len() - beg);
                    Some((node as u32, beg..beg + len))
                }
                Slot::Branch(_) => None,
            })
            .collect();
        Self { tail, pairs }
    }

    /// Number of leaves collected.
    pub fn leaf_count(&self) -> usize {
        self.pairs.len()
    }

    /// Build the new tail and redirect every leaf in `base` into it.
    pub fn shrink(mut self, base: &mut [i32]) -> Vec<u16> {
        let tail = self.tail;
        self.pairs
            .sort_by(|a, b| reverse_order(&tail[a.1.clone()], &tail[b.1.clone()]));

        let mut out: Vec<u16> = vec![0, 0];
        let mut prev: Option<&[u16]> = None;
        for (node, range) in &self.pairs {
            let s = &tail[range.clone()];
            let offset = match prev {
                Some(p) if p.ends_with(s) => out.len() - (s.len() + 1),
                // Only happens when every suffix is empty.
                None if s.is_empty() => 1,
                _ => {
                    let offset = out.len();
                    out.extend_from_slice(s);
                    out.push(0);
                    offset
                }
            };
            base[*node as usize] = Slot::Leaf(offset as u32).encode();
            prev = Some(s);
        }
        out
    }
}

/// Descending by reversed text; a string sorts after every longer string
/// that ends with it.
fn reverse_order(a: &[u16], b: &[u16]) -> Ordering {
    b.iter().rev().cmp(a.iter().rev())
}
