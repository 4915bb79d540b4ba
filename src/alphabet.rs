//! Frequency-ordered remapping of UTF-16 code units to transition codes.
//!
//! Only branching transitions are counted: a unit that never distinguishes
//! two siblings does not need a slot in any allocation, so every such unit
//! collapses onto one shared code. This keeps `code_limit` (and the reserved
//! prefix of the node arrays) as small as the key set allows.

use std::ops::Range;

use smallvec::SmallVec;

/// Raw code of "key exhausted". Code unit `u` has raw code `u + 1`.
pub const TERMINAL: usize = 0;

/// Number of raw codes: the terminal plus every UTF-16 code unit.
pub const RAW_CODES: usize = 0x10001;

/// Raw code of the unit at `depth`, or [`TERMINAL`] past the end.
#[inline]
pub(crate) fn raw_code(key: &[u16], depth: usize) -> usize {
    key.get(depth).map_or(TERMINAL, |&u| u as usize + 1)
}

/// Sibling runs inside one sorted key range.
pub(crate) type Groups = SmallVec<[(usize, Range<usize>); 8]>;

/// Split `range` into maximal runs sharing the raw code at `depth`.
///
/// Sorted input guarantees each raw code forms exactly one run.
pub(crate) fn partition(keys: &[Vec<u16>], range: Range<usize>, depth: usize) -> Groups {
    let mut groups = Groups::new();
    let mut beg = range.start;
    while beg < range.end {
        let raw = raw_code(&keys[beg], depth);
        let mut end = beg + 1;
        while end < range.end && raw_code(&keys[end], depth) == raw {
            end += 1;
        }
        groups.push((raw, beg..end));
        beg = end;
    }
    groups
}

/// Dense transition-code table built from branching frequencies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeAlphabet {
    codes: Vec<u32>,
    code_limit: u32,
    node_estimate: usize,
}

impl CodeAlphabet {
    /// Walk the trie shape implied by `keys` and derive the code table.
    ///
    /// `keys` must be sorted and unique.
    pub fn analyze(keys: &[Vec<u16>]) -> Self {
        let mut freq = vec![0u64; RAW_CODES];
        // Root plus one node per branching transition.
        let mut nodes = 1usize;

        let mut stack: Vec<(Range<usize>, usize)> = Vec::new();
        if keys.len() > 1 {
            stack.push((0..keys.len(), 0));
        }
        while let Some((range, depth)) = stack.pop() {
            for (raw, sub) in partition(keys, range, depth) {
                freq[raw] += 1;
                nodes += 1;
                if sub.len() > 1 {
                    stack.push((sub, depth + 1));
                }
            }
        }

        let mut order: Vec<usize> = (0..RAW_CODES).collect();
        order.sort_by(|&a, &b| freq[b].cmp(&freq[a]));

        let used = order.iter().take_while(|&&raw| freq[raw] != 0).count();
        let code_limit = used as u32 + 1;
        let mut codes = vec![code_limit - 1; RAW_CODES];
        for (rank, &raw) in order[..used].iter().enumerate() {
            codes[raw] = rank as u32;
        }

        Self {
            codes,
            code_limit,
            node_estimate: nodes,
        }
    }

    /// Rebuild from a persisted table.
    pub(crate) fn from_codes(codes: Vec<u32>) -> Self {
        let code_limit = codes.iter().copied().max().map_or(1, |m| m + 1);
        Self {
            codes,
            code_limit,
            node_estimate: 0,
        }
    }

    /// Transition code for a raw code.
    #[inline]
    pub fn code(&self, raw: usize) -> u32 {
        self.codes[raw]
    }

    /// Transition code for a UTF-16 code unit.
    #[inline]
    pub fn unit(&self, unit: u16) -> u32 {
        self.codes[unit as usize + 1]
    }

    /// Transition code of the terminal.
    #[inline]
    pub fn terminal(&self) -> u32 {
        self.codes[TERMINAL]
    }

    /// One past the largest transition code.
    pub fn code_limit(&self) -> u32 {
        self.code_limit
    }

    /// Number of trie nodes implied by the analyzed key set.
    pub fn node_estimate(&self) -> usize {
        self.node_estimate
    }

    pub(crate) fn codes(&self) -> &[u32] {
        &self.codes
    }
}
