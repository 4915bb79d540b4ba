//! Fixed-size bit vector with a one-level rank directory.
//!
//! One cumulative count is kept per 32-bit block, so `rank` is a table lookup
//! plus a single masked popcount.

/// Number of positions covered by one block word.
pub const BLOCK_BITS: usize = 32;

/// Bit array answering "how many set bits precede position `i`" in O(1).
///
/// Bits are written with [`set`](Self::set), then
/// [`build_rank_index`](Self::build_rank_index) must be called exactly once
/// before any [`rank`](Self::rank) query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankBitVector {
    blocks: Vec<u32>,
    /// Entry i = popcount of blocks[0..i].
    rank_index: Vec<u32>,
}

impl RankBitVector {
    /// Create an all-zero vector able to hold positions `0..=len`.
    ///
    /// The extra slot lets `rank(len)` count every bit.
    pub fn new(len: usize) -> Self {
        Self {
            blocks: vec![0; len / BLOCK_BITS + 1],
            rank_index: Vec::new(),
        }
    }

    /// Set or clear the bit at `index`.
    #[inline]
    pub fn set(&mut self, index: usize, bit: bool) {
        let word = &mut self.blocks[index / BLOCK_BITS];
        let mask = 1u32 << (index % BLOCK_BITS);
        if bit {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Read the bit at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.blocks[index / BLOCK_BITS] & (1u32 << (index % BLOCK_BITS)) != 0
    }

    /// Compute the per-block cumulative counts. Rebuilding is harmless.
    pub fn build_rank_index(&mut self) {
        let mut acc = 0u32;
        self.rank_index = self
            .blocks
            .iter()
            .map(|w| {
                let before = acc;
                acc += w.count_ones();
                before
            })
            .collect();
    }

    /// Whether [`build_rank_index`](Self::build_rank_index) has run.
    pub fn is_indexed(&self) -> bool {
        self.rank_index.len() == self.blocks.len()
    }

    /// Number of set bits strictly before `index`.
    ///
    /// # Panics
    ///
    /// Panics if the rank index has not been built, or if `index` is beyond
    /// the capacity given to [`new`](Self::new).
    #[inline]
    pub fn rank(&self, index: usize) -> u32 {
        let block = index / BLOCK_BITS;
        let off = index % BLOCK_BITS;
        let base = self.rank_index[block];
        if off == 0 {
            base
        } else {
            base + (self.blocks[block] & ((1u32 << off) - 1)).count_ones()
        }
    }

    /// Total number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.blocks.iter().map(|w| w.count_ones()).sum()
    }

    pub(crate) fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    pub(crate) fn rank_index(&self) -> &[u32] {
        &self.rank_index
    }

    /// Heap bytes held by both tables.
    pub fn size_in_bytes(&self) -> usize {
        (self.blocks.len() + self.rank_index.len()) * std::mem::size_of::<u32>()
    }
}
