//! The finished, immutable double-array trie and its queries.
//!
//! `base[n] >= 0` is the branch offset of node `n`; a child via code `c` is
//! `base[n] + c` and is only real when `check[base[n] + c] == n`. A negative
//! `base[n]` marks a leaf whose remaining suffix starts at `-base[n]` in the
//! tail buffer. The sign convention is confined to [`Slot`].

use smallvec::SmallVec;

use crate::alphabet::CodeAlphabet;
use crate::bitvec::RankBitVector;
use crate::builder::TrieBuilder;
use crate::config::BuildConfig;
use crate::error::Result;

/// `check` value of every slot that is not somebody's child.
pub(crate) const NO_PARENT: i32 = -1;

/// Longest node array or tail buffer an `i32` offset can address.
pub const MAX_LEN: usize = i32::MAX as usize;

/// Decoded `base` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Internal node with its children's base offset.
    Branch(u32),
    /// Leaf with the offset of its suffix in the tail buffer.
    Leaf(u32),
}

impl Slot {
    #[inline]
    pub(crate) fn decode(raw: i32) -> Self {
        if raw < 0 {
            Slot::Leaf(raw.unsigned_abs())
        } else {
            Slot::Branch(raw as u32)
        }
    }

    #[inline]
    pub(crate) fn encode(self) -> i32 {
        debug_assert!(matches!(self, Slot::Branch(v) | Slot::Leaf(v) if v as usize <= MAX_LEN));
        match self {
            Slot::Branch(x) => x as i32,
            Slot::Leaf(offset) => -(offset as i32),
        }
    }
}

/// Size figures for a built trie.
#[derive(Debug, Clone, Default)]
pub struct TrieStats {
    /// Length of the `base`/`check` arrays
    pub nodes: usize,
    /// Code units in the tail buffer, terminators included
    pub tail_units: usize,
    /// Number of stored keys
    pub keys: usize,
    /// Approximate heap bytes held by the trie
    pub bytes: usize,
    /// Bytes per key (calculated)
    pub bytes_per_key: f64,
}

/// Outcome of one [`Trie::common_prefix_search`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixStep {
    /// A match was recorded and unread input remains.
    More,
    /// Traversal is over; the cursor may still hold a final match.
    Finished,
}

/// Resumable state of a common-prefix search.
///
/// A plain value owned by one search session; stop calling to cancel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixCursor {
    node: u32,
    offset: usize,
    id: Option<u32>,
    terminal_checked: bool,
    finished: bool,
}

impl PrefixCursor {
    /// Cursor positioned at the root, before any input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id matched by the most recent call, if any.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Length in code units of the prefix matched by the most recent call.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the search has run to completion.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// One common-prefix hit: the first `len` code units of the query are key `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixMatch {
    /// Prefix length in UTF-16 code units
    pub len: usize,
    /// Key id
    pub id: u32,
}

/// Immutable double-array trie mapping keys to dense ids `0..key_count()`.
///
/// Safe to share between threads; queries never mutate it.
///
/// # Example
///
/// ```rust
/// use dat_rs::Trie;
///
/// let trie = Trie::build(["an", "and", "ant", "ants"], false).unwrap();
/// assert!(trie.search("ant").is_some());
/// assert_eq!(trie.search("a"), None);
///
/// let hits: Vec<&str> = trie.common_prefixes("antsy").map(|(p, _)| p).collect();
/// assert_eq!(hits, vec!["an", "ant", "ants"]);
/// ```
pub struct Trie {
    base: Vec<i32>,
    check: Vec<i32>,
    tail: Vec<u16>,
    alphabet: CodeAlphabet,
    ranks: RankBitVector,
}

impl Trie {
    pub(crate) fn from_parts(
        base: Vec<i32>,
        check: Vec<i32>,
        tail: Vec<u16>,
        alphabet: CodeAlphabet,
        ranks: RankBitVector,
    ) -> Self {
        debug_assert_eq!(base.len(), check.len());
        debug_assert!(ranks.is_indexed());
        Self {
            base,
            check,
            tail,
            alphabet,
            ranks,
        }
    }

    /// Build from sorted, unique keys, optionally shrinking the tail.
    pub fn build<I, S>(keys: I, shrink_tail: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TrieBuilder::new(keys)?
            .config(BuildConfig::new().shrink_tail(shrink_tail))
            .build()
    }

    /// Id of `key`, or `None` when it is not stored.
    pub fn search(&self, key: &str) -> Option<u32> {
        self.search_iter(key.encode_utf16())
    }

    /// [`search`](Self::search) over raw UTF-16 code units.
    pub fn search_units(&self, key: &[u16]) -> Option<u32> {
        self.search_iter(key.iter().copied())
    }

    /// Whether `key` is stored.
    pub fn contains(&self, key: &str) -> bool {
        self.search(key).is_some()
    }

    fn search_iter<I: Iterator<Item = u16>>(&self, mut units: I) -> Option<u32> {
        let mut node = 0usize;
        loop {
            match self.slot(node)? {
                Slot::Leaf(offset) => {
                    return self
                        .tail_equals(offset as usize, &mut units)
                        .then(|| self.ranks.rank(node));
                }
                Slot::Branch(x) => match units.next() {
                    Some(u) => node = self.child(node, x, self.alphabet.unit(u))?,
                    None => {
                        let leaf = self.child(node, x, self.alphabet.terminal())?;
                        return self.ranks.get(leaf).then(|| self.ranks.rank(leaf));
                    }
                },
            }
        }
    }

    /// Advance `cursor` to the next stored key that is a prefix of `key`.
    ///
    /// Each call clears the cursor's id, walks forward from where the last
    /// call stopped, and records at most one match. Matches come out
    /// shortest first and consumed input is never re-read. `key` must be
    /// the same slice on every call for one cursor.
    pub fn common_prefix_search(&self, key: &[u16], cursor: &mut PrefixCursor) -> PrefixStep {
        cursor.id = None;
        if cursor.finished {
            return PrefixStep::Finished;
        }

        let mut node = cursor.node as usize;
        let mut pos = cursor.offset;
        loop {
            let Some(slot) = self.slot(node) else {
                return cursor.finish();
            };
            match slot {
                Slot::Leaf(offset) => {
                    let rest = key.get(pos..).unwrap_or(&[]);
                    if let Some(n) = self.tail_prefix(offset as usize, rest) {
                        cursor.id = Some(self.ranks.rank(node));
                        cursor.offset = pos + n;
                    }
                    return cursor.finish();
                }
                Slot::Branch(x) => {
                    if !cursor.terminal_checked {
                        cursor.terminal_checked = true;
                        if let Some(leaf) = self.child(node, x, self.alphabet.terminal()) {
                            cursor.node = node as u32;
                            cursor.offset = pos;
                            cursor.id = Some(self.ranks.rank(leaf));
                            return if pos < key.len() {
                                PrefixStep::More
                            } else {
                                cursor.finish()
                            };
                        }
                    }
                    let Some(&u) = key.get(pos) else {
                        return cursor.finish();
                    };
                    match self.child(node, x, self.alphabet.unit(u)) {
                        Some(next) => {
                            node = next;
                            pos += 1;
                            cursor.terminal_checked = false;
                        }
                        None => return cursor.finish(),
                    }
                }
            }
        }
    }

    /// Every stored key that prefixes `key`, shortest first.
    pub fn common_prefixes_units<'t, 'k>(&'t self, key: &'k [u16]) -> CommonPrefixes<'t, 'k> {
        CommonPrefixes {
            trie: self,
            key,
            cursor: PrefixCursor::new(),
        }
    }

    /// Every stored key that prefixes `text`, as `(prefix, id)` pairs.
    pub fn common_prefixes<'t, 'k>(&'t self, text: &'k str) -> StrPrefixes<'t, 'k> {
        StrPrefixes {
            trie: self,
            text,
            units: text.encode_utf16().collect(),
            cursor: PrefixCursor::new(),
            units_seen: 0,
            bytes_seen: 0,
        }
    }

    /// Length of the `base`/`check` arrays.
    pub fn node_count(&self) -> usize {
        self.base.len()
    }

    /// Length of the tail buffer in code units.
    pub fn tail_len(&self) -> usize {
        self.tail.len()
    }

    /// Number of stored keys.
    pub fn key_count(&self) -> u32 {
        self.ranks.rank(self.base.len())
    }

    /// Whether no key is stored.
    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }

    /// One past the largest transition code.
    pub fn code_limit(&self) -> u32 {
        self.alphabet.code_limit()
    }

    /// Size figures.
    pub fn stats(&self) -> TrieStats {
        let keys = self.key_count() as usize;
        let bytes = (self.base.len() + self.check.len() + self.alphabet.codes().len())
            * std::mem::size_of::<i32>()
            + self.tail.len() * std::mem::size_of::<u16>()
            + self.ranks.size_in_bytes();
        TrieStats {
            nodes: self.base.len(),
            tail_units: self.tail.len(),
            keys,
            bytes,
            bytes_per_key: if keys > 0 {
                bytes as f64 / keys as f64
            } else {
                0.0
            },
        }
    }

    #[inline]
    fn slot(&self, node: usize) -> Option<Slot> {
        self.base.get(node).map(|&b| Slot::decode(b))
    }

    #[inline]
    fn child(&self, node: usize, base: u32, code: u32) -> Option<usize> {
        let next = base as usize + code as usize;
        (self.check.get(next) == Some(&(node as i32))).then_some(next)
    }

    /// Input is exactly the tail suffix at `offset`.
    fn tail_equals<I: Iterator<Item = u16>>(&self, offset: usize, units: &mut I) -> bool {
        let mut pos = offset;
        for u in units {
            if u == 0 || self.tail.get(pos) != Some(&u) {
                return false;
            }
            pos += 1;
        }
        self.tail.get(pos) == Some(&0)
    }

    /// Length of the tail suffix at `offset` if `rest` starts with it.
    fn tail_prefix(&self, offset: usize, rest: &[u16]) -> Option<usize> {
        let mut n = 0;
        loop {
            match *self.tail.get(offset + n)? {
                0 => return Some(n),
                t if rest.get(n) == Some(&t) => n += 1,
                _ => return None,
            }
        }
    }

    pub(crate) fn base(&self) -> &[i32] {
        &self.base
    }

    pub(crate) fn check(&self) -> &[i32] {
        &self.check
    }

    pub(crate) fn tail(&self) -> &[u16] {
        &self.tail
    }

    pub(crate) fn alphabet(&self) -> &CodeAlphabet {
        &self.alphabet
    }

    pub(crate) fn ranks(&self) -> &RankBitVector {
        &self.ranks
    }
}

/// Leaf bitmap over `base` with its rank index built.
pub(crate) fn leaf_ranks(base: &[i32]) -> RankBitVector {
    let mut ranks = RankBitVector::new(base.len());
    for (i, &b) in base.iter().enumerate() {
        if b < 0 {
            ranks.set(i, true);
        }
    }
    ranks.build_rank_index();
    ranks
}

impl PrefixCursor {
    fn finish(&mut self) -> PrefixStep {
        self.finished = true;
        PrefixStep::Finished
    }
}

impl std::fmt::Debug for Trie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trie")
            .field("keys", &self.key_count())
            .field("nodes", &self.base.len())
            .field("tail", &self.tail.len())
            .field("code_limit", &self.alphabet.code_limit())
            .finish()
    }
}

/// Iterator over [`PrefixMatch`]es of a UTF-16 query.
pub struct CommonPrefixes<'t, 'k> {
    trie: &'t Trie,
    key: &'k [u16],
    cursor: PrefixCursor,
}

impl Iterator for CommonPrefixes<'_, '_> {
    type Item = PrefixMatch;

    fn next(&mut self) -> Option<PrefixMatch> {
        while !self.cursor.is_finished() {
            self.trie.common_prefix_search(self.key, &mut self.cursor);
            if let Some(id) = self.cursor.id() {
                return Some(PrefixMatch {
                    len: self.cursor.offset(),
                    id,
                });
            }
        }
        None
    }
}

/// Iterator over `(prefix, id)` pairs of a `str` query.
pub struct StrPrefixes<'t, 'k> {
    trie: &'t Trie,
    text: &'k str,
    units: SmallVec<[u16; 64]>,
    cursor: PrefixCursor,
    units_seen: usize,
    bytes_seen: usize,
}

impl<'k> Iterator for StrPrefixes<'_, 'k> {
    type Item = (&'k str, u32);

    fn next(&mut self) -> Option<(&'k str, u32)> {
        while !self.cursor.is_finished() {
            self.trie.common_prefix_search(&self.units, &mut self.cursor);
            let Some(id) = self.cursor.id() else {
                continue;
            };
            // Keys are whole `str`s, so every match ends on a char boundary.
            let text = self.text;
            while self.units_seen < self.cursor.offset() {
                let c = text[self.bytes_seen..].chars().next()?;
                self.units_seen += c.len_utf16();
                self.bytes_seen += c.len_utf8();
            }
            return Some((&text[..self.bytes_seen], id));
        }
        None
    }
}
