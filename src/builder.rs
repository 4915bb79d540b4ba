//! Trie construction.
//!
//! The sorted key set is processed as `(range, node, depth)` tasks. A range
//! holding one key becomes a leaf whose unread suffix goes to the tail
//! buffer; a larger range is split into sibling runs, the allocator places
//! all of their codes at once, and each run becomes a child task.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::alphabet::{partition, CodeAlphabet};
use crate::config::{BuildConfig, BuildMode};
use crate::error::{Error, Result};
use crate::node_alloc::NodeAllocator;
use crate::shrink::TailShrinker;
use crate::trie::{leaf_ranks, Slot, Trie, MAX_LEN, NO_PARENT};

type Codes = SmallVec<[u32; 8]>;

#[derive(Debug)]
struct Task {
    range: Range<usize>,
    node: u32,
    depth: usize,
}

/// Node arrays plus the allocator that hands out their slots.
struct NodeArena {
    base: Vec<i32>,
    check: Vec<i32>,
    alloc: NodeAllocator,
}

impl NodeArena {
    fn new(capacity: usize, code_limit: u32) -> Self {
        let alloc = NodeAllocator::new(capacity, code_limit);
        let len = alloc.len();
        Self {
            base: vec![0; len],
            check: vec![NO_PARENT; len],
            alloc,
        }
    }

    /// Place `codes` under `parent` and return the chosen base offset.
    fn branch(&mut self, parent: u32, codes: &[u32]) -> u32 {
        let x = self.alloc.allocate(codes);
        let len = self.alloc.len();
        if len > self.base.len() {
            self.base.resize(len, 0);
            self.check.resize(len, NO_PARENT);
        }
        debug_assert!(codes.iter().all(|&c| self.alloc.is_taken((x + c) as usize)));
        self.base[parent as usize] = Slot::Branch(x).encode();
        for &c in codes {
            self.check[(x + c) as usize] = parent as i32;
        }
        x
    }
}

/// Tail buffer plus the leaf offsets recorded while filling it.
///
/// Offset 0 is never handed out (a leaf is a negative `base`), and offset 1
/// is the terminator shared by empty suffixes written before anything else.
struct TailBuffer {
    units: Vec<u16>,
    leaves: Vec<(u32, u32)>,
}

impl TailBuffer {
    fn new() -> Self {
        Self {
            units: vec![0, 0],
            leaves: Vec::new(),
        }
    }

    fn push_leaf(&mut self, node: u32, suffix: &[u16]) {
        let offset = if suffix.is_empty() {
            self.units.len() - 1
        } else {
            let offset = self.units.len();
            self.units.extend_from_slice(suffix);
            self.units.push(0);
            offset
        };
        self.leaves.push((node, offset as u32));
    }
}

/// Unread part of the key at `depth`; empty once the terminal was consumed.
#[inline]
fn suffix(key: &[u16], depth: usize) -> &[u16] {
    key.get(depth..).unwrap_or(&[])
}

/// Split a multi-key task into its sibling codes and child ranges.
fn split(keys: &[Vec<u16>], alphabet: &CodeAlphabet, task: &Task) -> (Codes, SmallVec<[Range<usize>; 8]>) {
    partition(keys, task.range.clone(), task.depth)
        .into_iter()
        .map(|(raw, range)| (alphabet.code(raw), range))
        .unzip()
}

fn children(x: u32, codes: &[u32], ranges: SmallVec<[Range<usize>; 8]>, depth: usize) -> SmallVec<[Task; 8]> {
    codes
        .iter()
        .zip(ranges)
        .map(|(&c, range)| Task {
            range,
            node: x + c,
            depth: depth + 1,
        })
        .collect()
}

/// Builds a [`Trie`] from a sorted, duplicate-free key list.
///
/// # Example
///
/// ```rust
/// use dat_rs::{BuildConfig, TrieBuilder};
///
/// let trie = TrieBuilder::new(["an", "and", "ant", "ants"])
///     .unwrap()
///     .config(BuildConfig::new().shrink_tail(true))
///     .build()
///     .unwrap();
/// assert!(trie.search("and").is_some());
/// assert_eq!(trie.search("ands"), None);
/// ```
#[derive(Debug, Clone)]
pub struct TrieBuilder {
    keys: Vec<Vec<u16>>,
    config: BuildConfig,
}

impl TrieBuilder {
    /// Validate and encode `keys`.
    ///
    /// Keys must be strictly increasing in `str` order and free of U+0000.
    pub fn new<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut encoded: Vec<Vec<u16>> = Vec::new();
        let mut prev: Option<S> = None;
        for (index, key) in keys.into_iter().enumerate() {
            let s = key.as_ref();
            if s.contains('\0') {
                return Err(Error::NulInKey { index });
            }
            if let Some(p) = &prev {
                if p.as_ref() >= s {
                    return Err(Error::UnsortedKeys { index });
                }
            }
            encoded.push(s.encode_utf16().collect());
            prev = Some(key);
        }
        Ok(Self {
            keys: encoded,
            config: BuildConfig::default(),
        })
    }

    /// Replace the build configuration.
    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of keys to be stored.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the key set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Run construction.
    ///
    /// The only failure is [`Error::TooLarge`]: node and tail offsets are
    /// stored as `i32`, so neither array may exceed [`MAX_LEN`] entries.
    pub fn build(self) -> Result<Trie> {
        let alphabet = CodeAlphabet::analyze(&self.keys);
        let code_limit = alphabet.code_limit();
        let capacity = alphabet.node_estimate() * 3 / 2 + code_limit as usize * 2;
        debug!(
            keys = self.keys.len(),
            code_limit,
            node_estimate = alphabet.node_estimate(),
            "analyzed alphabet"
        );

        let arena = NodeArena::new(capacity, code_limit);
        let (arena, tail) = match self.config.mode {
            BuildMode::Sequential => build_sequential(&self.keys, &alphabet, arena),
            BuildMode::Parallel { .. } => {
                build_parallel(&self.keys, &alphabet, arena, self.config.mode.worker_count())
            }
        };

        let trie = finish(arena, tail, alphabet, self.config.shrink_tail)?;
        info!(
            keys = trie.key_count(),
            nodes = trie.node_count(),
            tail = trie.tail_len(),
            mode = ?self.config.mode,
            "built trie"
        );
        Ok(trie)
    }
}

fn build_sequential(
    keys: &[Vec<u16>],
    alphabet: &CodeAlphabet,
    mut arena: NodeArena,
) -> (NodeArena, TailBuffer) {
    let mut tail = TailBuffer::new();
    let mut stack = Vec::new();
    if !keys.is_empty() {
        stack.push(Task {
            range: 0..keys.len(),
            node: 0,
            depth: 0,
        });
    }

    // LIFO with reversed pushes visits children in key order, depth first.
    while let Some(task) = stack.pop() {
        if task.range.len() == 1 {
            tail.push_leaf(task.node, suffix(&keys[task.range.start], task.depth));
            continue;
        }
        let (codes, ranges) = split(keys, alphabet, &task);
        let x = arena.branch(task.node, &codes);
        stack.extend(children(x, &codes, ranges, task.depth).into_iter().rev());
    }
    (arena, tail)
}

fn build_parallel(
    keys: &[Vec<u16>],
    alphabet: &CodeAlphabet,
    arena: NodeArena,
    workers: usize,
) -> (NodeArena, TailBuffer) {
    let mut initial = Vec::new();
    if !keys.is_empty() {
        initial.push(Task {
            range: 0..keys.len(),
            node: 0,
            depth: 0,
        });
    }
    let pending = AtomicUsize::new(initial.len());
    let queue = Mutex::new(initial);
    let arena = Mutex::new(arena);
    let tail = Mutex::new(TailBuffer::new());

    debug!(workers, "starting parallel build");
    std::thread::scope(|s| {
        for _ in 0..workers.max(1) {
            s.spawn(|| drain(keys, alphabet, &queue, &pending, &arena, &tail));
        }
    });

    (arena.into_inner(), tail.into_inner())
}

/// Worker loop: runs until no task is queued or in flight.
fn drain(
    keys: &[Vec<u16>],
    alphabet: &CodeAlphabet,
    queue: &Mutex<Vec<Task>>,
    pending: &AtomicUsize,
    arena: &Mutex<NodeArena>,
    tail: &Mutex<TailBuffer>,
) {
    let backoff = Backoff::new();
    loop {
        let Some(task) = queue.lock().pop() else {
            if pending.load(Ordering::Acquire) == 0 {
                return;
            }
            backoff.snooze();
            continue;
        };
        backoff.reset();

        if task.range.len() == 1 {
            tail.lock()
                .push_leaf(task.node, suffix(&keys[task.range.start], task.depth));
        } else {
            let (codes, ranges) = split(keys, alphabet, &task);
            // Allocation mutates shared free-list state; never race it.
            let x = arena.lock().branch(task.node, &codes);
            pending.fetch_add(codes.len(), Ordering::AcqRel);
            queue.lock().extend(children(x, &codes, ranges, task.depth));
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Refuse arrays that `i32` offsets cannot address.
fn check_limits(nodes: usize, tail: usize) -> Result<()> {
    for (what, len) in [("node array", nodes), ("tail buffer", tail)] {
        if len > MAX_LEN {
            return Err(Error::TooLarge { what, len });
        }
    }
    Ok(())
}

/// Apply leaf offsets, trim, optionally shrink the tail, and index leaves.
fn finish(
    arena: NodeArena,
    tail: TailBuffer,
    alphabet: CodeAlphabet,
    shrink_tail: bool,
) -> Result<Trie> {
    let NodeArena {
        mut base,
        mut check,
        ..
    } = arena;
    let TailBuffer { mut units, leaves } = tail;
    // Every slot handed out lies below the arena length, so nothing encoded
    // so far has wrapped unless this fails.
    check_limits(base.len(), units.len())?;

    for &(node, offset) in &leaves {
        base[node as usize] = Slot::Leaf(offset).encode();
    }

    // Every child sits below its parent's base plus code_limit.
    let highest = base.iter().copied().max().unwrap_or(0).max(0) as usize;
    let node_len = highest + alphabet.code_limit() as usize;
    base.resize(node_len, 0);
    check.resize(node_len, NO_PARENT);

    if shrink_tail {
        let before = units.len();
        let shrinker = TailShrinker::new(&base, &units);
        let leaves = shrinker.leaf_count();
        units = shrinker.shrink(&mut base);
        debug!(leaves, before, after = units.len(), "shrank tail");
    }

    let ranks = leaf_ranks(&base);
    Ok(Trie::from_parts(base, check, units, alphabet, ranks))
}
