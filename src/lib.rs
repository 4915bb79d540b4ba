//! # dat-rs
//!
//! A compact, immutable double-array trie mapping a sorted set of string keys
//! to dense ids `0..n`, with exact lookup and common-prefix search.
//!
//! ## Layout
//!
//! - **`base` / `check`**: parallel `i32` arrays indexed by node. A child of
//!   node `n` via transition code `c` is `base[n] + c`, valid only when
//!   `check[base[n] + c] == n`.
//! - **Tail buffer**: once a path stops branching, the rest of the key is
//!   stored once as a NUL-terminated UTF-16 run instead of one node per unit.
//! - **Code table**: code units are renumbered by how often they branch, so
//!   the transition alphabet is as small as the key set allows.
//! - **Rank bit-vector**: one bit per leaf slot; a leaf's id is the number of
//!   leaves before it.
//!
//! ## Example
//!
//! ```rust
//! use dat_rs::Trie;
//!
//! let trie = Trie::build(["an", "and", "ant", "ants"], true).unwrap();
//!
//! let id = trie.search("and").unwrap();
//! assert!(id < trie.key_count());
//! assert_eq!(trie.search("ands"), None);
//!
//! for (prefix, id) in trie.common_prefixes("ants") {
//!     println!("{prefix} -> {id}");
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alphabet;
pub mod bitvec;
pub mod builder;
pub mod config;
pub mod error;
mod io;
pub mod node_alloc;
pub mod shrink;
pub mod trie;

pub use alphabet::CodeAlphabet;
pub use bitvec::RankBitVector;
pub use builder::TrieBuilder;
pub use config::{BuildConfig, BuildMode};
pub use error::{Error, Result};
pub use node_alloc::NodeAllocator;
pub use shrink::TailShrinker;
pub use trie::{CommonPrefixes, PrefixCursor, PrefixMatch, PrefixStep, StrPrefixes, Trie, TrieStats, MAX_LEN};

#[cfg(test)]
mod proptests;
