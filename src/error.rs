//! Error type shared by construction and persistence.
//!
//! Lookups never fail: a missing key is `None`, not an error. Everything here
//! is either a violated build precondition, a size limit, or a problem with
//! an index file.

use thiserror::Error;

/// Errors produced while building, saving or loading a trie.
#[derive(Error, Debug)]
pub enum Error {
    /// Creating, mapping, reading or writing an index file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Keys must be strictly increasing; this covers duplicates too.
    #[error("keys must be sorted and unique: key {index} is not greater than its predecessor")]
    UnsortedKeys {
        /// Position of the first offending key
        index: usize,
    },

    /// U+0000 is reserved as the tail terminator.
    #[error("key {index} contains a NUL character")]
    NulInKey {
        /// Position of the offending key
        index: usize,
    },

    /// An array outgrew what `i32` offsets can address.
    #[error("{what} has {len} entries, more than the {max} an i32 offset can address", max = i32::MAX)]
    TooLarge {
        /// Which array overflowed
        what: &'static str,
        /// Its length
        len: usize,
    },

    /// A persisted image is truncated or internally inconsistent.
    #[error("corrupt trie image: {message}")]
    Corrupt {
        /// What was wrong with the image
        message: String,
    },
}

impl Error {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::Corrupt {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = Error::UnsortedKeys { index: 3 };
        assert_eq!(
            e.to_string(),
            "keys must be sorted and unique: key 3 is not greater than its predecessor"
        );
        let e = Error::TooLarge {
            what: "tail buffer",
            len: 1 << 31,
        };
        assert_eq!(
            e.to_string(),
            "tail buffer has 2147483648 entries, more than the 2147483647 an i32 offset can address"
        );
        assert_eq!(
            Error::corrupt("short read").to_string(),
            "corrupt trie image: short read"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
