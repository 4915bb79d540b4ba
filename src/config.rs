//! Construction options.

use std::num::NonZeroUsize;

/// How construction work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Depth-first on the calling thread. Output is byte-for-byte
    /// reproducible for a given key set.
    #[default]
    Sequential,
    /// Shared work queue drained by a fixed pool of worker threads.
    ///
    /// Ids remain dense and consistent within one build but may differ
    /// between runs.
    Parallel {
        /// Worker count; `None` uses the available hardware parallelism.
        threads: Option<NonZeroUsize>,
    },
}

impl BuildMode {
    /// Parallel mode sized to the machine.
    pub fn parallel() -> Self {
        BuildMode::Parallel { threads: None }
    }

    /// Number of worker threads this mode will use.
    pub fn worker_count(&self) -> usize {
        match self {
            BuildMode::Sequential => 1,
            BuildMode::Parallel { threads: Some(n) } => n.get(),
            BuildMode::Parallel { threads: None } => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

/// Configuration for [`TrieBuilder`](crate::TrieBuilder).
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Deduplicate shared suffixes in the tail buffer after construction
    pub shrink_tail: bool,
    /// Sequential or parallel construction
    pub mode: BuildMode,
}

impl BuildConfig {
    /// Default configuration: sequential, tail left as built.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the tail-shrinking pass.
    pub fn shrink_tail(mut self, shrink: bool) -> Self {
        self.shrink_tail = shrink;
        self
    }

    /// Select the scheduling mode.
    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert!(!config.shrink_tail);
        assert_eq!(config.mode, BuildMode::Sequential);
        assert_eq!(config.mode.worker_count(), 1);
    }

    #[test]
    fn test_worker_count() {
        let four = NonZeroUsize::new(4).unwrap();
        let config = BuildConfig::new()
            .shrink_tail(true)
            .mode(BuildMode::Parallel { threads: Some(four) });
        assert!(config.shrink_tail);
        assert_eq!(config.mode.worker_count(), 4);
        assert!(BuildMode::parallel().worker_count() >= 1);
    }
}
