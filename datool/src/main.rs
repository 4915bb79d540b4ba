//! datool - build and query dat-rs index files.
//!
//! ```text
//! datool build index.dat --shrink-tail < sorted-unique-keys.txt
//! datool search index.dat < queries.txt
//! datool prefix index.dat < queries.txt
//! ```
//!
//! Results go to stdout; diagnostics go to stderr (filter with `RUST_LOG`).

use std::io::{self, BufRead, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dat_rs::{BuildConfig, BuildMode, Trie, TrieBuilder};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "datool")]
#[command(about = "Build and query double-array trie index files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from sorted, unique keys read from stdin, one per line
    Build {
        /// Output index file
        index: PathBuf,

        /// Deduplicate shared key suffixes
        #[arg(long, default_value_t = false)]
        shrink_tail: bool,

        /// Build with one worker per available core
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Build with exactly this many workers
        #[arg(long, value_name = "N", conflicts_with = "parallel")]
        threads: Option<NonZeroUsize>,
    },
    /// Print the id of each stdin line, or -1 when it is not a key
    Search {
        /// Index file to query
        index: PathBuf,
    },
    /// Print every stored key that is a prefix of each stdin line
    Prefix {
        /// Index file to query
        index: PathBuf,
    },
    /// Print node, tail and key counts of an index
    Stats {
        /// Index file to inspect
        index: PathBuf,
    },
}

impl Command {
    fn build_config(shrink_tail: bool, parallel: bool, threads: Option<NonZeroUsize>) -> BuildConfig {
        let mode = match (parallel, threads) {
            (_, Some(n)) => BuildMode::Parallel { threads: Some(n) },
            (true, None) => BuildMode::parallel(),
            (false, None) => BuildMode::Sequential,
        };
        BuildConfig::new().shrink_tail(shrink_tail).mode(mode)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("datool=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdin = io::stdin().lock();
    let mut stdout = BufWriter::new(io::stdout().lock());

    match args.command {
        Command::Build {
            index,
            shrink_tail,
            parallel,
            threads,
        } => {
            let config = Command::build_config(shrink_tail, parallel, threads);
            build_index(stdin, &index, config)?;
        }
        Command::Search { index } => {
            let trie = load(&index)?;
            run_search(&trie, stdin, &mut stdout)?;
        }
        Command::Prefix { index } => {
            let trie = load(&index)?;
            run_prefix(&trie, stdin, &mut stdout)?;
        }
        Command::Stats { index } => {
            let trie = load(&index)?;
            write_stats(&trie, &mut stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn load(index: &Path) -> Result<Trie> {
    let start = Instant::now();
    let trie = Trie::load(index).with_context(|| format!("loading {}", index.display()))?;
    info!(
        index = %index.display(),
        keys = trie.key_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded index"
    );
    Ok(trie)
}

/// Read keys from `input`, build, and save to `index`.
fn build_index<R: BufRead>(input: R, index: &Path, config: BuildConfig) -> Result<Trie> {
    let start = Instant::now();
    let keys: Vec<String> = input.lines().collect::<io::Result<_>>().context("reading keys")?;
    info!(keys = keys.len(), elapsed_ms = start.elapsed().as_millis() as u64, "read keys");

    let start = Instant::now();
    let trie = TrieBuilder::new(&keys)
        .context("keys must be sorted, unique and NUL-free")?
        .config(config)
        .build()
        .context("building index")?;
    info!(
        nodes = trie.node_count(),
        tail = trie.tail_len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "built index"
    );

    trie.save(index)
        .with_context(|| format!("saving {}", index.display()))?;
    info!(index = %index.display(), bytes = trie.image_len(), "saved index");
    Ok(trie)
}

/// One id (or -1) per input line. Returns the number of hits.
fn run_search<R: BufRead, W: Write>(trie: &Trie, input: R, out: &mut W) -> Result<usize> {
    let start = Instant::now();
    let (mut lines, mut hits) = (0usize, 0usize);
    for line in input.lines() {
        let line = line?;
        lines += 1;
        match trie.search(&line) {
            Some(id) => {
                hits += 1;
                writeln!(out, "{id}")?;
            }
            None => writeln!(out, "-1")?,
        }
    }
    info!(lines, hits, elapsed_ms = start.elapsed().as_millis() as u64, "search done");
    Ok(hits)
}

/// Each input line followed by `\t<prefix>\t<id>` per match. Returns the match count.
fn run_prefix<R: BufRead, W: Write>(trie: &Trie, input: R, out: &mut W) -> Result<usize> {
    let start = Instant::now();
    let mut matches = 0usize;
    for line in input.lines() {
        let line = line?;
        writeln!(out, "{line}")?;
        for (prefix, id) in trie.common_prefixes(&line) {
            matches += 1;
            writeln!(out, "\t{prefix}\t{id}")?;
        }
    }
    info!(matches, elapsed_ms = start.elapsed().as_millis() as u64, "prefix search done");
    Ok(matches)
}

fn write_stats<W: Write>(trie: &Trie, out: &mut W) -> Result<()> {
    let stats = trie.stats();
    writeln!(out, "keys\t{}", stats.keys)?;
    writeln!(out, "nodes\t{}", stats.nodes)?;
    writeln!(out, "tail\t{}", stats.tail_units)?;
    writeln!(out, "codes\t{}", trie.code_limit())?;
    writeln!(out, "bytes\t{}", stats.bytes)?;
    writeln!(out, "bytes/key\t{:.2}", stats.bytes_per_key)?;
    Ok(())
}
