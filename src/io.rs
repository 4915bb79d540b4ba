//! Binary image of a built trie.
//!
//! Native byte order, every length an `i32`:
//!
//! ```text
//! blockCount
//! u32 blocks[blockCount]        rank bit-vector words
//! u32 rankIndex[blockCount]     cumulative popcounts
//! nodeArrayLength
//! tailBufferLength
//! u32 codeTable[0x10001]        raw code -> transition code
//! i32 base[nodeArrayLength]
//! i32 check[nodeArrayLength]
//! u16 tail[tailBufferLength]
//! ```
//!
//! The bit-vector is redundant with the signs of `base`; decoding rebuilds it
//! from `base` and rejects an image whose stored words disagree.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::alphabet::{CodeAlphabet, RAW_CODES};
use crate::bitvec::BLOCK_BITS;
use crate::error::{Error, Result};
use crate::trie::{leaf_ranks, Trie};

impl Trie {
    /// Write the image to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        debug!(path = %path.display(), bytes = self.image_len(), "saved trie");
        Ok(())
    }

    /// Memory-map `path` and decode the image.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::corrupt("empty file"));
        }
        // SAFETY: the mapping is read-only and dropped before returning;
        // concurrent truncation by another process is outside our contract.
        let map = unsafe { Mmap::map(&file)? };
        let trie = Self::from_bytes(&map)?;
        debug!(path = %path.display(), bytes = map.len(), "loaded trie");
        Ok(trie)
    }

    /// Serialize into `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let ranks = self.ranks();
        write_len(out, ranks.blocks().len())?;
        write_u32s(out, ranks.blocks())?;
        write_u32s(out, ranks.rank_index())?;

        write_len(out, self.base().len())?;
        write_len(out, self.tail().len())?;
        write_u32s(out, self.alphabet().codes())?;
        for &v in self.base().iter().chain(self.check()) {
            out.write_all(&v.to_ne_bytes())?;
        }
        for &u in self.tail() {
            out.write_all(&u.to_ne_bytes())?;
        }
        Ok(())
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.image_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode an image produced by [`write_to`](Self::write_to).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader { buf: bytes, pos: 0 };

        let blocks_len = r.len("block count")?;
        let blocks = r.u32s(blocks_len, "bit-vector blocks")?;
        let rank_index = r.u32s(blocks_len, "rank index")?;

        let node_len = r.len("node array length")?;
        let tail_len = r.len("tail length")?;
        if blocks_len != node_len / BLOCK_BITS + 1 {
            return Err(Error::corrupt(format!(
                "{blocks_len} bit-vector blocks cannot cover {node_len} nodes"
            )));
        }
        let codes = r.u32s(RAW_CODES, "code table")?;
        let base = r.i32s(node_len, "base array")?;
        let check = r.i32s(node_len, "check array")?;
        let tail = r.u16s(tail_len, "tail buffer")?;
        if r.pos != bytes.len() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes",
                bytes.len() - r.pos
            )));
        }

        let ranks = leaf_ranks(&base);
        if let Some(block) = blocks.iter().zip(ranks.blocks()).position(|(a, b)| a != b) {
            return Err(Error::corrupt(format!(
                "leaf bits of block {block} disagree with the base array"
            )));
        }
        if let Some(block) = rank_index.iter().zip(ranks.rank_index()).position(|(a, b)| a != b) {
            return Err(Error::corrupt(format!("rank index entry {block} is wrong")));
        }

        Ok(Trie::from_parts(
            base,
            check,
            tail,
            CodeAlphabet::from_codes(codes),
            ranks,
        ))
    }

    /// Exact size of the serialized image in bytes.
    pub fn image_len(&self) -> usize {
        let blocks = self.ranks().blocks().len();
        4 + blocks * 8 + 8 + RAW_CODES * 4 + self.base().len() * 8 + self.tail().len() * 2
    }
}

fn write_len<W: Write>(out: &mut W, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| Error::TooLarge {
        what: "image section",
        len,
    })?;
    out.write_all(&len.to_ne_bytes())?;
    Ok(())
}

fn write_u32s<W: Write>(out: &mut W, values: &[u32]) -> Result<()> {
    for &v in values {
        out.write_all(&v.to_ne_bytes())?;
    }
    Ok(())
}

/// Bounds-checked cursor over an image.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                Error::corrupt(format!("truncated {what} at byte {}", self.pos))
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn len(&mut self, what: &str) -> Result<usize> {
        let bytes = self.take(4, what)?;
        let v = i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        usize::try_from(v).map_err(|_| Error::corrupt(format!("negative {what}: {v}")))
    }

    fn u32s(&mut self, n: usize, what: &str) -> Result<Vec<u32>> {
        let bytes = self.take(n.saturating_mul(4), what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn i32s(&mut self, n: usize, what: &str) -> Result<Vec<i32>> {
        let bytes = self.take(n.saturating_mul(4), what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn u16s(&mut self, n: usize, what: &str) -> Result<Vec<u16>> {
        let bytes = self.take(n.saturating_mul(2), what)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect())
    }
}
