//! The binary asset manifest: a sorted, fixed-width index from path hashes
//! to content hashes, stored as one opaque blob per project (spec §3, §4.3).
//!
//! Layout:
//! ```text
//! header  (16 bytes): u32 BE version(=1) | u32 BE entry_count | 8 reserved bytes
//! entries (48 bytes each): 16-byte path hash | 32-byte content hash
//! ```
//! Entries are sorted ascending by path hash so lookups are a binary search
//! over the raw bytes — no parsing, no allocation per request.

use dockpit_content::{content_hash as sha256_hex, decode_content_hash, path_hash, PATH_HASH_LEN};

const HEADER_LEN: usize = 16;
const ENTRY_LEN: usize = 48;
const CONTENT_HASH_LEN: usize = 32;
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("content hash {0:?} is not 64 lowercase hex characters")]
    InvalidContentHash(String),
    #[error("manifest is truncated: {len} bytes is not header + N*{entry}", entry = ENTRY_LEN)]
    Truncated { len: usize },
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Encode a set of `(pathname, content_hash_hex)` pairs into the binary
/// manifest format. Pairs are sorted by path hash internally; duplicate
/// pathnames overwrite earlier entries (last write wins) since the caller is
/// expected to have already deduplicated by pathname.
pub fn encode<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut rows: Vec<([u8; PATH_HASH_LEN], [u8; CONTENT_HASH_LEN])> = Vec::new();
    for (path, hash_hex) in entries {
        let content = decode_content_hash(hash_hex)
            .ok_or_else(|| Error::InvalidContentHash(hash_hex.to_string()))?;
        rows.push((path_hash(path), content));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(HEADER_LEN + rows.len() * ENTRY_LEN);
    out.extend_from_slice(&MANIFEST_VERSION.to_be_bytes());
    out.extend_from_slice(&(rows.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0u8; 8]); // reserved, always zero (spec §9)
    for (ph, ch) in &rows {
        out.extend_from_slice(ph);
        out.extend_from_slice(ch);
    }
    Ok(out)
}

/// Parsed view over a decoded manifest, supporting binary-search lookup.
pub struct Manifest<'a> {
    bytes: &'a [u8],
    entry_count: usize,
}

impl<'a> Manifest<'a> {
    /// Parse the header of a raw manifest blob. Ignores the 8 reserved
    /// bytes on read regardless of what the encoder wrote there (spec §9 —
    /// older encoders didn't write them explicitly).
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated { len: bytes.len() });
        }
        let version = u32::from_be_bytes(bytes[0..4].try_into().unwrap_or_default());
        if version != MANIFEST_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let declared_count =
            u32::from_be_bytes(bytes[4..8].try_into().unwrap_or_default()) as usize;
        let body_len = bytes.len() - HEADER_LEN;
        if body_len % ENTRY_LEN != 0 || body_len / ENTRY_LEN != declared_count {
            return Err(Error::Truncated { len: bytes.len() });
        }
        Ok(Self {
            bytes,
            entry_count: declared_count,
        })
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    fn entry_path_hash(&self, index: usize) -> &[u8] {
        let start = HEADER_LEN + index * ENTRY_LEN;
        &self.bytes[start..start + PATH_HASH_LEN]
    }

    fn entry_content_hash(&self, index: usize) -> &[u8] {
        let start = HEADER_LEN + index * ENTRY_LEN + PATH_HASH_LEN;
        &self.bytes[start..start + CONTENT_HASH_LEN]
    }

    /// Binary-search the manifest for `path`. Returns the hex-encoded
    /// content hash on a hit.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<String> {
        if self.entry_count == 0 {
            return None;
        }
        let target = path_hash(path);
        let mut lo = 0usize;
        let mut hi = self.entry_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.entry_path_hash(mid).cmp(target.as_slice()) {
                std::cmp::Ordering::Equal => return Some(hex_encode(self.entry_content_hash(mid))),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Iterate all entries as `(path_hash, content_hash_hex)`, in sorted
    /// order. Exposed for conformance tests and diagnostics.
    pub fn iter_hashes(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.entry_count).map(move |i| hex_encode(self.entry_content_hash(i)))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Convenience re-export so callers don't need `dockpit_content` directly
/// for the common case of hashing file bytes before building entries.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}
