use sha2::{Digest, Sha256};

/// Length in bytes of the truncated path hash stored in the asset manifest.
pub const PATH_HASH_LEN: usize = 16;

/// SHA-256 of `bytes`, lowercase hex-encoded (64 chars). This is the content
/// hash used as the blob key under `project/{id}/asset/{hash}`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_lower(&digest)
}

/// First 16 bytes of SHA-256 of the UTF-8 pathname — the manifest's lookup
/// key (spec §4.2, §4.3).
#[must_use]
pub fn path_hash(path: &str) -> [u8; PATH_HASH_LEN] {
    let digest = Sha256::digest(path.as_bytes());
    let mut out = [0u8; PATH_HASH_LEN];
    out.copy_from_slice(&digest[..PATH_HASH_LEN]);
    out
}

/// Decode a 64-char lowercase hex content hash into its raw 32 bytes.
/// Returns `None` if the string isn't exactly 64 lowercase hex characters.
#[must_use]
pub fn decode_content_hash(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let hi = hex_nibble(chunk[0])?;
        let lo = hex_nibble(chunk[1])?;
        out[i] = (hi << 4) | lo;
    }
    Some(out)
}

fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
