//! Limits enforced at manifest-validation and per-chunk time (spec §6).

pub const MAX_MANIFEST_ENTRIES: usize = 20_000;
pub const MAX_ASSET_SIZE_BYTES: u64 = 25 * 1024 * 1024;
pub const MAX_PATHNAME_LEN: usize = 1024;
pub const MAX_CHUNK_FILES: usize = 50;
pub const BUCKET_SIZE: usize = 10;

const FORBIDDEN_PATH_CHARS: &[char] = &['<', '>', '{', '}', '|', '\\', '^', '`', '[', ']'];

pub fn validate_pathname(path: &str) -> crate::Result<()> {
    if path.len() > MAX_PATHNAME_LEN {
        return Err(crate::Error::validation("path", "exceeds max pathname length"));
    }
    if !path.starts_with('/') {
        return Err(crate::Error::validation("path", "must start with /"));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(crate::Error::validation("path", "contains whitespace"));
    }
    if path.chars().any(|c| FORBIDDEN_PATH_CHARS.contains(&c)) {
        return Err(crate::Error::validation("path", "contains forbidden character"));
    }
    Ok(())
}

pub fn validate_content_hash(hash: &str) -> crate::Result<()> {
    dockpit_content::decode_content_hash(hash)
        .map(|_| ())
        .ok_or_else(|| crate::Error::validation("hash", "not exactly 64 lowercase hex chars"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(validate_pathname("foo/bar").is_err());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(validate_pathname("/foo<bar>").is_err());
    }

    #[test]
    fn accepts_ordinary_path() {
        assert!(validate_pathname("/assets/app.js").is_ok());
    }
}
