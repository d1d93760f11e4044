use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime: `exp = iat + TTL_SECS` (spec §4.5).
pub const TTL_SECS: u64 = 3600;

const HEADER_SEGMENT: &str = "eyJhbGciOiJIUzI1NiJ9"; // {"alg":"HS256"} pre-encoded, fixed for every token

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    iat: u64,
    exp: u64,
    #[serde(flatten)]
    claims: T,
}

/// Mints and verifies the control plane's compact session tokens (spec
/// §4.5). Holds the shared HMAC secret behind [`secrecy::Secret`] so it
/// never ends up in a `Debug` dump.
pub struct JwtCodec {
    secret: Secret<Vec<u8>>,
}

impl JwtCodec {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Secret::new(secret.into()),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // The secret is operator-supplied config, not attacker input, so a
        // length mismatch here would be a deployment bug, not a runtime path.
        #[allow(clippy::unwrap_used)]
        HmacSha256::new_from_slice(self.secret.expose_secret()).unwrap()
    }

    /// Mint a token for `claims`, stamping `iat`/`exp` automatically.
    pub fn mint<T: Serialize>(&self, claims: T, now_unix_secs: u64) -> String {
        let envelope = Envelope {
            iat: now_unix_secs,
            exp: now_unix_secs + TTL_SECS,
            claims,
        };
        // Envelope serialization can only fail for non-object claim types,
        // which every caller in this crate avoids by construction.
        #[allow(clippy::unwrap_used)]
        let payload = serde_json::to_vec(&envelope).unwrap();
        let payload_seg = URL_SAFE_NO_PAD.encode(payload);

        let signing_input = format!("{HEADER_SEGMENT}.{payload_seg}");
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let sig_seg = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{signing_input}.{sig_seg}")
    }

    /// Verify `token` and, if valid and unexpired, deserialize the caller's
    /// claims. Returns `None` on any failure whatsoever — malformed
    /// structure, bad signature, or an expired `exp` — never distinguishing
    /// which (spec §4.5).
    pub fn verify<T: DeserializeOwned>(&self, token: &str, now_unix_secs: u64) -> Option<T> {
        let mut parts = token.split('.');
        let header_seg = parts.next()?;
        let payload_seg = parts.next()?;
        let sig_seg = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let signing_input = format!("{header_seg}.{payload_seg}");
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig_seg).ok()?;
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&sig_bytes).ok()?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_seg).ok()?;
        let envelope: Envelope<T> = serde_json::from_slice(&payload_bytes).ok()?;
        if envelope.exp < now_unix_secs {
            return None;
        }
        Some(envelope.claims)
    }
}

/// Constant-time comparison of a candidate secret against a stored SHA-256
/// digest (spec §4.11, admin-token auth), built on the `subtle` crate's
/// constant-time primitives rather than a hand-rolled XOR fold.
#[must_use]
pub fn constant_time_eq_hash(candidate: &str, expected_digest_hex: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(candidate.as_bytes());
    let got = hasher.finalize();

    let Some(expected) = decode_hex(expected_digest_hex) else {
        return false;
    };
    if expected.len() != got.len() {
        return false;
    }
    got.as_slice().ct_eq(&expected).into()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Phase, UploadClaims};

    fn codec() -> JwtCodec {
        JwtCodec::new(b"test-secret".to_vec())
    }

    #[test]
    fn mint_then_verify_roundtrips() {
        let codec = codec();
        let claims = UploadClaims {
            session_id: "sess-1".into(),
            project_id: "proj-1".into(),
            phase: Phase::Upload,
        };
        let token = codec.mint(claims, 1_000);
        let verified: UploadClaims = codec.verify(&token, 1_000).unwrap();
        assert_eq!(verified.session_id, "sess-1");
        assert_eq!(verified.phase, Phase::Upload);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let codec = codec();
        let claims = UploadClaims {
            session_id: "sess-1".into(),
            project_id: "proj-1".into(),
            phase: Phase::Upload,
        };
        let token = codec.mint(claims, 1_000);
        let verified: Option<UploadClaims> = codec.verify(&token, 1_000 + TTL_SECS + 1);
        assert!(verified.is_none());
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let codec = codec();
        let claims = UploadClaims {
            session_id: "sess-1".into(),
            project_id: "proj-1".into(),
            phase: Phase::Upload,
        };
        let mut token = codec.mint(claims, 1_000);
        token.push('x');
        let verified: Option<UploadClaims> = codec.verify(&token, 1_000);
        assert!(verified.is_none());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let minted = JwtCodec::new(b"secret-a".to_vec());
        let checked = JwtCodec::new(b"secret-b".to_vec());
        let claims = UploadClaims {
            session_id: "sess-1".into(),
            project_id: "proj-1".into(),
            phase: Phase::Upload,
        };
        let token = minted.mint(claims, 1_000);
        let verified: Option<UploadClaims> = checked.verify(&token, 1_000);
        assert!(verified.is_none());
    }

    #[test]
    fn verify_rejects_malformed_structure() {
        let codec = codec();
        let verified: Option<UploadClaims> = codec.verify("not-a-jwt", 1_000);
        assert!(verified.is_none());
    }

    #[test]
    fn constant_time_eq_hash_matches_known_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"admin-token");
        let digest_hex = super::hex_for_test(&hasher.finalize());
        assert!(constant_time_eq_hash("admin-token", &digest_hex));
        assert!(!constant_time_eq_hash("wrong-token", &digest_hex));
    }
}

#[cfg(test)]
fn hex_for_test(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
