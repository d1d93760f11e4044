//! Compact JWT minting/verification (spec §4.5, C5) plus the constant-time
//! comparison the control plane's admin-token check requires (spec §4.11).
//!
//! Tokens are the usual three dot-separated base64url segments:
//! `base64url(header).base64url(payload).base64url(sig)`, where `sig` is
//! HMAC-SHA256 over the first two segments. Verification never differentiates
//! *why* a token was rejected (spec §4.5: "return nothing on any failure").

mod claims;
mod codec;

pub use claims::{CompleteClaims, Phase, UploadClaims};
pub use codec::{constant_time_eq_hash, JwtCodec, TTL_SECS};
