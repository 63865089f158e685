//! HMAC-SHA256 expiring access tokens.
//!
//! A token binds a stream identifier to an expiry timestamp:
//!
//! ```text
//! signature = hex(HMAC-SHA256(secret, "{subject}|{expires_at}"))
//! ```
//!
//! Clients carry the signature as `t` and the expiry (unix seconds) as `e` in
//! the query string. Nothing is persisted; validation recomputes the MAC.

use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::Result;
use crate::Error;

type HmacSha256 = Hmac<Sha256>;

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub subject: String,
    /// Unix seconds after which the token is rejected.
    pub expires_at: i64,
    /// Lowercase hex HMAC.
    pub signature: String,
}

impl AccessToken {
    /// Render as the `t=..&e=..` query carried on stream URLs.
    pub fn query(&self) -> String {
        format!("t={}&e={}", self.signature, self.expires_at)
    }
}

/// Issues and verifies [`AccessToken`]s with a process-wide secret.
#[derive(Clone)]
pub struct TokenSigner {
    /// Keyed MAC state, cloned for every computation.
    keyed: HmacSha256,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Build a signer. An empty secret is a configuration fault.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::Config("signing secret must not be empty".into()));
        }
        let keyed = HmacSha256::new_from_slice(secret)
            .map_err(|e| Error::Config(format!("invalid signing secret: {e}")))?;
        Ok(Self { keyed })
    }

    /// Build a signer from `auth.signing_secret`, trimming surrounding
    /// whitespace.
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        let secret = auth
            .signing_secret
            .as_ref()
            .map(|s| s.expose().trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("auth.signing_secret is required".into()))?;
        Self::new(secret)
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    pub fn generate(&self, subject: &str, ttl: Duration) -> AccessToken {
        self.generate_at(subject, ttl, now_unix())
    }

    /// Issue a token relative to an explicit clock reading.
    pub fn generate_at(&self, subject: &str, ttl: Duration, now: i64) -> AccessToken {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_secs);
        AccessToken {
            subject: subject.to_string(),
            expires_at,
            signature: self.sign(subject, expires_at),
        }
    }

    /// Hex signature for `(subject, expires_at)`.
    pub fn sign(&self, subject: &str, expires_at: i64) -> String {
        hex::encode(self.mac(subject, expires_at).finalize().into_bytes())
    }

    /// Check a presented token against the current clock.
    pub fn validate(&self, subject: &str, token: &str, expires_at: i64) -> bool {
        self.validate_at(subject, token, expires_at, now_unix())
    }

    /// Check a presented token against an explicit clock reading.
    ///
    /// A token is still valid in the second it expires. The MAC comparison
    /// runs in constant time; tokens that are not hex never match.
    pub fn validate_at(&self, subject: &str, token: &str, expires_at: i64, now: i64) -> bool {
        if expires_at < now {
            return false;
        }
        let Ok(presented) = hex::decode(token) else {
            return false;
        };
        self.mac(subject, expires_at).verify_slice(&presented).is_ok()
    }

    fn mac(&self, subject: &str, expires_at: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(subject.as_bytes());
        mac.update(b"|");
        mac.update(expires_at.to_string().as_bytes());
        mac
    }
}

/// Compare two byte strings without leaking where they differ, or their
/// lengths, through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // Both sides are reduced to fixed-size tags under a throwaway key so the
    // comparison length never depends on the inputs.
    let Ok(mut left) = HmacSha256::new_from_slice(b"streamgate-compare") else {
        return false;
    };
    let mut right = left.clone();
    left.update(a);
    right.update(b);
    left.verify_slice(&right.finalize().into_bytes()).is_ok()
}

/// Current unix time in seconds.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Generate a random 32-byte secret, hex encoded.
pub fn generate_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
