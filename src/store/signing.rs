use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::errors::{PortalError, Result};

/// issues and checks time-limited download URLs
///
/// signature = hex(sha256(secret \n path \n expires))
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    base_url: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn sign(&self, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"\n");
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// URL valid until `now + ttl`
    pub fn signed_url(&self, path: &str, now: DateTime<Utc>, ttl: Duration) -> String {
        let expires = (now + ttl).timestamp();
        format!(
            "{}/files/{}?expires={}&signature={}",
            self.base_url,
            path,
            expires,
            self.sign(path, expires)
        )
    }

    pub fn verify(&self, path: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> Result<()> {
        let expected = self.sign(path, expires);
        if now.timestamp() > expires || !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(PortalError::InvalidSignature {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

/// equality without an early exit on the first differing byte
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_signed_url_round_trip() {
        let signer = UrlSigner::new("s3cret", "http://localhost:8080/");
        let url = signer.signed_url("inv/receipts/2025/r.pdf", now(), Duration::seconds(60));
        let expires = now().timestamp() + 60;
        assert_eq!(
            url,
            format!(
                "http://localhost:8080/files/inv/receipts/2025/r.pdf?expires={expires}&signature={}",
                signer.sign("inv/receipts/2025/r.pdf", expires)
            )
        );

        let sig = signer.sign("inv/receipts/2025/r.pdf", expires);
        assert!(signer.verify("inv/receipts/2025/r.pdf", expires, &sig, now()).is_ok());
    }

    #[test]
    fn test_verify_rejects_expired_and_tampered() {
        let signer = UrlSigner::new("s3cret", "http://x");
        let expires = now().timestamp() + 60;
        let sig = signer.sign("a/b.pdf", expires);

        let later = now() + Duration::seconds(61);
        assert!(signer.verify("a/b.pdf", expires, &sig, later).is_err());
        assert!(signer.verify("a/c.pdf", expires, &sig, now()).is_err());
        assert!(signer.verify("a/b.pdf", expires + 1, &sig, now()).is_err());

        let other = UrlSigner::new("different", "http://x");
        assert!(other.verify("a/b.pdf", expires, &sig, now()).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
