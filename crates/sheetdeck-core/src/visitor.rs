use sha2::{Digest, Sha256};

/// Salted one-way fingerprint of client IPs.
///
/// The hash stands in for the raw address when counting unique visitors, so
/// the salt must never be empty. Construction is the only place that check
/// happens; build the hasher once at startup.
#[derive(Clone)]
pub struct IpHasher {
    salt: String,
}

impl IpHasher {
    pub fn new(salt: impl Into<String>) -> Result<Self, String> {
        let salt = salt.into();
        if salt.trim().is_empty() {
            return Err("IP hash salt must not be empty".to_string());
        }
        Ok(Self { salt })
    }

    /// `hex(sha256(ip + salt))`, 64 lowercase hex chars.
    pub fn hash(&self, ip: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ip.as_bytes());
        hasher.update(self.salt.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for IpHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpHasher").field("salt", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_64_hex_chars() {
        let hasher = IpHasher::new("pepper").expect("salt");
        let hash = hasher.hash("203.0.113.7");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_deterministic_per_salt() {
        let a = IpHasher::new("pepper").expect("salt");
        let b = IpHasher::new("paprika").expect("salt");
        assert_eq!(a.hash("203.0.113.7"), a.hash("203.0.113.7"));
        assert_ne!(a.hash("203.0.113.7"), b.hash("203.0.113.7"));
        assert_ne!(a.hash("203.0.113.7"), a.hash("203.0.113.8"));
    }

    #[test]
    fn hash_matches_concatenated_digest() {
        let hasher = IpHasher::new("s4lt").expect("salt");
        let expected = hex::encode(Sha256::digest(b"10.0.0.1s4lt"));
        assert_eq!(hasher.hash("10.0.0.1"), expected);
    }

    #[test]
    fn empty_salt_is_rejected() {
        assert!(IpHasher::new("").is_err());
        assert!(IpHasher::new("   ").is_err());
    }

    #[test]
    fn debug_does_not_leak_salt() {
        let hasher = IpHasher::new("top-secret").expect("salt");
        assert!(!format!("{hasher:?}").contains("top-secret"));
    }
}
