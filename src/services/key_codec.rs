//! API key generation, hashing and wire-format validation.
//!
//! Keys look like `vpm_1a2b3c4d_0123456789abcdef0123456789abcdef`:
//! a fixed scheme, an 8 hex char public prefix and a 32 hex char secret.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Scheme literal every key starts with.
pub const KEY_SCHEME: &str = "vpm";

static KEY_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{KEY_SCHEME}_[0-9a-f]{{8}}_[0-9a-f]{{32}}$"))
        .expect("API key pattern is valid")
});

/// Output of [`generate`]. `full_key` must be shown to the caller once and then dropped.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub full_key: String,

    /// `{scheme}_{prefix}`, safe to store and display
    pub display_prefix: String,

    /// SHA-256 hex of `full_key`
    pub hash: String,
}

/// Generate a new API key from the thread-local CSPRNG.
pub fn generate() -> GeneratedKey {
    let prefix_bytes: [u8; 4] = rand::random();
    let secret_bytes: [u8; 16] = rand::random();

    let display_prefix = format!("{KEY_SCHEME}_{}", hex::encode(prefix_bytes));
    let full_key = format!("{display_prefix}_{}", hex::encode(secret_bytes));
    let hash = hash(&full_key);

    GeneratedKey {
        full_key,
        display_prefix,
        hash,
    }
}

/// SHA-256 of the key, lowercase hex. This is what `api_keys.key_hash` stores.
pub fn hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn is_valid_format(candidate: &str) -> bool {
    KEY_FORMAT.is_match(candidate)
}

/// Pull the token out of an `Authorization` header value.
///
/// Accepts `Bearer <token>` (scheme word in any case) and a bare `<token>`.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if header.eq_ignore_ascii_case("bearer") => "",
        _ => header,
    };

    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_valid_format() {
        for _ in 0..32 {
            let key = generate();
            assert!(is_valid_format(&key.full_key), "{}", key.full_key);
            assert!(key.full_key.starts_with(&key.display_prefix));
            assert_eq!(key.display_prefix.len(), KEY_SCHEME.len() + 1 + 8);
            assert_eq!(hash(&key.full_key), key.hash);
        }
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a.full_key, b.full_key);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn display_prefix_does_not_contain_secret() {
        let key = generate();
        let secret = key.full_key.rsplit('_').next().unwrap();
        assert_eq!(secret.len(), 32);
        assert!(!key.display_prefix.contains(secret));
    }

    #[test]
    fn hash_is_deterministic_sha256_hex() {
        let digest = hash("vpm_00000000_00000000000000000000000000000000");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash("vpm_00000000_00000000000000000000000000000000"));
        assert_eq!(
            hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        let cases = [
            "",
            "vpm_",
            "vpm_1a2b3c4d",
            "vpm_1a2b3c4d_0123456789abcdef0123456789abcde",
            "vpm_1a2b3c4d_0123456789abcdef0123456789abcdef0",
            "vpm_1A2B3C4D_0123456789abcdef0123456789abcdef",
            "vpm_1a2b3c4g_0123456789abcdef0123456789abcdef",
            "xyz_1a2b3c4d_0123456789abcdef0123456789abcdef",
            " vpm_1a2b3c4d_0123456789abcdef0123456789abcdef",
            "vpm-1a2b3c4d-0123456789abcdef0123456789abcdef",
        ];
        for case in cases {
            assert!(!is_valid_format(case), "accepted {case:?}");
        }
        assert!(is_valid_format("vpm_1a2b3c4d_0123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn extracts_prefixed_and_bare_tokens() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(extract_bearer_token("abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("   "), None);
    }
}
