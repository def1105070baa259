use sha2::{Digest, Sha256};

/// Stable digest of everything that shaped an oracle request.
pub(crate) fn input_digest(model: &str, system: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(system.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(user.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_field_sensitive() {
        let a = input_digest("gpt-4o", "sys", "user");
        assert_eq!(a, input_digest("gpt-4o", "sys", "user"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, input_digest("gpt-4o", "sysuser", ""));
    }
}
