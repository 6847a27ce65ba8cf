use sha2::{Digest, Sha256};

/// Salted SHA-256 hex digest of a password
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, hashed: &str) -> bool {
    hash_password(password, salt) == hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_depend_on_salt() {
        let a = hash_password("secret", "one");
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_password("secret", "two"));
        assert!(verify_password("secret", "one", &a));
        assert!(!verify_password("Secret", "one", &a));
    }
}
