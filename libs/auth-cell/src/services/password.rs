use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const SALT_SIZE: usize = 16;
pub const HASH_SIZE: usize = 32;
pub const ITERATIONS: u32 = 100_000;
const PREFIX: &str = "PBKDF2";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password cannot be empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordCheck {
    pub valid: bool,
    /// Set when the stored value was a legacy plaintext password.
    pub needs_rehash: bool,
}

/// Stored format: `PBKDF2$<iterations>$<base64 salt>$<base64 hash>`.
pub struct PasswordSecurity;

impl PasswordSecurity {
    pub fn hash_password(password: &str) -> Result<String, PasswordError> {
        Self::hash_with_iterations(password, ITERATIONS)
    }

    pub(crate) fn hash_with_iterations(
        password: &str,
        iterations: u32,
    ) -> Result<String, PasswordError> {
        if password.trim().is_empty() {
            return Err(PasswordError::Empty);
        }

        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut hash = [0u8; HASH_SIZE];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

        Ok(format!(
            "{}${}${}${}",
            PREFIX,
            iterations,
            STANDARD.encode(salt),
            STANDARD.encode(hash)
        ))
    }

    pub fn verify_password(stored: &str, provided: &str) -> PasswordCheck {
        if stored.trim().is_empty() || provided.is_empty() {
            return PasswordCheck::default();
        }

        let parts: Vec<&str> = stored.split('$').collect();
        if parts.len() == 4 && parts[0] == PREFIX {
            return PasswordCheck {
                valid: verify_pbkdf2(parts[1], parts[2], parts[3], provided),
                needs_rehash: false,
            };
        }

        if stored == provided {
            return PasswordCheck {
                valid: true,
                needs_rehash: true,
            };
        }

        PasswordCheck::default()
    }
}

fn verify_pbkdf2(iterations: &str, salt: &str, expected: &str, provided: &str) -> bool {
    let iterations = match iterations.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return false,
    };

    let (salt, expected) = match (STANDARD.decode(salt), STANDARD.decode(expected)) {
        (Ok(salt), Ok(expected)) if !expected.is_empty() => (salt, expected),
        _ => return false,
    };

    let mut computed = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(provided.as_bytes(), &salt, iterations, &mut computed);

    computed.ct_eq(&expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hash_has_expected_shape() {
        let stored = PasswordSecurity::hash_password("s3cret!").unwrap();
        let parts: Vec<&str> = stored.split('$').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "PBKDF2");
        assert_eq!(parts[1], "100000");
        assert_eq!(STANDARD.decode(parts[2]).unwrap().len(), SALT_SIZE);
        assert_eq!(STANDARD.decode(parts[3]).unwrap().len(), HASH_SIZE);

        let check = PasswordSecurity::verify_password(&stored, "s3cret!");
        assert!(check.valid);
        assert!(!check.needs_rehash);
    }

    #[test]
    fn blank_passwords_cannot_be_hashed() {
        assert_matches!(PasswordSecurity::hash_password("   "), Err(PasswordError::Empty));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = PasswordSecurity::hash_with_iterations("same", 1_000).unwrap();
        let b = PasswordSecurity::hash_with_iterations("same", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let stored = PasswordSecurity::hash_with_iterations("correct", 1_000).unwrap();
        assert_eq!(
            PasswordSecurity::verify_password(&stored, "incorrect"),
            PasswordCheck::default()
        );
    }

    #[test]
    fn stored_iteration_count_is_honoured() {
        let stored = PasswordSecurity::hash_with_iterations("pw", 2_500).unwrap();
        assert!(stored.starts_with("PBKDF2$2500$"));
        assert!(PasswordSecurity::verify_password(&stored, "pw").valid);
    }

    #[test]
    fn legacy_plaintext_matches_and_asks_for_rehash() {
        let check = PasswordSecurity::verify_password("admin123", "admin123");
        assert!(check.valid);
        assert!(check.needs_rehash);

        assert!(!PasswordSecurity::verify_password("admin123", "Admin123").valid);
    }

    #[test]
    fn malformed_records_are_invalid() {
        for stored in [
            "PBKDF2$abc$AAAA$AAAA",
            "PBKDF2$0$AAAA$AAAA",
            "PBKDF2$1000$not base64$AAAA",
            "PBKDF2$1000$AAAA$",
        ] {
            assert!(!PasswordSecurity::verify_password(stored, "x").valid, "{}", stored);
        }
    }

    #[test]
    fn empty_inputs_are_invalid() {
        assert!(!PasswordSecurity::verify_password("", "").valid);
        assert!(!PasswordSecurity::verify_password("  ", "x").valid);
        assert!(!PasswordSecurity::verify_password("stored", "").valid);
    }
}
