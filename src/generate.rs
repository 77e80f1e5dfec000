//! Container name and password generation.

use rand::Rng;

/// Alphabet passwords are drawn from.
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ!@#$%^&*";

/// Generate a short random hex token suitable as a container name.
///
/// Three random bytes, so six lowercase hex characters. Not globally unique;
/// callers that need a guarantee must check for an existing container first.
pub fn generate_container_name() -> String {
    let bytes: [u8; 3] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate a password of `length` characters drawn uniformly (with
/// replacement) from [`PASSWORD_ALPHABET`].
///
/// Backed by a general-purpose RNG, not a vetted secret generator; do not use
/// for security-sensitive credentials.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_is_six_lowercase_hex_chars() {
        for _ in 0..100 {
            let name = generate_container_name();
            assert_eq!(name.len(), 6);
            assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(name, name.to_lowercase());
        }
    }

    #[test]
    fn test_password_has_requested_length() {
        for length in [0, 1, 8, 32] {
            assert_eq!(generate_password(length).chars().count(), length);
        }
    }

    #[test]
    fn test_password_draws_from_alphabet() {
        let password = generate_password(256);
        for c in password.chars() {
            assert!(
                PASSWORD_ALPHABET.contains(&(c as u8)),
                "unexpected character: {}",
                c
            );
        }
    }
}
