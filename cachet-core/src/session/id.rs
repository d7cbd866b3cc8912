//! Session identifier generation
//!
//! Identifiers are 32 bytes from the operating system RNG, encoded as
//! URL-safe base64 without padding. They are safe to put in a cookie value
//! and in a URL without further escaping.

use super::error::{SessionError, SessionResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes drawn per session identifier
pub const SESSION_ID_BYTES: usize = 32;

/// Generate a new session identifier from the operating system RNG
pub fn generate_session_id() -> SessionResult<String> {
    generate_session_id_from(&mut OsRng)
}

/// Generate a session identifier from the given random source
///
/// A failing source is an error. No shorter or empty identifier is ever
/// returned in its place.
pub fn generate_session_id_from<R: RngCore + ?Sized>(rng: &mut R) -> SessionResult<String> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| SessionError::RandomSourceUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy pool closed",
            )))
        }
    }

    #[test]
    fn test_id_length() {
        let id = generate_session_id().unwrap();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(id.len(), 43);

        let decoded = URL_SAFE_NO_PAD.decode(&id).unwrap();
        assert!(decoded.len() >= 16);
        assert_eq!(decoded.len(), SESSION_ID_BYTES);
    }

    #[test]
    fn test_id_alphabet_is_url_safe() {
        for _ in 0..100 {
            let id = generate_session_id().unwrap();
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert_eq!(urlencoding::encode(&id), id);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_session_id().unwrap()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_broken_rng_is_an_error() {
        let result = generate_session_id_from(&mut BrokenRng);
        match result {
            Err(SessionError::RandomSourceUnavailable(msg)) => {
                assert!(msg.contains("entropy pool closed"));
            }
            other => panic!("expected RandomSourceUnavailable, got {:?}", other),
        }
    }
}
