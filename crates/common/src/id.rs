//! ID generation utilities.

use std::sync::Mutex;

use rand::{Rng, distributions::Alphanumeric, thread_rng};
use ulid::Generator;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Length of generated poll short codes.
pub const SHORT_CODE_LEN: usize = 8;

/// Process-wide ULID generator. Shared so that every `IdGenerator` handle
/// draws from the same monotonic sequence.
static ULIDS: Mutex<Generator> = Mutex::new(Generator::new());

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// Ids from one process are strictly increasing: within the same
    /// millisecond the random part is incremented instead of redrawn.
    /// Fails only if that increment overflows.
    pub fn generate(&self) -> AppResult<String> {
        let mut generator = ULIDS
            .lock()
            .map_err(|_| AppError::Internal("ULID generator lock poisoned".to_string()))?;
        let ulid = generator
            .generate()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(ulid.to_string().to_lowercase())
    }

    /// Generate a new random UUID v4 (polls and options).
    #[must_use]
    pub fn generate_uuid_v4(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a short alphanumeric code for share links.
    #[must_use]
    pub fn generate_short_code(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHORT_CODE_LEN)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate().unwrap();
        let id2 = id_gen.generate().unwrap();

        assert_eq!(id1.len(), 26);
        assert_eq!(id2.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_sequential_ulids_sort_ascending() {
        let first = IdGenerator::new();
        let second = IdGenerator::new();

        // Alternate handles: ordering must hold across them too.
        let ids: Vec<String> = (0..20_000)
            .map(|i| if i % 2 == 0 { &first } else { &second })
            .map(|id_gen| id_gen.generate().unwrap())
            .collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_generate_uuid_v4() {
        let id_gen = IdGenerator::new();
        let id = id_gen.generate_uuid_v4();

        assert_eq!(id.len(), 36); // UUID with hyphens
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generate_short_code() {
        let id_gen = IdGenerator::new();
        let code = id_gen.generate_short_code();

        assert_eq!(code.len(), SHORT_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
