//! Voter identity.

use pollcast_common::{AppError, AppResult};
use pollcast_db::entities::{FINGERPRINT_MAX_LEN, USER_ID_MAX_LEN};

/// Who is casting (or viewing) a vote.
///
/// Authenticated callers are identified by user id. Anonymous callers bring an
/// opaque fingerprint token; identical tokens count as the same voter and
/// nothing more is done to tie tokens together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoterIdentity {
    /// Authenticated user id.
    User(String),
    /// Caller-supplied anonymous fingerprint.
    Anonymous(String),
}

impl VoterIdentity {
    /// Resolve an identity from what the authentication layer handed us.
    ///
    /// A user id wins over a fingerprint. Blank values count as absent.
    #[must_use]
    pub fn resolve(user_id: Option<&str>, fingerprint: Option<&str>) -> Option<Self> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        user_id
            .filter(non_blank)
            .map(|id| Self::User(id.to_string()))
            .or_else(|| {
                fingerprint
                    .filter(non_blank)
                    .map(|fp| Self::Anonymous(fp.to_string()))
            })
    }

    /// Key used for the one-vote-per-poll constraint.
    ///
    /// Namespaced so a fingerprint can never collide with a user id.
    #[must_use]
    pub fn voter_key(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Anonymous(fingerprint) => format!("anon:{fingerprint}"),
        }
    }

    /// The authenticated user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous(_) => None,
        }
    }

    /// The anonymous fingerprint, if any.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Anonymous(fingerprint) => Some(fingerprint),
        }
    }

    /// Rejects blank identities and ones wider than the vote columns.
    pub(crate) fn validate(&self) -> AppResult<()> {
        let (value, max_len) = match self {
            Self::User(id) => (id, USER_ID_MAX_LEN),
            Self::Anonymous(fingerprint) => (fingerprint, FINGERPRINT_MAX_LEN),
        };
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "Voter identity cannot be empty".to_string(),
            ));
        }
        if value.chars().count() > max_len {
            return Err(AppError::Validation(format!(
                "Voter identity cannot exceed {max_len} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_user() {
        let voter = VoterIdentity::resolve(Some("u1"), Some("fp"));
        assert_eq!(voter, Some(VoterIdentity::User("u1".to_string())));
    }

    #[test]
    fn test_resolve_falls_back_to_fingerprint() {
        let voter = VoterIdentity::resolve(Some("  "), Some("fp"));
        assert_eq!(voter, Some(VoterIdentity::Anonymous("fp".to_string())));
        assert_eq!(VoterIdentity::resolve(None, None), None);
    }

    #[test]
    fn test_voter_keys_are_namespaced() {
        let user = VoterIdentity::User("abc".to_string());
        let anon = VoterIdentity::Anonymous("abc".to_string());
        assert_ne!(user.voter_key(), anon.voter_key());
        assert_eq!(user.voter_key(), "user:abc");
    }

    #[test]
    fn test_blank_identity_is_rejected() {
        let voter = VoterIdentity::Anonymous(" ".to_string());
        assert!(matches!(voter.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_identity_length_is_bounded() {
        let fingerprint = VoterIdentity::Anonymous("f".repeat(FINGERPRINT_MAX_LEN));
        assert!(fingerprint.validate().is_ok());
        let fingerprint = VoterIdentity::Anonymous("f".repeat(FINGERPRINT_MAX_LEN + 1));
        assert!(matches!(fingerprint.validate(), Err(AppError::Validation(_))));

        // Counted in characters, like the varchar columns.
        let user = VoterIdentity::User("é".repeat(USER_ID_MAX_LEN));
        assert!(user.validate().is_ok());
        let user = VoterIdentity::User("u".repeat(USER_ID_MAX_LEN + 1));
        assert!(matches!(user.validate(), Err(AppError::Validation(_))));
    }
}
