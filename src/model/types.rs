//! Small validated value types shared across the op and conflict models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated 40-character lowercase hex commit hash.
///
/// Used in [`crate::model::op::Provenance::commit`] and returned by the VCS
/// snapshot collaborator. Validation happens at construction so the rest of
/// the core can treat the value as opaque and already well-formed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Create a new `CommitHash`, validating format.
    ///
    /// # Errors
    /// Returns an error if the string is not exactly 40 lowercase hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.len() != 40 {
            return Err(ValidationError {
                value: s.to_owned(),
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(ValidationError {
                value: s.to_owned(),
                reason: "must contain only lowercase hex characters (0-9, a-f)".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CommitHash> for String {
    fn from(v: CommitHash) -> Self {
        v.0
    }
}

/// A validation error for a core value type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_hash_accepts_valid_sha1() {
        let hash = "a".repeat(40);
        assert!(CommitHash::new(hash).is_ok());
    }

    #[test]
    fn commit_hash_rejects_wrong_length() {
        assert!(CommitHash::new("abc").is_err());
    }

    #[test]
    fn commit_hash_rejects_uppercase() {
        let hash = "A".repeat(40);
        assert!(CommitHash::new(hash).is_err());
    }

    #[test]
    fn commit_hash_round_trips_through_string() {
        let hash = "b".repeat(40);
        let typed = CommitHash::new(hash.clone()).expect("valid hash");
        let back: String = typed.into();
        assert_eq!(back, hash);
    }
}
