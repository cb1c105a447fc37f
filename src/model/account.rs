//! Account identifiers.

use std::fmt;

use crate::error::{Result, StoreError};

/// Longest accepted account identifier, in bytes.
const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Opaque identifier of the account an attachment belongs to.
///
/// Existence of the account is the caller's concern. The only requirement
/// here is that the identifier can serve as a single directory name under
/// the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validate and wrap an account identifier.
    ///
    /// Surrounding whitespace is trimmed. Empty identifiers, path separators,
    /// `.`/`..`, leading dots and control characters are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(StoreError::invalid("account id must not be empty"));
        }
        if id.len() > MAX_ACCOUNT_ID_LEN {
            return Err(StoreError::invalid(format!(
                "account id longer than {MAX_ACCOUNT_ID_LEN} bytes"
            )));
        }
        if id.starts_with('.') {
            return Err(StoreError::invalid(format!(
                "account id '{id}' must not start with '.'"
            )));
        }
        if id
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
        {
            return Err(StoreError::invalid(format!(
                "account id '{}' contains a path separator or control character",
                id.escape_debug()
            )));
        }
        Ok(Self(id.to_string()))
    }

    /// The identifier as a string slice (also its directory name).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<String> for AccountId {
    type Error = StoreError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = StoreError;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::str::FromStr for AccountId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_ids() {
        assert_eq!(AccountId::parse("42").unwrap().as_str(), "42");
        assert_eq!(AccountId::parse("  checking-01 ").unwrap().as_str(), "checking-01");
        assert_eq!(AccountId::from(7u64).as_str(), "7");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            AccountId::parse("   "),
            Err(StoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        for bad in ["..", ".", "../etc", "a/b", "a\\b", ".hidden", "c:x", "a\0b"] {
            assert!(AccountId::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_rejects_overlong() {
        let long = "a".repeat(MAX_ACCOUNT_ID_LEN + 1);
        assert!(AccountId::parse(&long).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: AccountId = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(ok.as_str(), "17");
        assert!(serde_json::from_str::<AccountId>("\"../x\"").is_err());
    }
}
