//! Account data returned by the server during handshakes.

use serde::{Deserialize, Serialize};

/// Identity decoded from the server's JSON control line.
///
/// `account_hash` is the durable credential; `nickname` is what the
/// server displays for this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub nickname: String,
    pub account_hash: String,
}

impl AccountIdentity {
    /// Parse a control line. `null` or an empty line means no account.
    ///
    /// # Errors
    /// Returns error if the line is not valid account JSON.
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account() {
        let parsed =
            AccountIdentity::parse(r#"{"nickname": "bob", "account_hash": "abc123", "extra": 1}"#)
                .unwrap()
                .unwrap();
        assert_eq!(parsed.nickname, "bob");
        assert_eq!(parsed.account_hash, "abc123");
    }

    #[test]
    fn test_null_and_empty_mean_no_account() {
        assert_eq!(AccountIdentity::parse("null").unwrap(), None);
        assert_eq!(AccountIdentity::parse("  ").unwrap(), None);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(AccountIdentity::parse("Welcome to chat!").is_err());
        assert!(AccountIdentity::parse(r#"{"nickname": "bob"}"#).is_err());
    }
}
