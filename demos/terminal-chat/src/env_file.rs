//! Minimal `.env` editing for storing the account token.

use std::{io, path::Path};

/// Set `key` to `value` in the dotenv file at `path`.
///
/// An existing assignment is replaced in place; otherwise the pair is
/// appended. Other lines are kept untouched.
///
/// # Errors
/// Returns error if the file exists but cannot be read, or cannot be written.
pub async fn upsert(path: &Path, key: &str, value: &str) -> io::Result<()> {
    let current = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let assignment = format!("{key}={value}");
    let prefix = format!("{key}=");
    let mut replaced = false;
    let mut lines: Vec<String> = current
        .lines()
        .map(|line| {
            if !replaced && line.trim_start().starts_with(&prefix) {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(assignment);
    }

    let mut text = lines.join("\n");
    text.push('\n');
    tokio::fs::write(path, text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        upsert(&path, "CHAT_TOKEN", "abc123").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "CHAT_TOKEN=abc123\n");
    }

    #[tokio::test]
    async fn test_replaces_existing_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        tokio::fs::write(&path, "CHAT_HOST=localhost\nCHAT_TOKEN=old\n# note\n")
            .await
            .unwrap();

        upsert(&path, "CHAT_TOKEN", "new").await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "CHAT_HOST=localhost\nCHAT_TOKEN=new\n# note\n"
        );
    }

    #[tokio::test]
    async fn test_appends_when_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        tokio::fs::write(&path, "CHAT_HOST=localhost").await.unwrap();

        upsert(&path, "CHAT_TOKEN", "abc").await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "CHAT_HOST=localhost\nCHAT_TOKEN=abc\n"
        );
    }
}
