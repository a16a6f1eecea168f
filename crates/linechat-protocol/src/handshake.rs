//! Registration and authentication exchanges on the send socket.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    AccountIdentity,
    codec::{CodecError, LineCodec, encode_nickname, encode_token, send_frame},
};

/// Handshake error.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("Token is not known to the server")]
    InvalidToken,
    #[error("Server returned no account data")]
    InvalidAccountData,
    #[error("Malformed account data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Register a new account and return its account hash.
///
/// Persisting the hash is up to the caller.
///
/// # Errors
/// Returns `InvalidAccountData` if the server answers `null`, or a framing
/// error if the exchange breaks off.
pub async fn register<R, W>(
    reader: &mut LineCodec<R>,
    writer: &mut W,
    nickname: &str,
) -> Result<String, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = reader.next_line().await?;
    tracing::debug!(%greeting, "Registration greeting");

    send_frame(writer, "\n").await?;
    let prompt = reader.next_line().await?;
    tracing::debug!(%prompt, "Registration prompt");

    send_frame(writer, &encode_nickname(nickname)).await?;
    let reply = reader.next_line().await?;
    let account = AccountIdentity::parse(&reply)?.ok_or(HandshakeError::InvalidAccountData)?;

    let confirmation = reader.next_line().await?;
    tracing::info!(
        nickname = %account.nickname,
        %confirmation,
        "Registered new account"
    );

    Ok(account.account_hash)
}

/// Authenticate with an existing token and return the resolved nickname.
///
/// # Errors
/// Returns `InvalidToken` if the server answers `null`. The same token
/// should not be retried.
pub async fn authorize<R, W>(
    reader: &mut LineCodec<R>,
    writer: &mut W,
    token: &str,
) -> Result<String, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = reader.next_line().await?;
    tracing::debug!(%greeting, "Authentication greeting");

    send_frame(writer, &encode_token(token)).await?;
    let reply = reader.next_line().await?;
    let account = AccountIdentity::parse(&reply)?.ok_or(HandshakeError::InvalidToken)?;

    let confirmation = reader.next_line().await?;
    tracing::debug!(%confirmation, nickname = %account.nickname, "Authenticated");

    Ok(account.nickname)
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn test_register_returns_account_hash() {
        let mock = Builder::new()
            .read(b"Hello\n")
            .write(b"\n")
            .read(b"Enter nickname\n")
            .write(b"bob\n")
            .read(b"{\"nickname\":\"bob\",\"account_hash\":\"abc123\"}\n")
            .read(b"ok\n")
            .build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let hash = register(&mut reader, &mut write_half, "bob").await.unwrap();
        assert_eq!(hash, "abc123");
    }

    #[tokio::test]
    async fn test_register_sanitizes_nickname() {
        let mock = Builder::new()
            .read(b"Hello\n")
            .write(b"\n")
            .read(b"Enter nickname\n")
            .write(b"two-lines\n")
            .read(b"{\"nickname\":\"two-lines\",\"account_hash\":\"h\"}\n")
            .read(b"ok\n")
            .build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let hash = register(&mut reader, &mut write_half, "two\nlines").await.unwrap();
        assert_eq!(hash, "h");
    }

    #[tokio::test]
    async fn test_register_null_reply() {
        let mock = Builder::new()
            .read(b"Hello\n")
            .write(b"\n")
            .read(b"Enter nickname\n")
            .write(b"bob\n")
            .read(b"null\n")
            .build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let err = register(&mut reader, &mut write_half, "bob").await.unwrap_err();
        assert!(matches!(err, HandshakeError::InvalidAccountData));
    }

    #[tokio::test]
    async fn test_authorize_resolves_nickname() {
        let mock = Builder::new()
            .read(b"Hello %username%! Enter your personal hash\n")
            .write(b"abc123\n")
            .read(b"{\"nickname\": \"bob\", \"account_hash\": \"abc123\"}\n")
            .read(b"Welcome to chat! Post your message below.\n")
            .build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let nickname = authorize(&mut reader, &mut write_half, "abc123").await.unwrap();
        assert_eq!(nickname, "bob");
    }

    #[tokio::test]
    async fn test_authorize_unknown_token() {
        let mock = Builder::new()
            .read(b"Hello\n")
            .write(b"nope\n")
            .read(b"null\n")
            .build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let err = authorize(&mut reader, &mut write_half, "nope").await.unwrap_err();
        assert!(matches!(err, HandshakeError::InvalidToken));
    }

    #[tokio::test]
    async fn test_authorize_peer_hangs_up() {
        let mock = Builder::new().read(b"Hello\n").write(b"abc\n").build();
        let (read_half, mut write_half) = tokio::io::split(mock);
        let mut reader = LineCodec::new(read_half);

        let err = authorize(&mut reader, &mut write_half, "abc").await.unwrap_err();
        assert!(matches!(err, HandshakeError::Codec(CodecError::Eof)));
    }
}
