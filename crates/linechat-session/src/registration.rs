//! One-shot account registration over the send port.

use std::time::Duration;

use linechat_core::ChannelKind;
use linechat_protocol::register;
use tokio::time;

use crate::{ChannelConnection, SessionError};

/// Register `nickname` and return the new account hash.
///
/// The caller is responsible for persisting the hash; it is the token for
/// every later authentication.
///
/// # Errors
/// Returns `Connect` if the server is unreachable, `HandshakeTimeout` if the
/// exchange stalls, or `Handshake` if the server replies with unusable data.
pub async fn register_account(
    host: &str,
    port: u16,
    nickname: &str,
    timeout: Duration,
) -> Result<String, SessionError> {
    let mut conn = ChannelConnection::open(host, port, ChannelKind::Send, None).await?;

    let account_hash = time::timeout(timeout, register(&mut conn.reader, &mut conn.writer, nickname))
        .await
        .map_err(|_| SessionError::HandshakeTimeout(timeout))??;
    tracing::info!(%nickname, "Account registered");

    conn.close().await;
    Ok(account_hash)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linechat_core::ConnectionParameters;
    use tokio::{
        io::{AsyncWriteExt, BufReader},
        net::TcpListener,
        sync::mpsc,
    };

    use super::*;
    use crate::{
        SendChannel,
        test_support::{bind, read_line, unused_port},
    };

    #[tokio::test]
    async fn test_registers_and_returns_hash() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut writer) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            writer.write_all(b"Hello\n").await.unwrap();
            let skip = read_line(&mut reader).await;
            writer.write_all(b"Enter nickname\n").await.unwrap();
            let nickname = read_line(&mut reader).await;
            writer
                .write_all(b"{\"nickname\":\"bob\",\"account_hash\":\"abc123\"}\nok\n")
                .await
                .unwrap();
            (skip, nickname)
        });

        let hash = register_account("127.0.0.1", port, "bob", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(hash, "abc123");

        let (skip, nickname) = server.await.unwrap();
        assert_eq!(skip.as_deref(), Some(""));
        assert_eq!(nickname.as_deref(), Some("bob"));
    }

    /// Accept two connections: register one account, then authenticate it.
    async fn serve_register_then_login(listener: TcpListener) {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        writer.write_all(b"Hello %username%!\n").await.unwrap();
        let _ = read_line(&mut reader).await;
        writer.write_all(b"Enter preferred nickname below:\n").await.unwrap();
        let nickname = read_line(&mut reader).await.unwrap();
        let issued = format!("hash-{nickname}");
        let reply = format!("{{\"nickname\": \"{nickname}\", \"account_hash\": \"{issued}\"}}\n");
        writer.write_all(reply.as_bytes()).await.unwrap();
        writer.write_all(b"Welcome to chat!\n").await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        writer.write_all(b"Hello %username%!\n").await.unwrap();
        let token = read_line(&mut reader).await.unwrap();
        if token == issued {
            let reply = format!("{{\"nickname\": \"{nickname}\", \"account_hash\": \"{token}\"}}\n");
            writer.write_all(reply.as_bytes()).await.unwrap();
            writer.write_all(b"Welcome to chat!\n").await.unwrap();
        } else {
            writer.write_all(b"null\n").await.unwrap();
        }
        time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_registered_token_authenticates_as_nickname() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(serve_register_then_login(listener));

        let token = register_account("127.0.0.1", port, "carol", Duration::from_secs(2))
            .await
            .unwrap();

        let params = ConnectionParameters::new("127.0.0.1", 1, port, token, 2.0).unwrap();
        let (liveness_tx, _liveness) = mpsc::unbounded_channel();
        let (status_tx, _status) = mpsc::unbounded_channel();
        let channel = SendChannel::new(Arc::new(params), liveness_tx, status_tx);
        let (_conn, nickname) = channel.authenticate().await.unwrap();
        assert_eq!(nickname, "carol");
        server.abort();
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let err = register_account("127.0.0.1", port, "bob", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HandshakeTimeout(_)));
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let port = unused_port().await;
        let err = register_account("127.0.0.1", port, "bob", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Connect { port: p, .. } if p == port));
    }
}
