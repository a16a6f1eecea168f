//! Fake chat server pieces for channel and supervisor tests.

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

pub async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let (listener, port) = bind().await;
    drop(listener);
    port
}

pub async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

/// Read one chat message: lines up to the terminating blank line.
pub async fn read_frame(reader: &mut BufReader<OwnedReadHalf>) -> Option<String> {
    let mut lines = Vec::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            return Some(lines.join("\n"));
        }
        lines.push(line);
    }
}

/// Play the server side of the authentication handshake.
///
/// Answers with `nickname`'s account, or `null` when `nickname` is `None`.
/// Returns the received token and the socket halves.
pub async fn serve_auth(
    stream: TcpStream,
    nickname: Option<&str>,
) -> (String, BufReader<OwnedReadHalf>, OwnedWriteHalf) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(b"Hello %username%! Enter your personal hash or leave it empty to create new account.\n")
        .await
        .unwrap();
    let token = read_line(&mut reader).await.unwrap_or_default();

    match nickname {
        Some(nickname) => {
            let reply = format!("{{\"nickname\": \"{nickname}\", \"account_hash\": \"{token}\"}}\n");
            write_half.write_all(reply.as_bytes()).await.unwrap();
            write_half
                .write_all(b"Welcome to chat! Post your message below. End it with an empty line.\n")
                .await
                .unwrap();
        }
        None => write_half.write_all(b"null\n").await.unwrap(),
    }

    (token, reader, write_half)
}
