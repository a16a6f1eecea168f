//! Line framing for both chat sockets.

use std::string::FromUtf8Error;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Framing error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Connection closed by peer")]
    Eof,
    #[error("Malformed line: {0}")]
    Decode(#[from] FromUtf8Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Whether this error means the stream is over (peer closed or desync).
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Eof | Self::Decode(_))
    }
}

/// Reads `\n`-terminated UTF-8 lines.
///
/// Partially received bytes survive a cancelled `next_line` call, so a
/// read wrapped in a timeout can simply be retried.
pub struct LineCodec<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineCodec<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(256),
        }
    }

    /// Read the next line with trailing whitespace removed.
    ///
    /// An unterminated tail before EOF is returned as a final line.
    ///
    /// # Errors
    /// Returns `Eof` once the peer has closed, `Decode` on invalid UTF-8.
    pub async fn next_line(&mut self) -> Result<String, CodecError> {
        let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
        if read == 0 && self.buffer.is_empty() {
            return Err(CodecError::Eof);
        }

        let bytes = std::mem::take(&mut self.buffer);
        let line = String::from_utf8(bytes)?;
        Ok(line.trim_end().to_owned())
    }
}

/// Frame a chat message. A blank line marks the end of the message.
#[must_use]
pub fn encode_message(text: &str) -> String {
    format!("{}\n\n", text.trim_end())
}

/// Frame a nickname for registration. Embedded line breaks would end the
/// frame early, so they become `-`.
#[must_use]
pub fn encode_nickname(nickname: &str) -> String {
    let sanitized: String = nickname
        .trim_end()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { '-' } else { c })
        .collect();
    format!("{sanitized}\n")
}

/// Frame an account hash for authentication.
#[must_use]
pub fn encode_token(token: &str) -> String {
    format!("{}\n", token.trim())
}

/// Write a frame and wait for the flush.
///
/// # Errors
/// Returns error if write fails.
pub async fn send_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &str) -> std::io::Result<()> {
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}
