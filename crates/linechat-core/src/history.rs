//! Append-only message history with startup replay.

use std::{
    io,
    path::{Path, PathBuf},
};

use futures::TryStreamExt;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter},
    sync::mpsc,
};
use tokio_stream::wrappers::LinesStream;

use crate::ChatMessage;

/// History file of formatted chat lines.
///
/// The file is only ever appended to. Replay reads it front to back and
/// must run before the writer starts.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store backed by `path`. The file is created lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every persisted message. A missing file is an empty history.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read.
    pub async fn load(&self) -> io::Result<Vec<ChatMessage>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        LinesStream::new(BufReader::new(file).lines())
            .map_ok(|line| ChatMessage::from_formatted(line.trim_end()))
            .try_collect()
            .await
    }

    /// Push every persisted message into the display sink.
    ///
    /// Returns the number of replayed messages.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read.
    pub async fn replay(&self, sink: &mpsc::UnboundedSender<ChatMessage>) -> io::Result<usize> {
        let history = self.load().await?;
        let count = history.len();
        for msg in history {
            if sink.send(msg).is_err() {
                tracing::debug!("Display sink closed during history replay");
                break;
            }
        }
        Ok(count)
    }

    /// Open the file for appending, creating it and its parent directory.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened.
    pub async fn open_writer(&self) -> io::Result<HistoryWriter> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(HistoryWriter {
            file: BufWriter::new(file),
        })
    }

    /// Append every message from `rx` until all senders are dropped.
    ///
    /// Returns the number of appended messages.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or written.
    pub async fn drain(&self, mut rx: mpsc::UnboundedReceiver<ChatMessage>) -> io::Result<usize> {
        let mut writer = self.open_writer().await?;
        let mut count = 0;
        while let Some(msg) = rx.recv().await {
            writer.append(&msg).await?;
            count += 1;
        }
        tracing::debug!(path = %self.path.display(), count, "History writer finished");
        Ok(count)
    }
}

/// Append handle to the history file.
pub struct HistoryWriter {
    file: BufWriter<File>,
}

impl HistoryWriter {
    /// Append one message as a line and flush it.
    ///
    /// # Errors
    /// Returns error if write fails.
    pub async fn append(&mut self, msg: &ChatMessage) -> io::Result<()> {
        self.file.write_all(msg.as_str().as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await
    }
}
