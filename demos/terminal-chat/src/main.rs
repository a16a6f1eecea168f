//! Terminal client for the line-oriented chat server.
//!
//! Run with: cargo run -p terminal-chat -- chat
//!
//! Settings come from flags, the environment or a `.env` file in the
//! working directory. Type a line and press Enter to post it; Ctrl-C or
//! end of input quits.

mod env_file;

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use linechat_core::{ConnectionParameters, ConnectionState, HistoryStore, StatusEvent};
use linechat_session::{
    ConnectionSupervisor, FaultPolicy, SessionError, SupervisorOptions, register_account,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "terminal-chat")]
#[command(about = "Read and post messages on a line-oriented chat server")]
struct Cli {
    /// Chat server host
    #[arg(long, env = "CHAT_HOST", default_value = "minechat.dvmn.org")]
    host: String,

    /// Port of the read-only channel
    #[arg(long, env = "CHAT_READ_PORT", default_value_t = 5000)]
    read_port: u16,

    /// Port of the authenticated send channel
    #[arg(long, env = "CHAT_SEND_PORT", default_value_t = 5050)]
    send_port: u16,

    /// Seconds a read, flush or handshake may take
    #[arg(long, env = "CHAT_TIMEOUT", default_value_t = 3.0)]
    timeout: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and store its token as CHAT_TOKEN
    Register {
        /// Nickname to register
        #[arg(long)]
        nick: String,

        /// Dotenv file that receives the token
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },
    /// Join the chat
    Chat {
        /// Account token returned by `register`
        #[arg(long, env = "CHAT_TOKEN", hide_env_values = true)]
        token: String,

        /// File that keeps received messages across runs
        #[arg(long, env = "CHAT_HISTORY")]
        history: Option<PathBuf>,

        /// Hide messages from nicknames containing these words
        #[arg(long, value_delimiter = ',')]
        mute: Vec<String>,

        /// Consecutive missed timeouts on one channel before reconnecting
        #[arg(long, default_value_t = 1)]
        max_timeouts: u32,

        /// Send an empty frame after this many idle seconds
        #[arg(long)]
        keepalive: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Register { ref nick, ref env_file } => {
            let params =
                ConnectionParameters::new(&cli.host, cli.read_port, cli.send_port, "", cli.timeout)?;
            let token = register_account(params.host(), params.send_port(), nick, params.timeout())
                .await
                .context("Registration failed")?;
            env_file::upsert(env_file, "CHAT_TOKEN", &token)
                .await
                .with_context(|| format!("Failed to write {}", env_file.display()))?;
            println!("Registered {nick}; token saved to {}", env_file.display());
            Ok(())
        }
        Command::Chat {
            ref token,
            ref history,
            ref mute,
            max_timeouts,
            keepalive,
        } => {
            let params =
                ConnectionParameters::new(&cli.host, cli.read_port, cli.send_port, token, cli.timeout)?;
            let keepalive = keepalive
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("Invalid keepalive period")?;
            let options = SupervisorOptions {
                fault_policy: FaultPolicy {
                    max_consecutive_timeouts: max_timeouts,
                },
                muted_nicknames: mute.clone(),
                keepalive,
            };
            let history = history.clone().unwrap_or_else(default_history_path);
            chat(params, HistoryStore::new(history), options).await
        }
    }
}

fn default_history_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linechat")
        .join("history.txt")
}

async fn chat(
    params: ConnectionParameters,
    history: HistoryStore,
    options: SupervisorOptions,
) -> anyhow::Result<()> {
    tracing::info!(history = %history.path().display(), "Starting chat");

    let (supervisor, handle) = ConnectionSupervisor::new(params, history, options);
    let (mut messages, mut status, outgoing, interrupt) = handle.split();
    let (tap_tx, mut tap) = mpsc::unbounded_channel();

    tokio::spawn(forward_stdin(outgoing));
    let ctrl_c = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.interrupt();
        }
    });

    let run = supervisor.with_liveness_tap(tap_tx).run();
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Some(msg) = messages.recv() => println!("{msg}"),
            Some(event) = status.recv() => println!("{}", describe(&event)),
            Some(event) = tap.recv() => tracing::debug!("{}", event.notification()),
        }
    };

    while let Ok(msg) = messages.try_recv() {
        println!("{msg}");
    }
    while let Ok(event) = status.try_recv() {
        println!("{}", describe(&event));
    }

    match result {
        Err(e @ SessionError::InvalidToken) => Err(anyhow::Error::new(e)
            .context("Check CHAT_TOKEN or run `terminal-chat register`")),
        other => other.map_err(Into::into),
    }
}

/// Post every stdin line; end of input closes the outgoing queue.
async fn forward_stdin(outgoing: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                if outgoing.send(line).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to read input: {e}");
                return;
            }
        }
    }
}

fn describe(event: &StatusEvent) -> String {
    let state = |state: &ConnectionState| match state {
        ConnectionState::Initiated => "connecting",
        ConnectionState::Established => "connected",
        ConnectionState::Closed => "closed",
    };
    match event {
        StatusEvent::Read(s) => format!("* read channel {}", state(s)),
        StatusEvent::Send(s) => format!("* send channel {}", state(s)),
        StatusEvent::NicknameResolved(nickname) => format!("* logged in as {nickname}"),
    }
}
