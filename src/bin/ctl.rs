//! Lala control client
//!
//! Talks to a running `lala daemon` over its socket.
//! Run with: cargo run --bin lala-ctl -- ask "abre mapas"

use anyhow::Result;
use clap::{Parser, Subcommand};
use lala::api::ConfigUpdate;
use lala::ipc::IpcClient;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Control a running Lala daemon")]
struct Args {
    /// Socket path (defaults to /tmp/lala-$USER.sock)
    #[arg(long, env = "LALA_SOCKET")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a text command
    Ask { text: Vec<String> },
    /// Record one voice command
    Listen,
    /// Start continuous listening
    Start,
    /// Stop continuous listening
    Stop,
    /// Change wake word and/or offline preference
    Config {
        #[arg(long)]
        wake_word: Option<String>,
        #[arg(long)]
        offline: Option<bool>,
    },
    /// Show daemon status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let args = Args::parse();
    let client = args.socket.map(IpcClient::at).unwrap_or_default();

    if !client.is_daemon_running() {
        return Err(anyhow::anyhow!("Lala daemon is not running"));
    }

    let response = match args.command {
        Command::Ask { text } => client.command(&text.join(" "))?,
        Command::Listen => client.listen()?,
        Command::Start => client.start_listening()?,
        Command::Stop => client.stop_listening()?,
        Command::Config { wake_word, offline } => client.update_config(ConfigUpdate {
            wake_word,
            prefer_offline: offline,
        })?,
        Command::Status => client.status()?,
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
