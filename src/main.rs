//! Lala - Voice Assistant Integration Shim
//!
//! Runs the assistant as a daemon or answers a single command.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lala::api::AssistantApi;
use lala::config::Config;
use lala::ipc::{self, IpcClient, IpcServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in offline mode
    #[arg(long)]
    offline: bool,

    /// Maximum total size of on-device models in MB
    #[arg(long)]
    model_size: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// User id for personalisation
    #[arg(long)]
    user_id: Option<u64>,

    /// Wake word
    #[arg(long)]
    wake_word: Option<String>,

    /// Answer from the built-in demo table
    #[arg(long)]
    demo: bool,

    /// Config file path
    #[arg(long, env = "LALA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the assistant with background listening and the IPC socket
    Daemon {
        /// Do not start background listening
        #[arg(long)]
        no_listen: bool,
    },
    /// Process one text command
    Ask { text: Vec<String> },
    /// Record and process one voice command
    Listen,
    /// Print assistant status
    Status,
    /// Print the effective configuration
    Config {
        /// Write it back to the config file
        #[arg(long)]
        save: bool,
    },
    /// Transcribe a mono 16-bit WAV file with a Vosk model
    #[cfg(feature = "vosk")]
    Transcribe {
        wav: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if args.offline {
        config.prefer_offline = true;
    }
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(size) = args.model_size {
        config.model_budget_mb = size;
    }
    if let Some(user_id) = args.user_id {
        config.user_id = Some(user_id);
    }
    if let Some(wake_word) = &args.wake_word {
        config.wake_word = wake_word.clone();
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn initialized_api(config: &Config) -> Result<AssistantApi> {
    let api = AssistantApi::from_config(config).await?;
    let init = api
        .initialize(config.user_id, config.prefer_offline, &config.wake_word)
        .await;
    if !init.success {
        return Err(anyhow::anyhow!(
            "Error initializing assistant: {}",
            init.error.unwrap_or_else(|| "unknown error".to_string())
        ));
    }
    Ok(api)
}

async fn run_daemon(config: &Config, no_listen: bool) -> Result<()> {
    let api = Arc::new(initialized_api(config).await?);
    api.set_result_callback(Arc::new(|result| {
        info!("🗨️ Background command answered: '{}'", result.response);
    }));

    let mut server = IpcServer::new();
    let handler_api = api.clone();
    let runtime = tokio::runtime::Handle::current();
    server.start(move |request| runtime.block_on(ipc::dispatch(&handler_api, request)))?;

    if !no_listen {
        let started = api.start_continuous_listening().await;
        if !started.success {
            warn!("⚠️ Background listening not started: {:?}", started.error);
        }
    }

    info!("✅ Lala ready - say '{}' followed by a command", config.wake_word);
    tokio::signal::ctrl_c().await?;

    info!("👋 Shutting down");
    server.stop();
    api.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    apply_overrides(&mut config, &args);

    // Setup logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🤖 Lala v{} starting...", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Daemon { no_listen: false }) {
        Command::Daemon { no_listen } => run_daemon(&config, no_listen).await,
        Command::Ask { text } => {
            let api = initialized_api(&config).await?;
            let response = api.process_command(&text.join(" ")).await;
            api.shutdown().await;
            print_json(&response)
        }
        Command::Listen => {
            let api = initialized_api(&config).await?;
            let response = api.listen_for_command().await;
            api.shutdown().await;
            print_json(&response)
        }
        Command::Status => {
            let client = IpcClient::new();
            if client.is_daemon_running() {
                return print_json(&client.status()?);
            }
            let api = initialized_api(&config).await?;
            let response = api.status().await;
            api.shutdown().await;
            print_json(&response)
        }
        Command::Config { save } => {
            if save {
                match &args.config {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
                info!("💾 Configuration saved");
            }
            print_json(&config)
        }
        #[cfg(feature = "vosk")]
        Command::Transcribe { wav, model } => {
            use lala::asr::{vosk::VoskDecoder, VoskRecognizer};

            let model = model.unwrap_or_else(|| PathBuf::from(&config.vosk_model_path));
            let mut recognizer = VoskRecognizer::new(VoskDecoder::load(&model)?);
            print_json(&recognizer.process_audio_file(&wav)?)
        }
    }
}
