//! CLI entry point for parley

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use parley_agent::{CompletionSettings, TurnError, TurnProcessor};
use parley_core::config::{Config, ConfigLoader};
use parley_core::logging::init_logging;
use parley_core::session::SessionStore;
use parley_core::transcript::TranscriptWriter;
use parley_providers::{OpenAIClient, DEFAULT_API_BASE};
use parley_server::{run_server, AppState, Manager};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "A conversational assistant for the terminal and the browser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send one message and exit instead of starting the interactive loop
        #[arg(short, long)]
        message: Option<String>,
        /// Session identifier (a fresh one is minted when omitted)
        #[arg(short, long)]
        session: Option<String>,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Run the HTTP chat server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Chat {
            message,
            session,
            model,
        } => {
            if let Some(msg) = message {
                run_single_turn(&config, &msg, session, model).await?;
            } else {
                run_chat(&config, session, model).await?;
            }
        }
        Commands::Serve { host, port } => {
            info!("Starting server");
            run_serve(&config, host, port).await?;
        }
        Commands::Status => {
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

fn build_turn_processor(config: &Config, model: Option<String>) -> Result<TurnProcessor> {
    if !config.provider.has_api_key() {
        anyhow::bail!(
            "No API key configured. Set OPENAI_API_KEY (in the environment or a .env file) or provider.api_key in config.json"
        );
    }

    let mut settings = CompletionSettings::from(&config.assistant);
    if let Some(model) = model {
        settings.model = model;
    }

    let provider = Arc::new(OpenAIClient::from_config(
        &config.provider,
        settings.model.clone(),
    ));
    let store = Arc::new(SessionStore::new(config.assistant.resolve_instruction()?));
    let transcripts = if config.transcripts.enabled {
        Some(TranscriptWriter::new(config.transcripts.dir_path())?)
    } else {
        None
    };

    Ok(TurnProcessor::new(store, provider, transcripts, settings))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Thinking...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Whether an interactive input line ends the conversation
fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

fn print_reply(reply: Option<&str>) {
    match reply.filter(|r| !r.is_empty()) {
        Some(text) => println!("{} {}", style("Assistant:").bold().green(), text),
        None => println!(
            "{} {}",
            style("Assistant:").bold().green(),
            style("(no reply)").dim()
        ),
    }
}

/// Send one message and print the reply
async fn run_single_turn(
    config: &Config,
    message: &str,
    session: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let turns = build_turn_processor(config, model)?;
    let session_id = session.unwrap_or_else(|| turns.new_session());

    let pb = spinner();
    let result = turns.handle_turn(&session_id, message).await;
    pb.finish_and_clear();

    match result {
        Ok(reply) => {
            print_reply(reply.as_deref());
            Ok(())
        }
        Err(TurnError::PersistenceFailed { reply, source }) => {
            print_reply(Some(reply.as_str()));
            anyhow::bail!("Failed to save transcript: {}", source)
        }
        Err(e) => anyhow::bail!("Failed to process message: {}", e),
    }
}

/// Interactive loop over stdin
async fn run_chat(config: &Config, session: Option<String>, model: Option<String>) -> Result<()> {
    let turns = build_turn_processor(config, model)?;
    let session_id = session.unwrap_or_else(|| turns.new_session());
    turns.store().get_or_create(&session_id);

    println!("{}", style("parley").bold().cyan());
    println!(
        "Model: {}  Session: {}",
        turns.settings().model,
        style(&session_id).dim()
    );
    println!("Type {} to save and quit.\n", style("exit").bold());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("You:").bold().blue());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            break;
        }

        let pb = spinner();
        let result = turns.handle_turn(&session_id, input).await;
        pb.finish_and_clear();

        match result {
            Ok(reply) => print_reply(reply.as_deref()),
            Err(TurnError::PersistenceFailed { reply, source }) => {
                print_reply(Some(reply.as_str()));
                eprintln!(
                    "{} transcript not saved: {}",
                    style("Warning:").yellow(),
                    source
                );
            }
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
            }
        }
    }

    match turns.persist_session(&session_id).await {
        Ok(Some(paths)) => println!(
            "{} {}",
            style("Conversation saved to").dim(),
            paths.text.display()
        ),
        Ok(None) => {}
        Err(e) => {
            error!("Failed to save conversation: {}", e);
            anyhow::bail!("Failed to save conversation: {}", e);
        }
    }
    println!("{}", style("Goodbye!").cyan());
    Ok(())
}

async fn run_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let turns = Arc::new(build_turn_processor(config, None)?);

    println!("{}", style("Starting parley server...").bold().cyan());
    println!("Model: {}", turns.settings().model);
    if turns.persists_transcripts() {
        println!("Transcripts: {}", config.transcripts.dir_path().display());
    } else {
        println!("Transcripts: {}", style("disabled").dim());
    }

    let (api_tx, api_rx) = mpsc::channel(100);
    let manager_handle = tokio::spawn(async move {
        if let Err(e) = Manager::new(api_rx, turns).run().await {
            error!("Manager loop error: {}", e);
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => println!("\n{}", style("Shutting down...").yellow()),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    println!(
        "\n{}",
        style(format!(
            "Server running at http://{}:{}. Press Ctrl+C to stop.",
            host, port
        ))
        .green()
    );

    run_server(AppState::new(api_tx), &host, port, shutdown_rx).await?;
    manager_handle.abort();
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    let on_off = |enabled: bool| {
        if enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        }
    };

    println!("{}", style("parley status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!();

    println!("{}", style("Assistant:").bold());
    println!("  Model: {}", config.assistant.model);
    println!("  Temperature: {}", config.assistant.temperature);
    println!("  Max tokens: {}", config.assistant.max_tokens);
    if let Some(file) = &config.assistant.instruction_file {
        println!("  Instruction file: {}", file);
    }
    println!();

    println!("{}", style("Provider:").bold());
    println!(
        "  API base: {}",
        config.provider.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    );
    let key_status = if config.provider.has_api_key() {
        style("configured").green()
    } else {
        style("not configured").red()
    };
    println!("  API key: {}", key_status);
    println!();

    println!("{}", style("Transcripts:").bold());
    println!("  Saving: {}", on_off(config.transcripts.enabled));
    println!("  Directory: {}", config.transcripts.dir_path().display());
    println!();

    println!("{}", style("Server:").bold());
    println!("  Address: http://{}:{}", config.server.host, config.server.port);
}
