//! Fixed-step coaching dialogue over Gemini-backed sub-agents.
//!
//! `coach chat` runs an interactive session: each user message is routed
//! through the research → reassurance → options → completion sequence, and
//! only the asker's (and the router's closing) text is shown.

use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use coach::agents::AgentSet;
use coach::core::event::Author;
use coach::io::config::{CoachConfig, load_config, write_config};
use coach::io::model::GeminiClient;
use coach::io::search::GroundedSearch;
use coach::session::Session;
use coach::turn::{TurnConfig, run_turn};

const DEFAULT_CONFIG_PATH: &str = "coach.toml";

#[derive(Parser)]
#[command(name = "coach", version, about = "Scripted emotional-coaching dialogue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive coaching session.
    Chat {
        /// Path to the TOML config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Override the configured model name.
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Write a default config file.
    Init {
        /// Path to write the config to.
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    coach::logging::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat { config, model } => cmd_chat(&config, model),
        Command::Init { config, force } => cmd_init(&config, force),
    }
}

fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &CoachConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_chat(config_path: &PathBuf, model_override: Option<String>) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    if let Some(model) = model_override {
        cfg.model = model;
    }

    let api_key = read_api_key();
    if api_key.is_empty() {
        // Degraded mode: the session still starts, but model calls will fail
        // with a descriptive error on each turn.
        warn!("GEMINI_API_KEY / GOOGLE_API_KEY not set; model calls will fail");
    }

    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let model = GeminiClient::new(api_key.clone(), cfg.model.clone(), timeout)?;
    let search = GroundedSearch::new(api_key, cfg.model.clone(), timeout)?;
    let agents = AgentSet::standard();
    let turn_config = TurnConfig::from(&cfg);
    let mut session = Session::new();

    println!("--- coaching session {} (type 'quit' to exit) ---", session.id);
    let stdin = std::io::stdin();
    loop {
        print!("\nUSER: ");
        std::io::stdout().flush().context("flush stdout")?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).context("read input")?;
        if read == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        match run_turn(&mut session, text, &agents, &model, &search, &turn_config) {
            Ok(events) => {
                for event in events {
                    let Some(content) = event.text else { continue };
                    match event.author {
                        Author::Asker => println!("AGENT: {content}"),
                        Author::Router => println!("SYSTEM: {content}"),
                        // Researcher/clarifier output stays internal.
                        _ => {}
                    }
                }
            }
            Err(err) => eprintln!("turn failed: {err:#}"),
        }
    }

    Ok(())
}

fn read_api_key() -> String {
    std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("GOOGLE_API_KEY"))
        .unwrap_or_default()
}
