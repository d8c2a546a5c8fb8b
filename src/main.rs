//! Deskpilot CLI
//!
//! Interactive assistant REPL plus offline tools for trying the classifier
//! and the page extractor against local files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deskpilot::intent_parser::IntentParser;
use deskpilot::lexicon::Lexicon;
use deskpilot::llm_connector::{ChatClient, OllamaClient};
use deskpilot::{action_context, headline_filter, page_extractor};
use deskpilot::{spawn_session, Assistant, AssistantConfig, ReplyCategory};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(about = "Desktop assistant - acts on your requests, then talks about it", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chat model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the Ollama server
    #[arg(long, value_name = "URL")]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive assistant (default)
    Repl,

    /// Classify a request and print the intent
    Classify {
        /// Request text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Extract a page digest from a local HTML file
    Extract {
        file: PathBuf,

        /// URL the page was served from, used to resolve links
        #[arg(long, default_value = "")]
        url: String,

        /// Deep single-page analysis instead of the broad digest
        #[arg(long)]
        analyze: bool,
    },

    /// Run news headline extraction and filtering on a local HTML file
    Headlines { file: PathBuf },

    /// Check whether the chat endpoint is reachable
    Probe,

    /// Show the effective configuration
    Info,
}

fn load_config(cli: &Cli) -> Result<AssistantConfig> {
    let mut config = match &cli.config {
        Some(path) => AssistantConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AssistantConfig::default(),
    };
    config.apply_env();

    // Override with CLI options
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.ollama_url = url.clone();
    }
    Ok(config)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .init();
    if let Some(path) = &cli.config {
        log::info!("loaded config from {}", path.display());
    }

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => run_repl(config).await?,
        Commands::Classify { text } => classify(&config, &text.join(" "))?,
        Commands::Extract { file, url, analyze } => extract(&file, &url, analyze)?,
        Commands::Headlines { file } => headlines(&file)?,
        Commands::Probe => probe(&config).await?,
        Commands::Info => show_info(&config)?,
    }

    Ok(())
}

fn classify(config: &AssistantConfig, input: &str) -> Result<()> {
    let parser = IntentParser::new(Arc::new(Lexicon::with_overrides(&config.sites, &config.programs)));
    let intent = parser.classify(input);

    println!("{}", serde_json::to_string_pretty(&intent)?);
    match parser.explain(&intent) {
        Some(explanation) if intent.confidence >= config.min_action_confidence => {
            println!("✓ {}", explanation)
        }
        Some(explanation) => println!("⚠ {} (below {:.2}, left to the chat model)", explanation, config.min_action_confidence),
        None => println!("→ chat"),
    }
    Ok(())
}

fn read_html(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn extract(file: &Path, url: &str, analyze: bool) -> Result<()> {
    let html = read_html(file)?;
    let json = if analyze {
        serde_json::to_string_pretty(&page_extractor::analyze_page(&html, url, ""))?
    } else {
        serde_json::to_string_pretty(&page_extractor::extract_digest(&html, url, ""))?
    };
    println!("{}", json);
    Ok(())
}

fn headlines(file: &Path) -> Result<()> {
    let html = read_html(file)?;
    let candidates = page_extractor::news_candidates(&html);
    log::info!(
        "{} primary and {} secondary candidates",
        candidates.primary.len(),
        candidates.secondary.len()
    );

    let headlines = headline_filter::collect_headlines(&candidates.primary, &candidates.secondary);
    println!("{}", action_context::headline_list(&headlines));
    Ok(())
}

async fn probe(config: &AssistantConfig) -> Result<()> {
    let client = OllamaClient::new(config)?;
    if client.probe().await {
        println!("● Connected: {}", client.model_info());
    } else {
        println!("● Disconnected: {}", client.model_info());
        println!("  Make sure Ollama is running (ollama serve).");
    }
    Ok(())
}

fn show_info(config: &AssistantConfig) -> Result<()> {
    println!("Deskpilot {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Run interactive REPL
async fn run_repl(config: AssistantConfig) -> Result<()> {
    println!("Deskpilot - type a request, /help for commands, exit to quit\n");

    let assistant = Assistant::with_defaults(config)?;
    let (session, mut replies) = spawn_session(assistant)?;

    // Replies arrive whenever the worker produces them
    let printer = tokio::spawn(async move {
        while let Some(reply) = replies.recv().await {
            let marker = match reply.category {
                ReplyCategory::Error => "!",
                ReplyCategory::System => "*",
                _ => ">",
            };
            println!("\n{} [{}] {}\n", marker, reply.sender, reply.text);
            print!("> ");
            let _ = std::io::stdout().flush();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                let cancelled = session.cancel_all();
                if cancelled > 0 {
                    println!("\ncancelled {} request(s)", cancelled);
                    continue;
                }
                None
            }
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                print!("\x1B[2J\x1B[H");
                continue;
            }
            "/cancel" => {
                println!("cancelled {} request(s)", session.cancel_all());
                continue;
            }
            _ => {}
        }

        let status = session.status();
        if status.busy {
            log::debug!("queued behind {} pending request(s)", session.pending());
        }
        session.submit(input)?;
    }

    session.shutdown().await?;
    printer.abort();
    println!("Goodbye!");
    Ok(())
}
