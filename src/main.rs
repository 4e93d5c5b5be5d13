//! medfuse: hybrid biomedical question answering
//!
//! Thin CLI shell over the fusion engine: load config, run one question,
//! print the fused answer.

use anyhow::Result;
use clap::Parser;
use medfuse::config::{Config, LogFormat};
use medfuse::FusionEngine;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "medfuse")]
#[command(about = "Hybrid biomedical question answering over papers and a knowledge graph")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Maximum number of papers to retrieve
    #[arg(short, long)]
    limit: Option<usize>,

    /// The question to answer (read from stdin if omitted)
    question: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config);

    let question = if cli.question.is_empty() {
        print!("Enter your question: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim().to_string()
    } else {
        cli.question.join(" ")
    };

    info!("Processing question: {}", question);
    let engine = FusionEngine::from_config(&config)?;
    let answer = engine.answer_question(&question, cli.limit).await?;

    println!("\n{}", answer.text);
    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
