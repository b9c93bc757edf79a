use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fighter_rag::commands::{
    ask_question, build_index, show_facts, show_prune_report, show_status, show_summary,
    start_chat, transcribe,
};
use fighter_rag::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fighter-rag")]
#[command(about = "Clean MMA fight records and chat about a fighter with retrieval-augmented answers")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.fighter-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Source CSV file, overriding the configured path
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding server, chat API and data source
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Show dataset diagnostics and the focus fighter's record
    Summary,
    /// Report missing values and the rows a pruning pass would drop
    Prune {
        /// Drop rows missing more than this percentage of values
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Build the vector collection from the source file
    Index {
        /// Rebuild even if the source has not changed
        #[arg(long)]
        rebuild: bool,
    },
    /// Answer a single question
    Ask {
        question: String,
    },
    /// Start the interactive chat shell
    Chat,
    /// Transcribe a WAV file to text
    Transcribe {
        file: PathBuf,
    },
    /// Show the fact panels
    Facts,
    /// Show the state of the embedding server, collection and source data
    Status,
}

fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => Config::default_dir().context("Failed to locate configuration directory"),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(config_dir(cli)?)?;
    if let Some(data) = &cli.data {
        config.data.source_path.clone_from(data);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show } = cli.command {
        let config_dir = config_dir(&cli)?;
        if show {
            show_config(&config_dir)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Summary => show_summary(&config)?,
        Commands::Prune { threshold } => show_prune_report(&config, threshold)?,
        Commands::Index { rebuild } => build_index(&config, rebuild).await?,
        Commands::Ask { question } => ask_question(&config, &question).await?,
        Commands::Chat => start_chat(&config).await?,
        Commands::Transcribe { file } => transcribe(&config, &file)?,
        Commands::Facts => show_facts(),
        Commands::Status => show_status(&config).await?,
    }

    Ok(())
}
