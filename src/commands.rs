use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::{error, info, warn};

use crate::chat::{Assistant, ChatClient, Responder, Transcriber};
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::{Chunk, OllamaClient, chunks_from_records};
use crate::knowledge::{IndexManifest, IndexOutcome, KnowledgeBase};
use crate::records::{
    PreparedDataset, filter_focus_fights, load_table, normalize_dates, prepare_dataset, prune_missing,
    summarize,
};
use crate::shell::{ChatSession, facts, run_shell};

/// Load, clean and chunk the configured source file
#[inline]
pub fn prepare_chunks(config: &Config) -> Result<Vec<Chunk>> {
    let dataset = load_dataset(config)?;
    let chunks = chunks_from_records(&dataset.records);
    info!(
        "{} chunks from {} records",
        chunks.len(),
        dataset.records.len()
    );
    Ok(chunks)
}

fn load_dataset(config: &Config) -> Result<PreparedDataset> {
    let path = &config.data.source_path;
    let table = load_table(path)
        .with_context(|| format!("Failed to load source file: {}", path.display()))?;
    Ok(prepare_dataset(table, config.data.prune_threshold))
}

/// Print dataset diagnostics and the focus fighter's career summary
#[inline]
pub fn show_summary(config: &Config) -> Result<()> {
    let path = &config.data.source_path;
    let table = load_table(path)
        .with_context(|| format!("Failed to load source file: {}", path.display()))?;

    let (rows, columns) = table.shape();
    println!("📄 Source: {}", path.display());
    println!("   Shape: {} rows × {} columns", rows, columns);
    println!("   Columns: {}", table.columns().join(", "));
    println!("   Missing values per column:");
    for (column, missing) in table.missing_per_column() {
        if missing > 0 {
            println!("     {:<24} {}", column, missing);
        }
    }

    let dataset = prepare_dataset(table, config.data.prune_threshold);
    let chunks = chunks_from_records(&dataset.records);
    println!();
    println!("🧹 Cleaning:");
    println!("   Duplicates removed: {}", dataset.duplicates_removed);
    if let Some(report) = &dataset.prune_report {
        println!(
            "   Sparse rows pruned: {} (threshold {}%)",
            report.dropped_rows.len(),
            report.threshold
        );
    }
    println!("   Clean records: {}", dataset.records.len());
    println!("   Chunks: {}", chunks.len());

    let fighter = config.data.focus_fighter.as_str();
    let fights = filter_focus_fights(&dataset.records, fighter);
    let summary = summarize(&fights, fighter);

    println!();
    println!("🥊 {} ({} fights)", summary.fighter, summary.fight_count);
    if summary.fight_count == 0 {
        println!("   No fights found for this fighter.");
        return Ok(());
    }

    for fight in &fights {
        println!(
            "   {}  vs {:<24} {:<6} {}",
            fight
                .record
                .published_day()
                .unwrap_or_else(|| "----------".to_string()),
            fight.opponent.unwrap_or("unknown"),
            fight.outcome.as_deref().unwrap_or("-"),
            fight.record.method.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("   Outcomes:");
    for (outcome, count) in &summary.outcomes {
        println!("     {:<12} {}", outcome, count);
    }
    if !summary.win_methods.is_empty() {
        println!("   Win methods:");
        for (method, count) in &summary.win_methods {
            println!("     {:<24} {}", method, count);
        }
    }

    Ok(())
}

/// Report missing values and which rows a pruning pass would drop
#[inline]
pub fn show_prune_report(config: &Config, threshold: Option<f64>) -> Result<()> {
    let threshold = threshold.unwrap_or_else(|| config.data.prune_threshold_or_default());
    anyhow::ensure!(
        (0.0..=100.0).contains(&threshold),
        "Threshold must be between 0 and 100, got {}",
        threshold
    );

    let path = &config.data.source_path;
    let mut table = load_table(path)
        .with_context(|| format!("Failed to load source file: {}", path.display()))?;
    normalize_dates(&mut table);
    let duplicates = table.drop_duplicates();
    let (_, report) = prune_missing(&table, threshold);

    println!("✂️  Pruning rows with more than {}% missing values", threshold);
    println!("   Duplicates removed first: {}", duplicates);
    println!();
    println!("   Missing % per column:");
    for (column, percent) in &report.column_missing_percent {
        println!("     {:<24} {:>6.2}%", column, percent);
    }

    println!();
    if report.dropped_rows.is_empty() {
        println!("   No rows exceed the threshold.");
    } else {
        println!("   Rows to drop:");
        for &index in &report.dropped_rows {
            let percent = report
                .row_missing_percent
                .get(index)
                .copied()
                .unwrap_or_default();
            println!("     row {:<6} {:>6.2}% missing", index, percent);
        }
    }

    println!();
    println!(
        "   Shape: {:?} -> {:?}",
        report.shape_before, report.shape_after
    );

    Ok(())
}

/// Build the collection if the corpus changed, or always with `rebuild`
#[inline]
pub async fn build_index(config: &Config, rebuild: bool) -> Result<()> {
    let chunks = prepare_chunks(config)?;
    let mut knowledge = KnowledgeBase::open(config)
        .await
        .context("Failed to open knowledge base")?;

    match knowledge.ensure_indexed(&chunks, rebuild).await? {
        IndexOutcome::Reused { chunks } => {
            println!(
                "✅ Collection {} is up to date ({} chunks)",
                knowledge.collection_name(),
                chunks
            );
        }
        IndexOutcome::Rebuilt { chunks } => {
            println!(
                "✅ Indexed {} chunks into {}",
                chunks,
                knowledge.collection_name()
            );
        }
    }

    Ok(())
}

async fn open_assistant(config: &Config) -> Result<Assistant> {
    let client = ChatClient::new(&config.chat)?;
    let chunks = prepare_chunks(config)?;

    let mut knowledge = KnowledgeBase::open(config)
        .await
        .context("Failed to open knowledge base")?;
    if let IndexOutcome::Rebuilt { chunks } = knowledge.ensure_indexed(&chunks, false).await? {
        eprintln!(
            "{}",
            style(format!("Indexed {} chunks before starting", chunks)).dim()
        );
    }

    Ok(Assistant::new(knowledge, client))
}

/// Answer one question without conversation history
#[inline]
pub async fn ask_question(config: &Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        warn!("Ignoring empty question");
        return Ok(());
    }

    let assistant = open_assistant(config).await?;
    let answer = assistant.respond(question, &[]).await?;
    println!("{}", answer);
    Ok(())
}

/// Start the interactive shell
#[inline]
pub async fn start_chat(config: &Config) -> Result<()> {
    let assistant = open_assistant(config).await?;

    let transcriber = match Transcriber::new(&config.chat) {
        Ok(transcriber) => Some(transcriber),
        Err(e) => {
            warn!("Transcription disabled: {}", e);
            None
        }
    };

    let mut session = ChatSession::new();
    run_shell(&mut session, &assistant, transcriber.as_ref()).await
}

#[inline]
pub fn transcribe(config: &Config, path: &Path) -> Result<()> {
    let transcriber = Transcriber::new(&config.chat)?;
    let text = transcriber
        .transcribe_file(path)
        .with_context(|| format!("Failed to transcribe {}", path.display()))?;
    println!("{}", text);
    Ok(())
}

#[inline]
pub fn show_facts() {
    println!("{}", facts::render_all());
}

/// Show detailed status of the embedding server, collection and source data
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("🔍 Fighter RAG Status");
    println!("====================");
    println!();

    println!("🤖 Embedding Server:");
    match OllamaClient::new(&config.embedding) {
        Ok(client) => match client.health_check() {
            Ok(()) => println!(
                "   ✅ {}:{} with model {}",
                config.embedding.host, config.embedding.port, config.embedding.model
            ),
            Err(e) => {
                error!("Ollama health check failed: {:#}", e);
                println!("   ❌ Unavailable: {:#}", e);
            }
        },
        Err(e) => println!("   ❌ Invalid configuration: {:#}", e),
    }

    println!();
    println!("💬 Chat API:");
    println!("   Endpoint: {}", config.chat.base_url);
    println!("   Model: {}", config.chat.model);
    if std::env::var(&config.chat.api_key_env).is_ok() {
        println!("   ✅ ${} is set", config.chat.api_key_env);
    } else {
        println!("   ⚠️  ${} is not set", config.chat.api_key_env);
    }

    println!();
    println!("🗄️  Collection {}:", config.data.collection_name);
    match VectorStore::new(config).await {
        Ok(store) => match store.count().await {
            Ok(0) => println!("   📭 Empty; run 'fighter-rag index' to build it"),
            Ok(count) => println!("   📊 {} chunks stored", count),
            Err(e) => println!("   ❌ Failed to count rows: {}", e),
        },
        Err(e) => println!("   ❌ Failed to open vector store: {}", e),
    }

    match IndexManifest::load(&config.index_manifest_path()) {
        Ok(Some(manifest)) => {
            println!(
                "   🕒 Built {} with {} ({} chunks)",
                manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
                manifest.model,
                manifest.chunk_count
            );
            println!("   🔑 Fingerprint: {}", manifest.fingerprint);
        }
        Ok(None) => println!("   No build manifest yet"),
        Err(e) => println!("   ❌ Failed to read manifest: {}", e),
    }

    println!();
    println!("📄 Source Data:");
    let source = &config.data.source_path;
    if source.exists() {
        println!("   ✅ {}", source.display());
    } else {
        println!("   ❌ {} not found", source.display());
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'fighter-rag index' to build or refresh the collection");
    println!("   • Use 'fighter-rag chat' to start asking questions");

    Ok(())
}
