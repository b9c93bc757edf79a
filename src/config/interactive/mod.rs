
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{ChatConfig, Config, ConfigError, DataConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Fighter RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Embedding Server (Ollama)").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed fight records.");
    eprintln!();

    configure_ollama(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Chat Completion API").bold().yellow());
    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Data Source").bold().yellow());
    configure_data(&mut config.data)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.embedding) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    if std::env::var(&config.chat.api_key_env).is_err() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: {} is not set; chat requests will fail",
                config.chat.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Protocol: {}", style(&config.embedding.protocol).cyan());
    eprintln!("  Host: {}", style(&config.embedding.host).cyan());
    eprintln!("  Port: {}", style(config.embedding.port).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embedding.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.chat.base_url).cyan());
    eprintln!("  Model: {}", style(&config.chat.model).cyan());
    eprintln!(
        "  Transcription Model: {}",
        style(&config.chat.transcription_model).cyan()
    );
    let key_state = if std::env::var(&config.chat.api_key_env).is_ok() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!(
        "  API Key: ${} ({})",
        style(&config.chat.api_key_env).cyan(),
        key_state
    );

    eprintln!();
    eprintln!("{}", style("Data Settings:").bold().yellow());
    eprintln!(
        "  Source File: {}",
        style(config.data.source_path.display()).cyan()
    );
    eprintln!("  Collection: {}", style(&config.data.collection_name).cyan());
    eprintln!("  Focus Fighter: {}", style(&config.data.focus_fighter).cyan());
    eprintln!("  Top K: {}", style(config.data.top_k).cyan());
    match config.data.prune_threshold {
        Some(threshold) => eprintln!("  Prune Threshold: {}", style(format!("{threshold}%")).cyan()),
        None => eprintln!("  Prune Threshold: {}", style("disabled").dim()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config::with_base_dir(config_dir)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Chat API base URL")
        .default(chat.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ChatConfig {
                base_url: input.clone(),
                ..ChatConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(chat.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(chat.api_key_env.clone())
        .interact_text()?;

    let updated = ChatConfig {
        base_url,
        model,
        api_key_env,
        transcription_model: chat.transcription_model.clone(),
    };
    updated.validate()?;
    *chat = updated;

    Ok(())
}

fn configure_data(data: &mut DataConfig) -> Result<()> {
    let source_path: String = Input::new()
        .with_prompt("Source CSV file")
        .default(data.source_path.display().to_string())
        .interact_text()?;

    let focus_fighter: String = Input::new()
        .with_prompt("Focus fighter")
        .default(data.focus_fighter.clone())
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(data.top_k)
        .interact_text()?;

    let updated = DataConfig {
        source_path: source_path.into(),
        focus_fighter,
        top_k,
        ..data.clone()
    };
    updated.validate()?;
    *data = updated;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
