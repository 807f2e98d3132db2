// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

/// School assistant: retrieval-augmented answers for students
#[derive(Parser, Debug)]
#[command(name = "school-assistant")]
#[command(version)]
#[command(
    about = "Chat with the school assistant and manage its knowledge index",
    long_about = None
)]
pub struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, env = "SCHOOL_ASSISTANT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a local hashed embedder and an in-memory index seeded with the knowledge base
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat over stdin
    Chat,

    /// Ask a single question
    Ask {
        /// The question
        question: Vec<String>,
    },

    /// Convert, embed and upload the knowledge base
    Ingest {
        /// JSON knowledge base to use instead of the built-in one
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },

    /// Show vector count for the namespace
    Stats,

    /// Delete every vector in the namespace
    Clear,

    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

/// Load and validate configuration for a CLI run
pub fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env(),
    };
    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Chat => commands::chat(&config, cli.offline).await,
        Commands::Ask { question } => {
            commands::ask(&config, cli.offline, &question.join(" ")).await
        }
        Commands::Ingest { knowledge } => {
            commands::ingest(&config, cli.offline, knowledge.as_deref()).await
        }
        Commands::Stats => commands::stats(&config, cli.offline).await,
        Commands::Clear => commands::clear(&config, cli.offline).await,
        Commands::Serve { host, port } => commands::serve(&config, cli.offline, &host, port).await,
    }
}
