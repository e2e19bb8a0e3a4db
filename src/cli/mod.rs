//! CLI module for VidiGraph.
//!
//! Subcommands:
//! - `inspect`: Summarize a dataset as JSON
//! - `dump`: Write the CSV dump of the initialized main network
//! - `store`: Run the initial store through the configured sink
//! - `animate`: Run a layout transition headlessly, reporting redraws

mod animate;
mod dump;
mod inspect;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use figment::providers::Serialized;

use crate::config::Config;
use crate::models::CommunityId;
use crate::networks::NetworkManager;

/// VidiGraph - multi-layout hierarchical graph engine
#[derive(Parser)]
#[command(name = "vidigraph")]
#[command(about = "Multi-layout hierarchical graph contexts and transitions")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dataset name, overriding `[dataset] name`
    #[arg(long, global = true)]
    pub dataset: Option<String>,

    /// Directory of layout files, overriding `[dataset] dir`
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a JSON summary of the dataset
    Inspect,

    /// Write the CSV dump of the main network
    Dump {
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Communities to cycle into focus before dumping
        #[arg(long, value_delimiter = ',')]
        focus: Vec<CommunityId>,
    },

    /// Store the main network through the configured sink
    Store,

    /// Run a layout transition frame by frame
    Animate {
        /// Communities to cycle into focus; toggles spherical/hairball when empty
        #[arg(long, value_delimiter = ',')]
        focus: Vec<CommunityId>,

        /// Transition duration in seconds, overriding `[animation]`
        #[arg(long)]
        duration: Option<f32>,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Inspect => self.run_inspect(),
            Command::Dump { out, focus } => self.run_dump(out, focus),
            Command::Store => self.run_store().await,
            Command::Animate { focus, duration } => self.run_animate(focus, *duration).await,
        }
    }

    /// Layered configuration with command-line overrides on top.
    fn config(&self) -> color_eyre::Result<Config> {
        let mut figment = Config::figment();
        if let Some(name) = &self.dataset {
            figment = figment.merge(Serialized::default("dataset.name", name));
        }
        if let Some(dir) = &self.data_dir {
            figment = figment.merge(Serialized::default("dataset.dir", dir));
        }
        let config = Config::from_figment(figment)?;
        if config.dataset.name.is_empty() {
            return Err(color_eyre::eyre::eyre!(
                "No dataset configured; set [dataset] name or pass --dataset"
            ));
        }
        tracing::info!(
            dataset = %config.dataset.name,
            dir = %config.dataset.dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn load_manager(&self, config: &Config) -> color_eyre::Result<NetworkManager> {
        let manager = NetworkManager::load(config).map_err(|e| {
            tracing::error!(error = %e, "Failed to load dataset");
            color_eyre::eyre::eyre!("Failed to load dataset: {}", e)
        })?;
        Ok(manager)
    }
}
