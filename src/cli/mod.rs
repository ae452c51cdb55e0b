//! Command-line interface for calvault
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, ObserverBackend};
use crate::error::Result;
use crate::output::OutputOptions;

mod config;
mod delete;
mod watch;
mod write;

/// calvault - calendar task authoring for Markdown notes vaults
///
/// Writes one Markdown file per task into the vault's task folder, never
/// overwriting an existing task, and watches the folder for new files.
#[derive(Parser, Debug)]
#[command(name = "calvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to calvault.toml (defaults to ./calvault.toml, then the user config)
    #[arg(long, global = true, env = "CALVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Task folder, overriding the configured vault and tasks_dir
    #[arg(long, global = true, env = "CALVAULT_FOLDER")]
    pub folder: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Author a task file
    Write {
        /// Task title (becomes part of the filename)
        #[arg(long)]
        title: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// End date for multi-day tasks (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,

        /// Start time (HH:MM)
        #[arg(long, requires = "end_time")]
        start_time: Option<String>,

        /// End time (HH:MM); earlier than the start time crosses midnight
        #[arg(long, requires = "start_time")]
        end_time: Option<String>,
    },

    /// Delete a task file
    Delete {
        /// Path of the task file (absolute or relative to the task folder)
        #[arg(conflicts_with = "title")]
        path: Option<PathBuf>,

        /// Title of the task to delete, including any suffix
        #[arg(long, requires = "date")]
        title: Option<String>,

        /// Start date of the task to delete (YYYY-MM-DD)
        #[arg(long, requires = "title")]
        date: Option<String>,
    },

    /// Watch the task folder and report files created during the window
    Watch {
        /// Observation window in milliseconds
        #[arg(long, default_value = "5000")]
        duration_ms: u64,

        /// Detection backend (defaults to the configured one)
        #[arg(long, value_enum)]
        backend: Option<ObserverBackend>,

        /// Poll interval for the poll backend
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default calvault.toml
    Init {
        /// Vault root to record in the new file
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Where to write the file (defaults to ./calvault.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Config(ConfigCommands::Init { vault, path, force }) => {
                config::run_init(config::InitOptions {
                    vault,
                    path,
                    force,
                    output,
                })
            }
            Commands::Config(ConfigCommands::Show) => {
                let config = load_config(self.config.as_deref())?;
                config::run_show(&config, output)
            }
            Commands::Write {
                title,
                date,
                end_date,
                start_time,
                end_time,
            } => {
                let config = load_config(self.config.as_deref())?;
                let folder = task_folder(self.folder, &config)?;
                write::run(write::WriteOptions {
                    title,
                    date,
                    end_date,
                    start_time,
                    end_time,
                    folder,
                    marker: config.marker,
                    output,
                })
            }
            Commands::Delete { path, title, date } => {
                let config = load_config(self.config.as_deref())?;
                let folder = task_folder(self.folder, &config)?;
                delete::run(delete::DeleteOptions {
                    path,
                    title,
                    date,
                    folder,
                    output,
                })
            }
            Commands::Watch {
                duration_ms,
                backend,
                poll_interval_ms,
            } => {
                let config = load_config(self.config.as_deref())?;
                let folder = task_folder(self.folder, &config)?;
                let mut observer = config.observer;
                if let Some(backend) = backend {
                    observer.backend = backend;
                }
                if let Some(interval) = poll_interval_ms {
                    observer.poll_interval_ms = interval;
                }
                watch::run(watch::WatchOptions {
                    folder,
                    duration_ms,
                    observer,
                    output,
                })
            }
        }
    }
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    Config::discover(explicit, &cwd)
}

fn task_folder(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    match flag {
        Some(folder) => Ok(folder),
        None => config.tasks_folder(),
    }
}
