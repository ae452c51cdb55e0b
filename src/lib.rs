//! calvault - calendar tasks as Markdown files in a notes vault
//!
//! This library provides the core of the calvault CLI: authoring one file
//! per calendar task without ever overwriting an existing one, and observing
//! which files appear in the task folder during a window of time.
//!
//! # Core Concepts
//!
//! - **Task records**: title, date span and optional time span of one task
//! - **Authoring**: `"{date} {title}.md"` files, disambiguated with `" {n}"`
//!   suffixes and published atomically
//! - **Observation**: start/stop windows recording newly created files
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `calvault.toml`
//! - `error`: Error types and result aliases
//! - `task`: Task records and date/time parsing
//! - `render`: Task body rendering
//! - `naming`: Filename rules and suffix discovery
//! - `author`: Writing and deleting task files
//! - `observer`: Filesystem change observation
//! - `output`: Human and JSON output for the CLI

pub mod author;
pub mod cli;
pub mod config;
pub mod error;
pub mod naming;
pub mod observer;
pub mod output;
pub mod render;
pub mod task;

pub use author::{AuthoredFile, FileAuthor};
pub use error::{Error, Result};
pub use observer::ChangeObserver;
pub use task::TaskRecord;
