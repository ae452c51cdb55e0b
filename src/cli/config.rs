//! calvault config command implementation

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct InitOptions {
    pub vault: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub force: bool,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct InitReport {
    path: PathBuf,
    config: Config,
}

pub fn run_show(config: &Config, output: OutputOptions) -> Result<()> {
    let mut human = HumanOutput::new("calvault config: effective configuration");
    for line in toml::to_string_pretty(config)?.lines() {
        if !line.trim().is_empty() {
            human.push_detail(line);
        }
    }
    match config.tasks_folder() {
        Ok(folder) => human.push_summary("tasks folder", folder.display().to_string()),
        Err(err) => human.push_warning(err.to_string()),
    }

    emit_success(output, "config show", config, Some(&human))
}

pub fn run_init(opts: InitOptions) -> Result<()> {
    let path = match opts.path {
        Some(path) => path,
        None => std::env::current_dir()?.join(CONFIG_FILE),
    };
    if path.exists() && !opts.force {
        return Err(Error::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let config = Config {
        vault: opts.vault,
        ..Config::default()
    };
    config.save(&path)?;

    let mut human = HumanOutput::new("calvault config: wrote configuration");
    human.push_summary("path", path.display().to_string());
    if config.vault.is_none() {
        human.push_warning("vault is not set; pass --folder or edit the file");
    }

    let report = InitReport { path, config };
    emit_success(opts.output, "config init", &report, Some(&human))
}
