//! Human and JSON output for calvault commands.
//!
//! Every command reports through [`emit_success`] or [`emit_error`]. With
//! `--json` both print one envelope tagged with [`SCHEMA_VERSION`]; otherwise
//! a [`HumanOutput`] is rendered as plain text.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "calvault.v1";

/// Global flags that take a value and so hide the subcommand name
const VALUE_FLAGS: [&str; 2] = ["--config", "--folder"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header line, then optional sections.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }
        write_section(f, "Details", &self.details)?;
        write_section(f, "Warnings", &self.warnings)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    write!(f, "\n\n{title}:")?;
    for item in items {
        write!(f, "\n- {item}")?;
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    body: B,
}

#[derive(Serialize)]
struct SuccessBody<'a, T: Serialize> {
    data: &'a T,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    code: i32,
    kind: &'static str,
    recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<B: Serialize>(command: &str, status: &'static str, body: B) -> Result<()> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status,
        body,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.as_slice()).unwrap_or(&[]);
        return print_envelope(command, "success", SuccessBody { data, warnings });
    }
    if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let body = ErrorBody {
            error: ErrorDetail {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                recoverable: err.is_recoverable(),
                details: err.details(),
            },
            hint,
        };
        return print_envelope(command, "error", body);
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Best-effort command name for error envelopes, e.g. `write` or
/// `config show`. Works before clap has parsed anything.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    let mut positional = Vec::new();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
        } else if !arg.starts_with('-') {
            positional.push(arg);
            if positional.len() == 2 || positional[0] != "config" {
                break;
            }
        }
    }
    match positional.as_slice() {
        [] => "calvault".to_string(),
        [command] => command.clone(),
        [command, sub, ..] => format!("{command} {sub}"),
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        exit_codes::STORAGE_UNAVAILABLE => "storage_unavailable",
        exit_codes::OBSERVER_MISUSE => "observer_misuse",
        _ => "fatal",
    }
}

fn error_hint(err: &Error) -> Option<String> {
    match err {
        Error::InvalidTitle { .. } => {
            Some("titles cannot contain / \\ : * ? \" < > | or control characters".to_string())
        }
        Error::StorageUnavailable { path, .. } => Some(format!(
            "check that {} is a writable directory",
            path.display()
        )),
        Error::InvalidConfig(_) => Some("fix calvault.toml then retry".to_string()),
        _ => None,
    }
}
