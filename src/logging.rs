//! Logging System
//!
//! Structured logging with `tracing`. Level, format and destination come from the
//! `[logging]` config section and can be overridden by `FSDEX_LOG`,
//! `FSDEX_LOG_FORMAT`, `FSDEX_LOG_OUTPUT` and `FSDEX_LOG_FILE`.

use crate::error::RunError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    pub level: String,

    /// json or text
    pub format: String,

    /// stdout, stderr, file, file+stderr
    pub output: String,

    /// Log file when output includes file; unset means the platform state dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Colored text output on terminals
    pub color: bool,

    /// Per-module levels, e.g. `fsdex::sidecar = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "warn".to_string(),
            format: "text".to_string(),
            output: "stderr".to_string(),
            file: None,
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

fn logging_error(message: impl Into<String>) -> RunError {
    RunError::Logging(message.into())
}

/// Log file path: CLI, then `FSDEX_LOG_FILE`, then config, then the default.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
) -> Result<PathBuf, RunError> {
    let env_file = std::env::var_os("FSDEX_LOG_FILE").map(PathBuf::from);
    [cli_file, env_file, config_file]
        .into_iter()
        .flatten()
        .find(|p| !p.as_os_str().is_empty())
        .map(Ok)
        .unwrap_or_else(default_log_file_path)
}

fn default_log_file_path() -> Result<PathBuf, RunError> {
    let dirs = directories::ProjectDirs::from("", "fsdex", "fsdex")
        .ok_or_else(|| logging_error("Could not determine platform directories for log file"))?;
    let dir = dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_local_dir())
        .to_path_buf();
    Ok(dir.join("fsdex.log"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, RunError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        other => {
            return Err(logging_error(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file' or 'file+stderr')",
                other
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}

fn determine_format(config: &LoggingConfig) -> Result<bool, RunError> {
    let format = std::env::var("FSDEX_LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    match format.as_str() {
        "json" => Ok(true),
        "text" => Ok(false),
        other => Err(logging_error(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, RunError> {
    if let Ok(filter) = EnvFilter::try_from_env("FSDEX_LOG") {
        return Ok(filter);
    }
    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        let directive = format!("{}={}", module, level)
            .parse()
            .map_err(|e| logging_error(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn open_log_file(path: &PathBuf) -> Result<std::fs::File, RunError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| logging_error(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| logging_error(format!("Failed to open log file {}: {}", path.display(), e)))
}

fn make_writer(output: OutputDestinations, file: Option<std::fs::File>) -> BoxMakeWriter {
    match (file.map(Arc::new), output.stderr, output.stdout) {
        (Some(file), true, _) => BoxMakeWriter::new(file.and(std::io::stderr)),
        (Some(file), false, _) => BoxMakeWriter::new(file),
        (None, true, _) => BoxMakeWriter::new(std::io::stderr),
        (None, false, true) => BoxMakeWriter::new(std::io::stdout),
        (None, false, false) => BoxMakeWriter::new(std::io::sink),
    }
}

/// Install the global subscriber.
///
/// Calling this twice fails; the first subscriber stays in place.
pub fn init_logging(config: &LoggingConfig, cli_file: Option<PathBuf>) -> Result<(), RunError> {
    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| logging_error(e.to_string()));
    }

    let filter = build_env_filter(config)?;
    let json = determine_format(config)?;
    let output = match std::env::var("FSDEX_LOG_OUTPUT") {
        Ok(value) => parse_output_destinations(&value)?,
        Err(_) => parse_output_destinations(&config.output)?,
    };
    let file = if output.file {
        let path = resolve_log_file_path(cli_file, config.file.clone())?;
        Some(open_log_file(&path)?)
    } else {
        None
    };
    let ansi = config.color && !output.file;
    let writer = make_writer(output, file);

    let registry = Registry::default().with(filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };
    result.map_err(|e| logging_error(e.to_string()))
}
