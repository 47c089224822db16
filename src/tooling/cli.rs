//! CLI Tooling
//!
//! Command-line interface for indexing runs. Flags are applied on top of the
//! layered configuration, then the merged configuration is validated once.

use crate::cancel::CancellationToken;
use crate::config::{ConfigLoader, IndexerConfig};
use crate::error::{RunError, SinkError};
use crate::logging::LoggingConfig;
use crate::report::{format_run_json, format_run_text};
use crate::run::Indexer;
use crate::sink::{EntrySink, InPlaceSink, JsonFileSink, JsonTreeSink};
use crate::types::HashAlgorithm;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

/// fsdex - Deterministic filesystem indexing
#[derive(Parser)]
#[command(name = "fsdex")]
#[command(about = "Index files and directories with content identities and sidecar metadata")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a file or directory
    Index(IndexArgs),
    /// Print the effective configuration
    Config {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    /// File or directory to index
    pub target: PathBuf,

    /// Index the target alone, without descending into directories
    #[arg(long)]
    pub no_recursive: bool,

    /// Fold sidecar files into the entries they describe
    #[arg(long)]
    pub merge: bool,

    /// Remove merged sidecars once output is written (implies --merge)
    #[arg(long)]
    pub delete_sidecars: bool,

    /// Do not ask before removing sidecars
    #[arg(short, long)]
    pub yes: bool,

    /// Write <name>_meta.json next to every item
    #[arg(long, conflicts_with = "output")]
    pub inplace: bool,

    /// Write the tree to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Algorithm whose digest becomes the identity
    #[arg(long)]
    pub algorithm: Option<HashAlgorithm>,

    /// Additional digest to compute (repeatable)
    #[arg(long = "hash")]
    pub hashes: Vec<HashAlgorithm>,

    /// Extra exclusion glob (repeatable)
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,

    /// Skip embedded metadata extraction
    #[arg(long)]
    pub no_extract: bool,

    /// Rename files to <_id><.ext> after indexing
    #[arg(long)]
    pub rename: bool,

    /// List renames without applying them
    #[arg(long, requires = "rename")]
    pub dry_run: bool,

    /// Summary format (text or json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl IndexArgs {
    /// Overlay these flags onto a loaded configuration.
    pub fn apply(&self, config: &mut IndexerConfig) {
        if self.no_recursive {
            config.recursive = false;
        }
        if self.merge || self.delete_sidecars {
            config.sidecar.merge = true;
        }
        if self.delete_sidecars {
            config.sidecar.delete = true;
        }
        if self.inplace {
            config.output.inplace = true;
        }
        if self.compact {
            config.output.pretty = false;
        }
        if self.no_extract {
            config.extractor.enabled = false;
        }
        if self.rename {
            config.rename.enabled = true;
        }
        if self.dry_run {
            config.rename.dry_run = true;
        }
        config.exclusions.globs.extend(self.excludes.iter().cloned());

        let mut wanted = self.hashes.clone();
        if let Some(primary) = self.algorithm {
            config.hashing.primary = primary;
            wanted.push(primary);
        }
        for algorithm in wanted {
            if !algorithm.is_mandatory() && !config.hashing.extra.contains(&algorithm) {
                config.hashing.extra.push(algorithm);
            }
        }
    }
}

/// Rendered command result and where it belongs.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    /// Set when stdout already carries the tree.
    pub to_stderr: bool,
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: IndexerConfig,
}

impl CliContext {
    /// Load configuration: defaults, global file, `config_path`, environment.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, RunError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn from_config(config: IndexerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Logging section with the CLI overrides applied.
    pub fn logging_config(&self, cli: &Cli) -> LoggingConfig {
        let mut logging = self.config.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        logging
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, RunError> {
        match command {
            Commands::Index(args) => self.handle_index(args),
            Commands::Config { format } => self.handle_config(format),
        }
    }

    fn handle_config(&self, format: &str) -> Result<CommandOutput, RunError> {
        let text = match format {
            "json" => serde_json::to_string_pretty(&self.config).map_err(SinkError::from)?,
            "toml" => self.config.to_toml()?,
            other => return Err(invalid_format(other, "toml", "json")),
        };
        Ok(CommandOutput {
            text,
            to_stderr: false,
        })
    }

    fn handle_index(&self, args: &IndexArgs) -> Result<CommandOutput, RunError> {
        if args.format != "text" && args.format != "json" {
            return Err(invalid_format(&args.format, "text", "json"));
        }
        let mut config = self.config.clone();
        args.apply(&mut config);

        let mut indexer = Indexer::new(&config)?;
        if config.sidecar.delete && !args.yes {
            indexer = indexer.with_deletion_prompt(Box::new(confirm_removal));
        }

        let tree_on_stdout = !config.output.inplace && args.output.is_none();
        let mut sink: Box<dyn EntrySink> = if config.output.inplace {
            Box::new(InPlaceSink::new(config.output.pretty))
        } else if let Some(path) = &args.output {
            Box::new(JsonFileSink::new(path, config.output.pretty))
        } else {
            Box::new(JsonTreeSink::new(std::io::stdout(), config.output.pretty))
        };

        let report = indexer.run(&args.target, sink.as_mut(), &CancellationToken::new())?;
        let text = if args.format == "json" {
            format_run_json(&report).map_err(SinkError::from)?
        } else {
            format_run_text(&report)
        };
        Ok(CommandOutput {
            text,
            to_stderr: tree_on_stdout,
        })
    }
}

fn invalid_format(value: &str, a: &str, b: &str) -> RunError {
    RunError::Config(crate::error::ConfigError::Invalid(format!(
        "Invalid format: {} (must be '{}' or '{}')",
        value, a, b
    )))
}

fn confirm_removal(paths: &[PathBuf]) -> bool {
    use dialoguer::Confirm;
    let preview: Vec<&Path> = paths.iter().take(5).map(PathBuf::as_path).collect();
    for path in &preview {
        eprintln!("  {}", path.display());
    }
    if paths.len() > preview.len() {
        eprintln!("  ... and {} more", paths.len() - preview.len());
    }
    match Confirm::new()
        .with_prompt(format!("Remove {} merged sidecar file(s)?", paths.len()))
        .default(false)
        .interact()
    {
        Ok(confirmed) => confirmed,
        Err(e) => {
            warn!(error = %e, "Could not read confirmation; keeping sidecars");
            false
        }
    }
}
