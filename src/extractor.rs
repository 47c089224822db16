//! Embedded metadata extraction
//!
//! The default extractor shells out to `exiftool`. Each call runs under a timeout
//! and the child is killed when it expires. Availability is probed once per run by
//! [`ExtractorGate`]; an unavailable extractor is not an error.

use crate::sidecar::MetadataRecord;
use crate::tree::hasher::IdentityEngine;
use crate::types::IdentityPrefix;
use glob::Pattern;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_PROGRAM: &str = "exiftool";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Keys that describe the file on disk rather than its content.
pub const DEFAULT_IGNORED_KEYS: &[&str] = &[
    "SourceFile",
    "ExifTool:ExifToolVersion",
    "File:FileName",
    "File:Directory",
    "File:FileSize",
    "File:File*Date",
    "File:FilePermissions",
];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of metadata embedded in a file's content.
pub trait MetadataExtractor: Send + Sync {
    /// Whether the extractor can run at all.
    fn probe(&self) -> bool;

    /// Extract a flat key/value map. `None` means nothing usable was found.
    fn extract(&self, path: &Path) -> Option<Map<String, Value>>;

    /// Record type used for this extractor's output.
    fn record_type(&self) -> &str {
        "embedded"
    }
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("exited with {0}")]
    Failed(ExitStatus),
    #[error("output pipe unavailable")]
    Pipe,
}

/// Run `command`, collecting stdout, killing the child after `timeout`.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<Vec<u8>, ProcessError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let mut stdout = child.stdout.take().ok_or(ProcessError::Pipe)?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => {
                let output = reader.join().map_err(|_| ProcessError::Pipe)??;
                if !status.success() {
                    return Err(ProcessError::Failed(status));
                }
                return Ok(output);
            }
            None => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout(timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Extractor backed by the `exiftool` command.
#[derive(Debug, Clone)]
pub struct ExifToolExtractor {
    program: String,
    timeout: Duration,
    ignored: Vec<Pattern>,
}

impl ExifToolExtractor {
    pub fn new(program: impl Into<String>, timeout: Duration, ignored_keys: &[String]) -> Self {
        let ignored = ignored_keys
            .iter()
            .filter_map(|k| Pattern::new(k).ok())
            .collect();
        Self {
            program: program.into(),
            timeout,
            ignored,
        }
    }

    fn strip_ignored(&self, map: &mut Map<String, Value>) {
        map.retain(|key, _| !self.ignored.iter().any(|p| p.matches(key)));
    }
}

impl Default for ExifToolExtractor {
    fn default() -> Self {
        let keys: Vec<String> = DEFAULT_IGNORED_KEYS.iter().map(|k| k.to_string()).collect();
        Self::new(DEFAULT_PROGRAM, Duration::from_millis(DEFAULT_TIMEOUT_MS), &keys)
    }
}

impl MetadataExtractor for ExifToolExtractor {
    fn probe(&self) -> bool {
        match run_with_timeout(Command::new(&self.program).arg("-ver"), self.timeout) {
            Ok(version) => {
                debug!(
                    program = %self.program,
                    version = %String::from_utf8_lossy(&version).trim(),
                    "Extractor available"
                );
                true
            }
            Err(e) => {
                debug!(program = %self.program, error = %e, "Extractor probe failed");
                false
            }
        }
    }

    fn extract(&self, path: &Path) -> Option<Map<String, Value>> {
        let output = run_with_timeout(
            Command::new(&self.program).arg("-json").arg("-G").arg(path),
            self.timeout,
        )
        .map_err(|e| debug!(path = %path.display(), error = %e, "Extraction failed"))
        .ok()?;

        let parsed: Vec<Map<String, Value>> = serde_json::from_slice(&output)
            .map_err(|e| debug!(path = %path.display(), error = %e, "Unparseable extractor output"))
            .ok()?;
        let mut map = parsed.into_iter().next()?;
        self.strip_ignored(&mut map);
        (!map.is_empty()).then_some(map)
    }

    fn record_type(&self) -> &str {
        "exiftool"
    }
}

/// Extractor for runs without embedded metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledExtractor;

impl MetadataExtractor for DisabledExtractor {
    fn probe(&self) -> bool {
        false
    }

    fn extract(&self, _path: &Path) -> Option<Map<String, Value>> {
        None
    }
}

/// Probes the extractor once and filters what it is asked to process.
pub struct ExtractorGate {
    extractor: Box<dyn MetadataExtractor>,
    excluded_extensions: HashSet<String>,
    available: OnceLock<bool>,
}

impl ExtractorGate {
    pub fn new(extractor: Box<dyn MetadataExtractor>, excluded_extensions: &[String]) -> Self {
        Self {
            extractor,
            excluded_extensions: excluded_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            available: OnceLock::new(),
        }
    }

    pub fn disabled() -> Self {
        let gate = Self::new(Box::new(DisabledExtractor), &[]);
        let _ = gate.available.set(false);
        gate
    }

    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let available = self.extractor.probe();
            if !available {
                info!("Metadata extractor unavailable; embedded metadata will be skipped");
            }
            available
        })
    }

    /// Extract for a regular file, honoring the extension filter.
    pub fn extract(&self, path: &Path, extension: Option<&str>) -> Option<Map<String, Value>> {
        if extension.is_some_and(|e| self.excluded_extensions.contains(e)) {
            return None;
        }
        if !self.is_available() {
            return None;
        }
        self.extractor.extract(path)
    }

    /// Extract and wrap the result as a generated record.
    ///
    /// The record id is the generated prefix plus the primary digest of the
    /// payload's JSON encoding.
    pub fn record(
        &self,
        path: &Path,
        extension: Option<&str>,
        engine: &IdentityEngine,
    ) -> Option<MetadataRecord> {
        let payload = self.extract(path, extension)?;
        let value = Value::Object(payload);
        let canonical = serde_json::to_vec(&value).ok()?;
        let id = engine.identity(IdentityPrefix::Generated, &engine.bytes(&canonical))?;
        Some(MetadataRecord::generated(
            self.extractor.record_type(),
            id,
            value,
        ))
    }
}

impl Default for ExtractorGate {
    fn default() -> Self {
        Self::disabled()
    }
}
