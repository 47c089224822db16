//! Timestamp source
//!
//! Reads modified/accessed/created times for an item without following links.
//! `created` is not available on every platform or filesystem; its absence is
//! reported as `None`, never as an error.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// One instant, rendered both as RFC 3339 and as Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub iso: String,
    pub unix: i64,
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        let dt: DateTime<Utc> = time.into();
        Self {
            iso: dt.to_rfc3339_opts(SecondsFormat::Micros, true),
            unix: dt.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
}

impl Timestamps {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok().map(Timestamp::from),
            accessed: metadata.accessed().ok().map(Timestamp::from),
            created: metadata.created().ok().map(Timestamp::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_none() && self.accessed.is_none() && self.created.is_none()
    }
}

/// Source of item timestamps.
pub trait TimestampSource: Send + Sync {
    /// Never fails; unreadable fields are left empty.
    fn stat(&self, path: &Path) -> Timestamps;
}

/// Reads timestamps from the filesystem via `symlink_metadata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTimestampSource;

impl TimestampSource for FsTimestampSource {
    fn stat(&self, path: &Path) -> Timestamps {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => Timestamps::from_metadata(&metadata),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Timestamps unavailable");
                Timestamps::default()
            }
        }
    }
}
