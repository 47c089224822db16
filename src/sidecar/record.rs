//! Metadata records attached to an entry.

use crate::timestamps::Timestamps;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a record's `value` was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Yaml,
    Text,
    Binary,
    /// The source could not be read; `value` holds the error message.
    Error,
}

/// Reversible transform applied to a payload before storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Base64,
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum RecordOrigin {
    /// Read from a sidecar file next to the item.
    Discovered {
        /// Path relative to the item's directory.
        name: String,
        size: u64,
        timestamps: Timestamps,
    },
    /// Produced by the metadata extractor.
    Generated {
        #[serde(rename = "_id")]
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(flatten)]
    pub origin: RecordOrigin,
    #[serde(rename = "type")]
    pub record_type: String,
    pub format: DataFormat,
    pub value: Value,
    #[serde(default)]
    pub reversed: Vec<Transform>,
}

impl MetadataRecord {
    pub fn discovered(
        record_type: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        timestamps: Timestamps,
        format: DataFormat,
        value: Value,
        reversed: Vec<Transform>,
    ) -> Self {
        Self {
            origin: RecordOrigin::Discovered {
                name: name.into(),
                size,
                timestamps,
            },
            record_type: record_type.into(),
            format,
            value,
            reversed,
        }
    }

    pub fn generated(record_type: impl Into<String>, id: impl Into<String>, value: Value) -> Self {
        Self {
            origin: RecordOrigin::Generated { id: id.into() },
            record_type: record_type.into(),
            format: DataFormat::Json,
            value,
            reversed: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.format == DataFormat::Error
    }

    /// Sidecar name for discovered records.
    pub fn source_name(&self) -> Option<&str> {
        match &self.origin {
            RecordOrigin::Discovered { name, .. } => Some(name),
            RecordOrigin::Generated { .. } => None,
        }
    }
}
