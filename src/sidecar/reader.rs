//! Sidecar readers with format fallback.
//!
//! json: json -> text -> binary
//! yaml: yaml -> text -> binary
//! text: text -> binary
//! binary: binary

use super::record::{DataFormat, Transform};
use super::rules::SidecarFormat;
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded payload of one sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub format: DataFormat,
    pub value: Value,
    pub reversed: Vec<Transform>,
}

impl Decoded {
    fn plain(format: DataFormat, value: Value) -> Self {
        Self {
            format,
            value,
            reversed: Vec::new(),
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn read_json(bytes: &[u8]) -> Option<Decoded> {
    serde_json::from_slice::<Value>(strip_bom(bytes))
        .ok()
        .map(|v| Decoded::plain(DataFormat::Json, v))
}

fn read_yaml(bytes: &[u8]) -> Option<Decoded> {
    serde_yaml::from_slice::<Value>(strip_bom(bytes))
        .ok()
        .map(|v| Decoded::plain(DataFormat::Yaml, v))
}

fn read_text(bytes: &[u8]) -> Option<Decoded> {
    std::str::from_utf8(strip_bom(bytes))
        .ok()
        .map(|s| Decoded::plain(DataFormat::Text, Value::String(s.to_string())))
}

fn read_binary(bytes: &[u8]) -> Decoded {
    Decoded {
        format: DataFormat::Binary,
        value: Value::String(general_purpose::STANDARD.encode(bytes)),
        reversed: vec![Transform::Base64],
    }
}

/// Decode raw sidecar bytes, starting at the rule's format.
pub fn decode(bytes: &[u8], format: SidecarFormat) -> Decoded {
    let structured = match format {
        SidecarFormat::Json => read_json(bytes),
        SidecarFormat::Yaml => read_yaml(bytes),
        SidecarFormat::Text | SidecarFormat::Binary => None,
    };
    if let Some(decoded) = structured {
        return decoded;
    }
    if format != SidecarFormat::Binary {
        if let Some(decoded) = read_text(bytes) {
            return decoded;
        }
    }
    read_binary(bytes)
}

/// Record payload for a sidecar that could not be read.
pub fn error_payload(error: &std::io::Error) -> Decoded {
    Decoded::plain(DataFormat::Error, Value::String(error.to_string()))
}
