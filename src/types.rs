//! Core types shared by the identity engine, the builder, and the sinks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Digest algorithms an identity set may carry.
///
/// Declaration order is the serialization order inside an [`IdentitySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// Algorithms computed on every run regardless of configuration.
    pub const MANDATORY: [HashAlgorithm; 2] = [HashAlgorithm::Md5, HashAlgorithm::Sha256];

    pub const ALL: [HashAlgorithm; 5] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    pub fn is_mandatory(&self) -> bool {
        Self::MANDATORY.contains(self)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!(
                "Unknown hash algorithm '{}' (expected md5, sha1, sha256, sha512 or blake3)",
                other
            )),
        }
    }
}

/// Algorithm name -> uppercase hexadecimal digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySet(BTreeMap<HashAlgorithm, String>);

impl IdentitySet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, algorithm: HashAlgorithm, digest: String) {
        self.0.insert(algorithm, digest);
    }

    pub fn get(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.0.get(&algorithm).map(String::as_str)
    }

    pub fn algorithms(&self) -> impl Iterator<Item = HashAlgorithm> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HashAlgorithm, &str)> {
        self.0.iter().map(|(a, d)| (*a, d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(HashAlgorithm, String)> for IdentitySet {
    fn from_iter<I: IntoIterator<Item = (HashAlgorithm, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Leading tag of an identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPrefix {
    File,
    Directory,
    /// Metadata records produced by the external extractor.
    Generated,
}

impl IdentityPrefix {
    pub fn as_char(&self) -> char {
        match self {
            IdentityPrefix::File => 'y',
            IdentityPrefix::Directory => 'x',
            IdentityPrefix::Generated => 'z',
        }
    }

    /// Build `prefix + digest` for the chosen algorithm.
    ///
    /// Returns `None` when the set does not carry that algorithm.
    pub fn identity(&self, set: &IdentitySet, algorithm: HashAlgorithm) -> Option<String> {
        set.get(algorithm).map(|digest| {
            let mut id = String::with_capacity(digest.len() + 1);
            id.push(self.as_char());
            id.push_str(digest);
            id
        })
    }
}
