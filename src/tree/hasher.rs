//! Identity computation for filesystem items
//!
//! Two composition rules live here:
//!
//! - **Content identity**: a single streaming pass over a file, every chunk fed to
//!   every active accumulator before the next chunk is read.
//! - **Name identity**: `H(hex(H(name)) ++ hex(H(parent_name)))`, which ties a
//!   directory's identity to both its own name and the name of the directory
//!   holding it.
//!
//! All digests are rendered as uppercase hexadecimal.

use crate::error::ConfigError;
use crate::types::{HashAlgorithm, IdentityPrefix, IdentitySet};
use digest::Digest;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Read size for content hashing.
pub const CHUNK_SIZE: usize = 64 * 1024;

enum Accumulator {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Accumulator::Md5(md5::Md5::new()),
            HashAlgorithm::Sha1 => Accumulator::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Accumulator::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Sha512 => Accumulator::Sha512(sha2::Sha512::new()),
            HashAlgorithm::Blake3 => Accumulator::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Accumulator::Md5(h) => Digest::update(h, chunk),
            Accumulator::Sha1(h) => Digest::update(h, chunk),
            Accumulator::Sha256(h) => Digest::update(h, chunk),
            Accumulator::Sha512(h) => Digest::update(h, chunk),
            Accumulator::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finalize(self) -> String {
        match self {
            Accumulator::Md5(h) => hex::encode_upper(h.finalize()),
            Accumulator::Sha1(h) => hex::encode_upper(h.finalize()),
            Accumulator::Sha256(h) => hex::encode_upper(h.finalize()),
            Accumulator::Sha512(h) => hex::encode_upper(h.finalize()),
            Accumulator::Blake3(h) => hex::encode_upper(h.finalize().as_bytes()),
        }
    }
}

/// Feeds the same bytes to several digest accumulators at once.
pub struct MultiHasher {
    accumulators: Vec<(HashAlgorithm, Accumulator)>,
    bytes_seen: u64,
}

impl MultiHasher {
    pub fn new(algorithms: &[HashAlgorithm]) -> Self {
        Self {
            accumulators: algorithms
                .iter()
                .map(|a| (*a, Accumulator::new(*a)))
                .collect(),
            bytes_seen: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.bytes_seen += chunk.len() as u64;
        for (_, acc) in self.accumulators.iter_mut() {
            acc.update(chunk);
        }
    }

    /// Finish every accumulator.
    ///
    /// Zero bytes of input short-circuits to the precomputed empty digests.
    pub fn finish(self) -> IdentitySet {
        if self.bytes_seen == 0 {
            let algorithms: Vec<HashAlgorithm> =
                self.accumulators.iter().map(|(a, _)| *a).collect();
            return empty_set(&algorithms);
        }
        self.accumulators
            .into_iter()
            .map(|(a, acc)| (a, acc.finalize()))
            .collect()
    }
}

/// Digest of the empty input for every supported algorithm, computed once.
pub fn empty_digests() -> &'static IdentitySet {
    static EMPTY: OnceLock<IdentitySet> = OnceLock::new();
    EMPTY.get_or_init(|| {
        HashAlgorithm::ALL
            .iter()
            .map(|a| (*a, Accumulator::new(*a).finalize()))
            .collect()
    })
}

/// The precomputed empty digests restricted to `algorithms`.
pub fn empty_set(algorithms: &[HashAlgorithm]) -> IdentitySet {
    let all = empty_digests();
    algorithms
        .iter()
        .filter_map(|a| all.get(*a).map(|d| (*a, d.to_string())))
        .collect()
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8], algorithms: &[HashAlgorithm]) -> IdentitySet {
    let mut hasher = MultiHasher::new(algorithms);
    hasher.update(data);
    hasher.finish()
}

/// Hash everything a reader yields, in [`CHUNK_SIZE`] pieces.
pub fn hash_reader<R: Read>(mut reader: R, algorithms: &[HashAlgorithm]) -> io::Result<IdentitySet> {
    let mut hasher = MultiHasher::new(algorithms);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Content identity of a file. Follows symlinks.
pub fn hash_file(path: &Path, algorithms: &[HashAlgorithm]) -> io::Result<IdentitySet> {
    let file = File::open(path)?;
    hash_reader(file, algorithms)
}

/// Single-layer digest of a name's UTF-8 bytes.
pub fn hash_name(name: &str, algorithms: &[HashAlgorithm]) -> IdentitySet {
    hash_bytes(name.as_bytes(), algorithms)
}

/// Two-layer name identity: `H(hex(H(name)) ++ hex(H(parent_name)))`.
pub fn hash_name_pair(name: &str, parent_name: &str, algorithms: &[HashAlgorithm]) -> IdentitySet {
    let own = hash_name(name, algorithms);
    let parent = hash_name(parent_name, algorithms);
    algorithms
        .iter()
        .filter_map(|a| {
            let (n, p) = (own.get(*a)?, parent.get(*a)?);
            let mut joined = String::with_capacity(n.len() + p.len());
            joined.push_str(n);
            joined.push_str(p);
            let mut acc = Accumulator::new(*a);
            acc.update(joined.as_bytes());
            Some((*a, acc.finalize()))
        })
        .collect()
}

/// Active algorithm set plus the primary one used for identity strings.
#[derive(Debug, Clone)]
pub struct IdentityEngine {
    algorithms: Vec<HashAlgorithm>,
    primary: HashAlgorithm,
}

impl IdentityEngine {
    /// Mandatory algorithms are always included; `extra` adds to them.
    pub fn new(primary: HashAlgorithm, extra: &[HashAlgorithm]) -> Result<Self, ConfigError> {
        let mut algorithms: Vec<HashAlgorithm> = HashAlgorithm::MANDATORY
            .iter()
            .chain(extra.iter())
            .copied()
            .collect();
        algorithms.sort();
        algorithms.dedup();
        if !algorithms.contains(&primary) {
            return Err(ConfigError::Invalid(format!(
                "Primary hash algorithm '{}' is not enabled (active: {})",
                primary,
                algorithms
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(Self {
            algorithms,
            primary,
        })
    }

    pub fn algorithms(&self) -> &[HashAlgorithm] {
        &self.algorithms
    }

    pub fn primary(&self) -> HashAlgorithm {
        self.primary
    }

    pub fn content(&self, path: &Path) -> io::Result<IdentitySet> {
        hash_file(path, &self.algorithms)
    }

    pub fn bytes(&self, data: &[u8]) -> IdentitySet {
        hash_bytes(data, &self.algorithms)
    }

    pub fn name(&self, name: &str) -> IdentitySet {
        hash_name(name, &self.algorithms)
    }

    pub fn name_pair(&self, name: &str, parent_name: &str) -> IdentitySet {
        hash_name_pair(name, parent_name, &self.algorithms)
    }

    /// Prefix plus the primary digest of `set`.
    ///
    /// `None` when `set` was not built with the primary algorithm.
    pub fn identity(&self, prefix: IdentityPrefix, set: &IdentitySet) -> Option<String> {
        prefix.identity(set, self.primary)
    }
}

impl Default for IdentityEngine {
    fn default() -> Self {
        Self {
            algorithms: HashAlgorithm::MANDATORY.to_vec(),
            primary: HashAlgorithm::Sha256,
        }
    }
}
