//! BLAKE3 content fingerprints with sampled hashing for large files.
//!
//! # Overview
//!
//! Files below [`SAMPLING_THRESHOLD`] are identified by a hash of their
//! whole content, so equal fingerprints mean equal bytes. Larger files are
//! identified by a hash of three [`SAMPLE_WINDOW`]-sized windows (head,
//! middle and tail). A sampled fingerprint is only a necessary condition
//! for equality; [`Fingerprint::is_sampled`] lets callers tell the two apart.
//!
//! # Example
//!
//! ```no_run
//! use templopt::scanner::fingerprint;
//! use std::path::Path;
//!
//! let fp = fingerprint(Path::new("templates/agents/core/reviewer/agent.json")).unwrap();
//! println!("{}", fp);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FingerprintError;

/// Files of this size or larger are fingerprinted by sampling (1 MiB).
pub const SAMPLING_THRESHOLD: u64 = 1_048_576;

/// Size of each sampled window (1 KiB).
pub const SAMPLE_WINDOW: u64 = 1024;

/// Buffer size for streaming full-content hashes.
const BUFFER_SIZE: usize = 64 * 1024;

const FULL_SCHEME: &str = "full";
const SAMPLED_SCHEME: &str = "sampled";

/// Opaque content identity of a file.
///
/// Rendered as `<scheme>:<hex>`, where scheme is `full` or `sampled`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn new(scheme: &str, hash: blake3::Hash) -> Self {
        Self(format!("{}:{}", scheme, hash.to_hex()))
    }

    /// Whether this identity was computed from sampled windows.
    #[must_use]
    pub fn is_sampled(&self) -> bool {
        self.0.starts_with(SAMPLED_SCHEME)
    }

    /// The identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a file.
///
/// # Errors
///
/// Returns [`FingerprintError`] if the file cannot be opened or read.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| FingerprintError::from_io(path, e))?
        .len();

    if len < SAMPLING_THRESHOLD {
        full_hash(&mut file, path)
    } else {
        sampled_hash(&mut file, len, path)
    }
}

fn full_hash(file: &mut File, path: &Path) -> Result<Fingerprint, FingerprintError> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| FingerprintError::from_io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Fingerprint::new(FULL_SCHEME, hasher.finalize()))
}

/// Offsets of the head, middle and tail windows for a file of `len` bytes.
///
/// The middle window is centered at `len / 2`.
#[must_use]
pub fn sample_offsets(len: u64) -> [u64; 3] {
    let middle = (len / 2).saturating_sub(SAMPLE_WINDOW / 2);
    let tail = len.saturating_sub(SAMPLE_WINDOW);
    [0, middle, tail]
}

fn sampled_hash(file: &mut File, len: u64, path: &Path) -> Result<Fingerprint, FingerprintError> {
    let mut hasher = blake3::Hasher::new();
    let mut window = vec![0u8; SAMPLE_WINDOW as usize];

    for offset in sample_offsets(len) {
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| FingerprintError::from_io(path, e))?;
        file.read_exact(&mut window)
            .map_err(|e| FingerprintError::from_io(path, e))?;
        hasher.update(&window);
    }

    log::trace!("Sampled fingerprint for {} ({} bytes)", path.display(), len);
    Ok(Fingerprint::new(SAMPLED_SCHEME, hasher.finalize()))
}
