// Fetch-if-changed collaborator and the on-disk snapshot store.
//
// A download only counts as "changed" when its SHA-512 differs from the
// checksum recorded for the previous snapshot.
use chrono::NaiveDate;
use sha2::{Digest, Sha512};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::loader::strip_bom;
use crate::output::write_atomic;

pub const CHECKSUM_PREFIX: &str = "SHA512:";
const CHECKSUM_FILE: &str = "latest.checksum";
const SNAPSHOT_EXTENSIONS: &[&str] = &["json", "csv"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Changed { bytes: Vec<u8>, checksum: String },
    Unchanged,
}

pub trait Fetch {
    fn fetch(&self, url: &str, prior_checksum: Option<&str>) -> Result<FetchOutcome, FetchError>;
}

/// `SHA512:<hex>` over the content with any UTF-8 BOM removed.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(strip_bom(bytes));
    format!("{}{:x}", CHECKSUM_PREFIX, hasher.finalize())
}

/// Compare freshly downloaded bytes against the previous checksum.
pub fn classify(bytes: Vec<u8>, prior_checksum: Option<&str>) -> FetchOutcome {
    let bytes = strip_bom(&bytes).to_vec();
    let checksum = checksum(&bytes);
    if prior_checksum.map(str::trim) == Some(checksum.as_str()) {
        FetchOutcome::Unchanged
    } else {
        FetchOutcome::Changed { bytes, checksum }
    }
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, prior_checksum: Option<&str>) -> Result<FetchOutcome, FetchError> {
        let http = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(http)?;
        debug!(url, len = bytes.len(), "downloaded dataset");
        Ok(classify(bytes.to_vec(), prior_checksum))
    }
}

/// Dated snapshots (`YYYYMMDD.<ext>`) plus the checksum of the newest one.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn prior_checksum(&self) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(self.dir.join(CHECKSUM_FILE)) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Store the snapshot first and the checksum second, so an interrupted
    /// save is retried on the next run.
    pub fn save(
        &self,
        date: NaiveDate,
        extension: &str,
        bytes: &[u8],
        checksum: &str,
    ) -> std::io::Result<PathBuf> {
        let path = self
            .dir
            .join(format!("{}.{}", date.format("%Y%m%d"), extension));
        write_atomic(&path, bytes)?;
        write_atomic(&self.dir.join(CHECKSUM_FILE), checksum.as_bytes())?;
        Ok(path)
    }

    /// Newest stored snapshot, by date in the file name.
    pub fn latest(&self) -> std::io::Result<Option<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut best: Option<(String, PathBuf)> = None;
        for entry in entries {
            let path = entry?.path();
            if !is_snapshot(&path) {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if best.as_ref().map_or(true, |(b, _)| stem > *b) {
                best = Some((stem, path));
            }
        }
        Ok(best.map(|(_, path)| path))
    }
}

fn is_snapshot(path: &Path) -> bool {
    let stem_ok = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()));
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SNAPSHOT_EXTENSIONS.contains(&e));
    stem_ok && ext_ok
}
