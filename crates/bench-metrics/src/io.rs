use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MetricsError, Result};
use crate::record::{decode_records, TrialRecord};

/// Decoded results file plus the provenance needed to tie a report to it.
#[derive(Debug, Clone)]
pub struct ResultsFile {
    pub path: PathBuf,
    pub digest: String,
    pub records: Vec<TrialRecord>,
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

pub fn parse_results(path: &Path, bytes: &[u8]) -> Result<Vec<TrialRecord>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| MetricsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    decode_records(&value)
}

pub fn load_results(path: &Path) -> Result<ResultsFile> {
    let bytes = fs::read(path).map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_results(path, &bytes)?;
    Ok(ResultsFile {
        path: path.to_path_buf(),
        digest: sha256_bytes(&bytes),
        records,
    })
}
