//! Persistence adapter (C7): JSON read/write against the fixed directory layout from
//! `spec.md` §6, rooted at a configurable base directory (`out/` by default, as in the Go
//! source) so tests can point it at a scratch directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PorError;
use crate::types::{CompletedProof, JsonCompletedProof, JsonProofElements};

/// Root of the `out/secret`, `out/public`, `out/user` tree.
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn secret_batch_path(&self, index: usize) -> PathBuf {
        self.base.join("secret").join(format!("test_data_{index}.json"))
    }

    pub fn bottom_proof_path(&self, index: usize) -> PathBuf {
        self.base.join("public").join(format!("test_proof_{index}.json"))
    }

    pub fn mid_proof_path(&self, index: usize) -> PathBuf {
        self.base.join("public").join(format!("test_mid_level_proof_{index}.json"))
    }

    pub fn top_proof_path(&self) -> PathBuf {
        self.base.join("public").join("test_top_level_proof_0.json")
    }

    pub fn user_account_path(&self) -> PathBuf {
        self.base.join("user").join("test_account.json")
    }

    fn ensure_parent(path: &Path) -> Result<(), PorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PorError::Configuration {
                message: format!("could not create directory {}: {e}", parent.display()),
            })?;
        }
        Ok(())
    }
}

/// Writes any serde-serializable value as pretty JSON, creating parent directories as
/// needed — the same `json.NewEncoder(file).SetIndent("", "  ")` shape
/// `examples/original_source/core/utils.go`'s `writeJson` uses.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), PorError> {
    Layout::ensure_parent(path)?;
    let file = fs::File::create(path).map_err(|e| PorError::Configuration {
        message: format!("could not create {}: {e}", path.display()),
    })?;
    serde_json::to_writer_pretty(file, value).map_err(|e| PorError::Format {
        path: path.display().to_string(),
        what: "json",
        source: Box::new(e),
    })
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PorError> {
    let file = fs::File::open(path).map_err(|e| PorError::Configuration {
        message: format!("could not open {}: {e}", path.display()),
    })?;
    serde_json::from_reader(file).map_err(|e| PorError::Format {
        path: path.display().to_string(),
        what: "json",
        source: Box::new(e),
    })
}

/// Strips `assetSum` before persisting — only the top-level proof keeps it
/// (`spec.md` §4.5, §3 "Lifecycles").
pub fn write_public_proof(path: &Path, proof: &CompletedProof, include_asset_sum: bool) -> Result<(), PorError> {
    let mut json = proof.to_json()?;
    if !include_asset_sum {
        json.asset_sum = None;
    }
    write_json(path, &json)
}

pub fn read_public_proof(path: &Path) -> Result<CompletedProof, PorError> {
    let json: JsonCompletedProof = read_json(path)?;
    CompletedProof::from_json(&json)
}

pub fn write_secret_batch(path: &Path, elements: &JsonProofElements) -> Result<(), PorError> {
    write_json(path, elements)
}

pub fn read_secret_batch(path: &Path) -> Result<JsonProofElements, PorError> {
    read_json(path)
}
