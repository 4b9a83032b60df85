//! Artifact loading
//!
//! Estimator and scaler artifacts are gzip-compressed files produced by an
//! out-of-band training job. The payload is either an ONNX graph or a JSON
//! document tagged by `kind`. Artifacts are read fresh for every submission
//! and never cached.

mod estimator;
mod onnx;
mod scaler;

pub use estimator::{Aggregation, LinearModel, Regressor, Tree, TreeEnsemble, TreeNode};
pub use onnx::OnnxRegressor;
#[cfg(test)]
pub(crate) use onnx::test_graphs;
pub use scaler::Scaler;

use crate::error::{ArtifactError, PredictionError};
use crate::models::ModelSummary;
use flate2::read::GzDecoder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default estimator location, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "model_trained_regressor.pkl.gz";

/// Default scaler location, relative to the working directory
pub const DEFAULT_SCALER_PATH: &str = "scaler.pkl.gz";

/// Upper bound on a decompressed payload (64MB)
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;

/// Options applied while loading an artifact
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Hex SHA-256 of the compressed file, checked when set
    pub expected_sha256: Option<String>,
    /// Maximum decompressed size in bytes
    pub max_bytes: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            expected_sha256: None,
            max_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

/// Where an artifact came from
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    /// Size of the compressed file
    pub size_bytes: u64,
    pub sha256: String,
}

/// Decompressed artifact bytes plus provenance
struct RawArtifact {
    info: ArtifactInfo,
    payload: Vec<u8>,
}

impl RawArtifact {
    fn is_json(&self) -> bool {
        self.payload
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{')
    }

    fn parse_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ArtifactError> {
        serde_json::from_slice(&self.payload).map_err(|e| ArtifactError::Format {
            path: self.info.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// A loaded estimator together with its provenance
pub struct Estimator {
    model: Box<dyn Regressor>,
    info: ArtifactInfo,
}

impl Estimator {
    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }
}

impl Regressor for Estimator {
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        self.model.predict(row)
    }

    fn summary(&self) -> ModelSummary {
        let mut summary = self.model.summary();
        summary.sha256 = Some(self.info.sha256.clone());
        summary
    }
}

/// Load the estimator artifact at `path`
pub fn load_estimator(path: &Path, options: &LoadOptions) -> Result<Estimator, ArtifactError> {
    let raw = read_artifact(path, options)?;

    let model: Box<dyn Regressor> = if raw.is_json() {
        let document: estimator::EstimatorDocument = raw.parse_json()?;
        document.into_regressor().map_err(|reason| ArtifactError::Format {
            path: raw.info.path.clone(),
            reason,
        })?
    } else {
        let model = OnnxRegressor::from_bytes(&raw.payload).map_err(|e| ArtifactError::Format {
            path: raw.info.path.clone(),
            reason: format!("{e:#}"),
        })?;
        Box::new(model)
    };

    debug!(path = %raw.info.path.display(), sha256 = %raw.info.sha256, "Estimator loaded");
    Ok(Estimator {
        model,
        info: raw.info,
    })
}

/// Load the optional scaler artifact at `path`.
///
/// A missing file is not an error: it yields `Ok(None)` and prediction
/// proceeds on raw inputs.
pub fn load_scaler(path: &Path, options: &LoadOptions) -> Result<Option<Scaler>, ArtifactError> {
    let raw = match read_artifact(path, options) {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    if !raw.is_json() {
        return Err(ArtifactError::Format {
            path: raw.info.path,
            reason: "scaler payload must be a JSON document".to_string(),
        });
    }

    let scaler: Scaler = raw.parse_json()?;
    debug!(path = %raw.info.path.display(), kind = scaler.kind(), "Scaler loaded");
    Ok(Some(scaler))
}

/// Read, checksum and decompress an artifact file
fn read_artifact(path: &Path, options: &LoadOptions) -> Result<RawArtifact, ArtifactError> {
    let compressed = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let sha256 = compute_checksum(&compressed);
    if let Some(expected) = &options.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&sha256) {
            return Err(ArtifactError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.clone(),
                actual: sha256,
            });
        }
    }

    // Read one byte past the limit so an oversized payload is detectable
    let mut payload = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .take(options.max_bytes.saturating_add(1))
        .read_to_end(&mut payload)
        .map_err(|source| ArtifactError::Decompress {
            path: path.to_path_buf(),
            source,
        })?;

    if payload.len() as u64 > options.max_bytes {
        return Err(ArtifactError::TooLarge {
            path: path.to_path_buf(),
            limit: options.max_bytes,
        });
    }

    Ok(RawArtifact {
        info: ArtifactInfo {
            path: path.to_path_buf(),
            size_bytes: compressed.len() as u64,
            sha256,
        },
        payload,
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_gz(dir: &TempDir, name: &str, payload: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        path
    }

    fn linear_json() -> String {
        serde_json::json!({
            "kind": "linear",
            "coefficients": vec![1.0; 13],
            "intercept": 2.0,
            "params": { "fit_intercept": true }
        })
        .to_string()
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test model weights"));
    }

    #[test]
    fn test_load_linear_estimator() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", linear_json().as_bytes());

        let estimator = load_estimator(&path, &LoadOptions::default()).unwrap();
        assert_eq!(estimator.predict(&[1.0; 13]).unwrap(), 15.0);

        let summary = estimator.summary();
        assert_eq!(summary.kind, "linear");
        assert_eq!(summary.params["fit_intercept"], "true");
        assert_eq!(summary.sha256.as_deref(), Some(estimator.info().sha256.as_str()));
    }

    #[test]
    fn test_load_onnx_estimator() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", &test_graphs::weighted_sum());

        let estimator = load_estimator(&path, &LoadOptions::default()).unwrap();
        assert_eq!(estimator.predict(&[1.0; 13]).unwrap(), 93.0);

        let summary = estimator.summary();
        assert_eq!(summary.kind, "onnx");
        assert_eq!(summary.sha256.as_deref(), Some(estimator.info().sha256.as_str()));
    }

    #[test]
    fn test_missing_estimator_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_estimator(&dir.path().join("absent.gz"), &LoadOptions::default())
            .err()
            .unwrap();
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_uncompressed_file_fails_to_decompress() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.json");
        std::fs::write(&path, linear_json()).unwrap();

        let err = load_estimator(&path, &LoadOptions::default()).err().unwrap();
        assert_eq!(err.kind(), "decompress");
    }

    #[test]
    fn test_unknown_json_kind_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", br#"{"kind": "svr", "support": []}"#);

        let err = load_estimator(&path, &LoadOptions::default()).err().unwrap();
        assert_eq!(err.kind(), "format");
    }

    #[test]
    fn test_garbage_payload_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", b"\x80\x04\x95 not an onnx graph");

        let err = load_estimator(&path, &LoadOptions::default()).err().unwrap();
        assert_eq!(err.kind(), "format");
    }

    #[test]
    fn test_checksum_verification() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", linear_json().as_bytes());
        let actual = compute_checksum(&std::fs::read(&path).unwrap());

        let matching = LoadOptions {
            expected_sha256: Some(actual.to_uppercase()),
            ..Default::default()
        };
        assert!(load_estimator(&path, &matching).is_ok());

        let mismatched = LoadOptions {
            expected_sha256: Some("00".repeat(32)),
            ..Default::default()
        };
        let err = load_estimator(&path, &mismatched).err().unwrap();
        assert_eq!(err.kind(), "checksum_mismatch");
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_gz(&dir, "model.gz", linear_json().as_bytes());

        let options = LoadOptions {
            max_bytes: 16,
            ..Default::default()
        };
        let err = load_estimator(&path, &options).err().unwrap();
        assert_eq!(err.kind(), "too_large");
    }

    #[test]
    fn test_missing_scaler_is_none() {
        let dir = TempDir::new().unwrap();
        let scaler = load_scaler(&dir.path().join("scaler.gz"), &LoadOptions::default()).unwrap();
        assert!(scaler.is_none());
    }

    #[test]
    fn test_load_standard_scaler() {
        let dir = TempDir::new().unwrap();
        let payload = serde_json::json!({
            "kind": "standard",
            "mean": vec![0.0; 13],
            "scale": vec![2.0; 13]
        });
        let path = write_gz(&dir, "scaler.gz", payload.to_string().as_bytes());

        let scaler = load_scaler(&path, &LoadOptions::default()).unwrap().unwrap();
        assert_eq!(scaler.kind(), "standard");
    }

    #[test]
    fn test_corrupt_scaler_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();

        assert!(load_scaler(&path, &LoadOptions::default()).is_err());
    }
}
