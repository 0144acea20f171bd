//! Result snapshots and persistence.
//!
//! One result file is written per (provisioning mode, scale). The file body
//! is a JSON object `{"func_results": [...]}` whose field names are consumed
//! by downstream reporting tools and must not change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProvisioningMode;
use crate::error::Result;

/// Aggregated latency summary for one named operation.
///
/// Field names are part of the external result-file contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncResult {
    pub func_name: String,
    pub num: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub points: Vec<f64>,
}

/// Snapshot of one scale run, taken when log parsing completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleRunResult {
    pub provisioning_mode: ProvisioningMode,
    pub scale: u32,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub func_results: Vec<FuncResult>,
}

/// Wire shape of the persisted result file.
#[derive(Serialize)]
struct ResultDocument<'a> {
    func_results: &'a [FuncResult],
}

impl ScaleRunResult {
    pub fn new(
        provisioning_mode: ProvisioningMode,
        scale: u32,
        func_results: Vec<FuncResult>,
    ) -> Self {
        Self {
            provisioning_mode,
            scale,
            completed_at: chrono::Utc::now(),
            func_results,
        }
    }

    /// File name keyed by provisioning mode and scale, so runs at other
    /// scales are never overwritten.
    pub fn file_name(&self) -> String {
        format!("result_{}_{}", self.provisioning_mode, self.scale)
    }

    /// Serializes the external result document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&ResultDocument {
            func_results: &self.func_results,
        })?)
    }

    /// Writes the result document under `dir`, returning the written path.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.to_json()?).await?;
        info!("scale {} result written to {}", self.scale, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ScaleRunResult {
        ScaleRunResult::new(
            ProvisioningMode::Static,
            100,
            vec![FuncResult {
                func_name: "NodePublishVolume".to_string(),
                num: 2,
                min: 0.25,
                max: 0.75,
                avg: 0.5,
                points: vec![0.25, 0.75],
            }],
        )
    }

    #[test]
    fn file_name_keyed_by_mode_and_scale() {
        assert_eq!(sample_result().file_name(), "result_static_100");
    }

    #[test]
    fn json_document_matches_contract() {
        let json = sample_result().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let funcs = value["func_results"].as_array().unwrap();
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0]["func_name"], "NodePublishVolume");
        assert_eq!(funcs[0]["num"], 2);
        assert_eq!(funcs[0]["min"], 0.25);
        assert_eq!(funcs[0]["max"], 0.75);
        assert_eq!(funcs[0]["avg"], 0.5);
        assert_eq!(funcs[0]["points"][1], 0.75);
        // Only func_results is part of the file contract.
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_result().write_to(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("result_static_100"));

        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(body.contains("\"func_results\""));
    }
}
