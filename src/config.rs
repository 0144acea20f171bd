//! Configuration for the scale-test harness.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaleTestError};

/// Named operations measured under static provisioning.
pub const STATIC_TARGET_FUNCS: &[&str] = &["NodePublishVolume", "NodeUnpublishVolume"];

/// Named operations measured under dynamic provisioning.
pub const DYNAMIC_TARGET_FUNCS: &[&str] = &[
    "ControllerCreateVolume",
    "ControllerDeleteVolume",
    "ControllerPublishVolume",
    "ControllerUnpublishVolume",
    "NodePublishVolume",
    "NodeUnpublishVolume",
];

/// Strategy under which the tested volume is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningMode {
    Static,
    Dynamic,
}

impl ProvisioningMode {
    /// The fixed table of named operations measured under this mode.
    pub fn target_functions(self) -> &'static [&'static str] {
        match self {
            Self::Static => STATIC_TARGET_FUNCS,
            Self::Dynamic => DYNAMIC_TARGET_FUNCS,
        }
    }
}

impl fmt::Display for ProvisioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl FromStr for ProvisioningMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(format!(
                "unknown provisioning mode '{other}', expected 'static' or 'dynamic'"
            )),
        }
    }
}

/// Complete harness configuration for one batch of scale runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleTestConfig {
    /// CSI driver name substituted into workload templates.
    pub csi_name: String,
    /// Lustre MGS IP address substituted into workload templates.
    pub mgs_ip_address: String,
    /// Lustre filesystem name substituted into workload templates.
    pub fs_name: String,
    /// Volume provisioning strategy; selects the measured operation set.
    pub provisioning_mode: ProvisioningMode,
    /// Load levels to test, run strictly sequentially.
    pub scales: Vec<u32>,
    /// Workload descriptor template.
    pub template_path: PathBuf,
    /// Working directory holding the generated descriptor, the `logs/`
    /// capture directory and the per-scale result files.
    pub work_dir: PathBuf,
    /// Label selector identifying the deployed workload pods.
    pub workload_selector: String,
    /// Label selectors for the driver pods whose logs are captured.
    pub log_selectors: Vec<String>,
    /// Namespace the driver pods run in.
    pub log_namespace: String,
    /// Container to fetch driver logs from.
    pub log_container: String,
    /// Driver install script, run during provisioning.
    pub install_script: PathBuf,
    /// Driver uninstall script, run before reinstalling.
    pub uninstall_script: PathBuf,
    /// Bound on the workload readiness wait, in seconds.
    pub ready_timeout_secs: u64,
    /// Bound on the workload deletion wait, in seconds.
    pub delete_timeout_secs: u64,
    /// Settle delay between readiness and teardown, in seconds.
    pub settle_delay_secs: u64,
}

impl Default for ScaleTestConfig {
    fn default() -> Self {
        Self {
            csi_name: "azurelustre.csi.azure.com".to_string(),
            mgs_ip_address: "127.0.0.1".to_string(),
            fs_name: "lustrefs".to_string(),
            provisioning_mode: ProvisioningMode::Static,
            scales: vec![10],
            template_path: PathBuf::from("templates/static_workload.yml.template"),
            work_dir: PathBuf::from("./scale-test"),
            workload_selector: "app=csi-scale-test".to_string(),
            log_selectors: vec![
                "app=csi-azurelustre-controller".to_string(),
                "app=csi-azurelustre-node".to_string(),
            ],
            log_namespace: "kube-system".to_string(),
            log_container: "azurelustre".to_string(),
            install_script: PathBuf::from("deploy/install-driver.sh"),
            uninstall_script: PathBuf::from("deploy/uninstall-driver.sh"),
            ready_timeout_secs: 300,
            delete_timeout_secs: 300,
            settle_delay_secs: 10,
        }
    }
}

impl ScaleTestConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ScaleTestError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ScaleTestError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override timing knobs from environment variables if present.
    /// Unparseable values are ignored and the prior setting is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var("CSI_SCALE_READY_TIMEOUT") {
            self.ready_timeout_secs = timeout.parse().unwrap_or(self.ready_timeout_secs);
        }
        if let Ok(timeout) = std::env::var("CSI_SCALE_DELETE_TIMEOUT") {
            self.delete_timeout_secs = timeout.parse().unwrap_or(self.delete_timeout_secs);
        }
        if let Ok(delay) = std::env::var("CSI_SCALE_SETTLE_DELAY") {
            self.settle_delay_secs = delay.parse().unwrap_or(self.settle_delay_secs);
        }
    }

    /// Reject configurations the orchestrator cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.scales.is_empty() {
            return Err(ScaleTestError::Config("no scales configured".to_string()));
        }
        if self.log_selectors.is_empty() {
            return Err(ScaleTestError::Config(
                "no log selectors configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Flat interpolation map for one scale; rebuilt whenever the scale
    /// changes.
    pub fn parameters(&self, scale: u32) -> HashMap<String, String> {
        HashMap::from([
            ("csi_name".to_string(), self.csi_name.clone()),
            ("mgs_ip_address".to_string(), self.mgs_ip_address.clone()),
            ("fs_name".to_string(), self.fs_name.clone()),
            ("scale".to_string(), scale.to_string()),
        ])
    }

    /// Path of the generated workload descriptor.
    pub fn descriptor_path(&self) -> PathBuf {
        self.work_dir.join("tmp_workload.yml")
    }

    /// Path of the per-run log capture directory.
    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }

    /// Directory the per-scale result files are written to.
    pub fn result_dir(&self) -> PathBuf {
        self.work_dir.clone()
    }
}
