//! External cluster collaborators.
//!
//! The orchestrator only depends on the [`ClusterControl`] trait; the
//! kubectl-backed implementation here is the production transport. Tests
//! substitute their own implementations.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ScaleTestConfig;
use crate::error::{Result, ScaleTestError};

/// Cluster operations the orchestrator drives. All calls are awaited
/// strictly sequentially; implementations need no internal coordination.
#[async_trait]
pub trait ClusterControl: Send + Sync {
    /// Idempotent redeployment of the driver under test.
    async fn reinstall_driver(&self) -> Result<()>;

    /// Submits the rendered workload descriptor.
    async fn deploy_workload(&self, descriptor: &str) -> Result<()>;

    /// Blocks until the workload pods report ready, bounded by `timeout`.
    async fn wait_ready(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Requests deletion of the deployed workload. Absence is not an error.
    async fn delete_workload(&self, descriptor: &str) -> Result<()>;

    /// Blocks until the workload pods are gone.
    async fn wait_deleted(&self, selector: &str) -> Result<()>;

    /// Lists the process (pod) ids matching `selector`.
    async fn list_processes(&self, selector: &str) -> Result<Vec<String>>;

    /// Fetches the service log of one process as text lines.
    async fn fetch_log(&self, process_id: &str) -> Result<Vec<String>>;
}

/// kubectl-backed [`ClusterControl`] driving a real cluster.
pub struct KubectlCluster {
    namespace: String,
    container: String,
    install_script: PathBuf,
    uninstall_script: PathBuf,
    delete_timeout: Duration,
}

impl KubectlCluster {
    pub fn new(config: &ScaleTestConfig) -> Self {
        Self {
            namespace: config.log_namespace.clone(),
            container: config.log_container.clone(),
            install_script: config.install_script.clone(),
            uninstall_script: config.uninstall_script.clone(),
            delete_timeout: Duration::from_secs(config.delete_timeout_secs),
        }
    }

    fn apply_args() -> Vec<String> {
        vec!["apply".to_string(), "-f".to_string(), "-".to_string()]
    }

    fn delete_args() -> Vec<String> {
        vec![
            "delete".to_string(),
            "-f".to_string(),
            "-".to_string(),
            "--ignore-not-found".to_string(),
        ]
    }

    fn wait_ready_args(selector: &str, timeout: Duration) -> Vec<String> {
        vec![
            "wait".to_string(),
            "pod".to_string(),
            "--for=condition=Ready".to_string(),
            format!("--selector={selector}"),
            format!("--timeout={}s", timeout.as_secs()),
        ]
    }

    fn wait_deleted_args(selector: &str, timeout: Duration) -> Vec<String> {
        vec![
            "wait".to_string(),
            "pod".to_string(),
            "--for=delete".to_string(),
            format!("--selector={selector}"),
            format!("--timeout={}s", timeout.as_secs()),
        ]
    }

    fn list_pods_args(&self, selector: &str) -> Vec<String> {
        vec![
            "get".to_string(),
            "pods".to_string(),
            format!("-n{}", self.namespace),
            format!("--selector={selector}"),
            "--no-headers".to_string(),
            "-o".to_string(),
            "custom-columns=:metadata.name".to_string(),
        ]
    }

    fn logs_args(&self, pod: &str) -> Vec<String> {
        vec![
            "logs".to_string(),
            pod.to_string(),
            format!("-n{}", self.namespace),
            format!("-c{}", self.container),
        ]
    }

    async fn run_kubectl(&self, args: &[String], stdin: Option<&str>) -> Result<String> {
        debug!("running kubectl {}", args.join(" "));
        let mut cmd = Command::new("kubectl");
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut handle)) = (stdin, child.stdin.take()) {
            handle.write_all(input.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ScaleTestError::ExternalCollaborator(format!(
                "kubectl {} exited with {}",
                args.join(" "),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_script(&self, script: &Path) -> Result<()> {
        info!("running {}", script.display());
        let status = Command::new(script).status().await?;
        if !status.success() {
            return Err(ScaleTestError::ExternalCollaborator(format!(
                "{} exited with {status}",
                script.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterControl for KubectlCluster {
    async fn reinstall_driver(&self) -> Result<()> {
        info!("reinstalling CSI driver");
        self.run_script(&self.uninstall_script).await?;
        self.run_script(&self.install_script).await
    }

    async fn deploy_workload(&self, descriptor: &str) -> Result<()> {
        self.run_kubectl(&Self::apply_args(), Some(descriptor))
            .await
            .map(drop)
    }

    async fn wait_ready(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.run_kubectl(&Self::wait_ready_args(selector, timeout), None)
            .await
            .map(drop)
            .map_err(|e| ScaleTestError::ReadinessTimeout(timeout.as_secs(), e.to_string()))
    }

    async fn delete_workload(&self, descriptor: &str) -> Result<()> {
        self.run_kubectl(&Self::delete_args(), Some(descriptor))
            .await
            .map(drop)
    }

    async fn wait_deleted(&self, selector: &str) -> Result<()> {
        self.run_kubectl(&Self::wait_deleted_args(selector, self.delete_timeout), None)
            .await
            .map(drop)
            .map_err(|e| {
                ScaleTestError::DeletionTimeout(self.delete_timeout.as_secs(), e.to_string())
            })
    }

    async fn list_processes(&self, selector: &str) -> Result<Vec<String>> {
        let stdout = self.run_kubectl(&self.list_pods_args(selector), None).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn fetch_log(&self, process_id: &str) -> Result<Vec<String>> {
        let stdout = self.run_kubectl(&self.logs_args(process_id), None).await?;
        Ok(stdout.lines().map(str::to_string).collect())
    }
}
