//! Scale-test orchestration.
//!
//! One run per requested scale. Phases advance strictly forward:
//!
//! `Idle → Provisioned → WorkloadDeployed → WorkloadDrained → LogsCollected
//! → ResultParsed → ResultWritten → CleanedUp`
//!
//! A failure anywhere between provisioning and result writing ends the
//! current scale's run early; cleanup runs unconditionally either way, and
//! the harness then moves on to the next scale. Scales never run
//! concurrently since they share the deployment namespace and log paths.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs;
use tracing::{info, warn};

use crate::cluster::ClusterControl;
use crate::config::ScaleTestConfig;
use crate::error::Result;
use crate::metrics::{MetricsCollector, NamedOperation};
use crate::report::ScaleRunResult;
use crate::template;

/// Phases of one scale run, entered strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Idle,
    Provisioned,
    WorkloadDeployed,
    WorkloadDrained,
    LogsCollected,
    ResultParsed,
    ResultWritten,
    CleanedUp,
}

/// Drives the per-scale state sequence against a [`ClusterControl`]
/// implementation.
pub struct ScaleTestOrchestrator<C: ClusterControl> {
    config: ScaleTestConfig,
    cluster: C,
    collector: MetricsCollector,
    phase: RunPhase,
}

impl<C: ClusterControl> ScaleTestOrchestrator<C> {
    pub fn new(config: ScaleTestConfig, cluster: C) -> Self {
        let mut collector = MetricsCollector::new();
        for func in config.provisioning_mode.target_functions() {
            collector.register(NamedOperation::new(func));
        }
        Self {
            config,
            cluster,
            collector,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs every configured scale sequentially. A failing scale is logged
    /// and the harness moves on to the next one; cleanup runs either way.
    /// Returns the paths of the result files that were written.
    pub async fn run(&mut self) -> Vec<PathBuf> {
        let scales = self.config.scales.clone();
        let mut written = Vec::new();
        for scale in scales {
            info!("running scale test at scale {scale}");
            match self.run_scale(scale).await {
                Ok(path) => written.push(path),
                Err(e) => warn!("scale {scale} run aborted: {e}"),
            }
            self.clean_up().await;
        }
        written
    }

    async fn run_scale(&mut self, scale: u32) -> Result<PathBuf> {
        self.enter(RunPhase::Idle);
        self.provision().await?;
        let descriptor = self.render_descriptor(scale).await?;
        self.deploy(&descriptor).await?;
        self.drain(&descriptor).await?;
        self.collect_logs().await?;
        self.parse_logs().await?;
        self.write_result(scale).await
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        info!("entering phase {phase:?}");
    }

    /// `Idle → Provisioned`: clean driver deployment, fresh log-capture
    /// directory, statistics reset.
    async fn provision(&mut self) -> Result<()> {
        self.cluster.reinstall_driver().await?;

        let log_dir = self.config.log_dir();
        if fs::try_exists(&log_dir).await? {
            fs::remove_dir_all(&log_dir).await?;
        }
        fs::create_dir_all(&log_dir).await?;

        self.collector.reset();
        self.enter(RunPhase::Provisioned);
        Ok(())
    }

    /// Renders the workload descriptor for this scale and persists it so
    /// cleanup can address the deployed objects later.
    async fn render_descriptor(&self, scale: u32) -> Result<String> {
        let template_text = fs::read_to_string(&self.config.template_path).await?;
        let rendered = template::render(&template_text, &self.config.parameters(scale))?;
        fs::write(self.config.descriptor_path(), &rendered).await?;
        Ok(rendered)
    }

    /// `Provisioned → WorkloadDeployed`: submit and block until ready.
    async fn deploy(&mut self, descriptor: &str) -> Result<()> {
        info!("deploying workload");
        self.cluster.deploy_workload(descriptor).await?;
        info!("waiting for workload ready");
        self.cluster
            .wait_ready(
                &self.config.workload_selector,
                Duration::from_secs(self.config.ready_timeout_secs),
            )
            .await?;
        self.enter(RunPhase::WorkloadDeployed);
        Ok(())
    }

    /// `WorkloadDeployed → WorkloadDrained`: settle, then delete and block
    /// until deletion is confirmed.
    async fn drain(&mut self, descriptor: &str) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(self.config.settle_delay_secs)).await;
        info!("deleting workload");
        self.cluster.delete_workload(descriptor).await?;
        info!("waiting for workload deletion");
        self.cluster
            .wait_deleted(&self.config.workload_selector)
            .await?;
        self.enter(RunPhase::WorkloadDrained);
        Ok(())
    }

    /// `WorkloadDrained → LogsCollected`: one captured file per driver
    /// process.
    async fn collect_logs(&mut self) -> Result<()> {
        let log_dir = self.config.log_dir();
        for selector in &self.config.log_selectors {
            let processes = self.cluster.list_processes(selector).await?;
            info!(
                "collecting logs from {} processes for selector {selector}",
                processes.len()
            );
            for process in processes {
                let lines = self.cluster.fetch_log(&process).await?;
                fs::write(log_dir.join(&process), lines.join("\n")).await?;
            }
        }
        self.enter(RunPhase::LogsCollected);
        Ok(())
    }

    /// `LogsCollected → ResultParsed`: feed every captured file through the
    /// metrics collector.
    async fn parse_logs(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(self.config.log_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            info!("parsing {}", entry.path().display());
            let text = fs::read_to_string(entry.path()).await?;
            self.collector.parse_lines(text.lines());
        }
        self.enter(RunPhase::ResultParsed);
        Ok(())
    }

    /// `ResultParsed → ResultWritten`: persist the snapshot for this scale.
    async fn write_result(&mut self, scale: u32) -> Result<PathBuf> {
        let result = ScaleRunResult::new(
            self.config.provisioning_mode,
            scale,
            self.collector.results(),
        );
        let path = result.write_to(&self.config.result_dir()).await?;
        self.enter(RunPhase::ResultWritten);
        Ok(path)
    }

    /// Unconditional per-run cleanup: remove the deployed workload (absence
    /// tolerated), the log-capture directory and the generated descriptor.
    /// Failures are logged, never propagated, so the next scale can run.
    async fn clean_up(&mut self) {
        let descriptor_path = self.config.descriptor_path();
        if let Ok(descriptor) = fs::read_to_string(&descriptor_path).await {
            if let Err(e) = self.cluster.delete_workload(&descriptor).await {
                warn!("cleanup: workload deletion failed: {e}");
            } else if let Err(e) = self
                .cluster
                .wait_deleted(&self.config.workload_selector)
                .await
            {
                warn!("cleanup: deletion wait failed: {e}");
            }
            if let Err(e) = fs::remove_file(&descriptor_path).await {
                warn!("cleanup: descriptor removal failed: {e}");
            }
        }

        let log_dir = self.config.log_dir();
        match fs::try_exists(&log_dir).await {
            Ok(true) => {
                if let Err(e) = fs::remove_dir_all(&log_dir).await {
                    warn!("cleanup: log directory removal failed: {e}");
                }
            }
            Ok(false) => {}
            Err(e) => warn!("cleanup: log directory check failed: {e}"),
        }

        self.enter(RunPhase::CleanedUp);
    }
}
