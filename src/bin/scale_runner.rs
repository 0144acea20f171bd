//! Command-line entry point for the CSI scale-test harness.
//!
//! Drives the full measurement pipeline for each requested scale:
//! provisioning, workload deployment, log capture, latency extraction and
//! result persistence, with guaranteed per-scale cleanup.

use std::path::PathBuf;

use clap::Parser;
use csi_scale_bench::{KubectlCluster, ProvisioningMode, ScaleTestConfig, ScaleTestOrchestrator};
use tracing::info;

#[derive(Parser)]
#[command(name = "csi-scale-bench")]
#[command(about = "Scale and performance test harness for the CSI storage driver")]
struct Cli {
    /// Provisioning type, static or dynamic
    #[arg(long)]
    provisioning_type: ProvisioningMode,

    /// Scale list to test
    #[arg(long, num_args = 1.., required = true)]
    scales: Vec<u32>,

    /// CSI driver name
    #[arg(long)]
    csi_name: String,

    /// Lustre MGS IP address
    #[arg(long)]
    mgs_ip_address: String,

    /// Lustre filesystem name
    #[arg(long)]
    fs_name: String,

    /// Workload template path (defaults to the mode's bundled template)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Working directory for descriptors, captured logs and results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("csi_scale_bench={log_level}"))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => ScaleTestConfig::from_file(path)?,
        None => ScaleTestConfig::default(),
    };
    config.apply_env_overrides();

    config.provisioning_mode = cli.provisioning_type;
    config.scales = cli.scales;
    config.csi_name = cli.csi_name;
    config.mgs_ip_address = cli.mgs_ip_address;
    config.fs_name = cli.fs_name;
    if let Some(template) = cli.template {
        config.template_path = template;
    } else if cli.config.is_none() {
        config.template_path = default_template(config.provisioning_mode);
    }
    if let Some(output) = cli.output {
        config.work_dir = output;
    }
    config.validate()?;

    info!(
        "testing {} provisioning at scales {:?}",
        config.provisioning_mode, config.scales
    );

    let cluster = KubectlCluster::new(&config);
    let mut orchestrator = ScaleTestOrchestrator::new(config, cluster);
    let written = orchestrator.run().await;

    info!("wrote {} result files", written.len());
    for path in &written {
        info!("  {}", path.display());
    }
    Ok(())
}

fn default_template(mode: ProvisioningMode) -> PathBuf {
    match mode {
        ProvisioningMode::Static => PathBuf::from("templates/static_workload.yml.template"),
        ProvisioningMode::Dynamic => PathBuf::from("templates/dynamic_workload.yml.template"),
    }
}
