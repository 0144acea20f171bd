//! Scale and performance test harness for a CSI storage-driver control
//! plane.
//!
//! For each configured load level the harness:
//! - renders a workload descriptor from a `${param}` template,
//! - deploys it against the cluster and waits for readiness,
//! - drains the workload and captures the driver's service logs,
//! - extracts `latency_seconds=` samples for named remote calls,
//! - writes one JSON result file per (provisioning mode, scale),
//! - and cleans up unconditionally, whatever the run's outcome.

pub mod cluster;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod template;

pub use cluster::{ClusterControl, KubectlCluster};
pub use config::{ProvisioningMode, ScaleTestConfig};
pub use error::{Result, ScaleTestError};
pub use metrics::{MetricsCollector, NamedOperation, OperationStats};
pub use orchestrator::{RunPhase, ScaleTestOrchestrator};
pub use report::{FuncResult, ScaleRunResult};
