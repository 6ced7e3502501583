//! squall: cloud fleet provisioning and telemetry for a distributed
//! load-testing harness.
//!
//! This library stands up a fleet of test-runner instances against an
//! abstract compute provider, polls the provider's asynchronous operations
//! to completion, and collects per-instance CPU utilization over a time
//! window. It owns no HTTP transport or CLI surface; provider backends and
//! the orchestration driver live in the embedding application.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use squall::{Config, InstanceManager, OperationPoller};
//!
//! let config = Arc::new(Config::from_file("config.yaml")?);
//! let poller = OperationPoller::new(operations_api, &config.poller);
//! let manager = InstanceManager::new(compute_api, poller, config.clone());
//! let instance = manager.create_instance().await?;
//! ```

pub mod config;
pub mod error;
pub mod instance;
pub mod metrics;
pub mod operation;
pub mod provider;
pub mod shell;
pub mod telemetry;

// Re-export main types
pub use config::{Config, CreateFailurePolicy};
pub use error::SquallError;
pub use instance::{Instance, InstanceManager};
pub use operation::OperationPoller;
pub use provider::{ComputeApi, MonitoringApi, OperationHandle, OperationScope, OperationsApi};
pub use shell::{RetryPolicy, ShellCredential, ShellTransport, connect_with_retry};
pub use telemetry::{MetricPoint, MetricSeries, TelemetryAggregator};
