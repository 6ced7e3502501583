//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the provisioning
//! and telemetry flows. Events implement the `InternalEvent` trait which
//! emits the corresponding Prometheus metric.

use metrics::{counter, histogram};
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Terminal outcome of an awaited provider operation.
#[derive(Debug, Clone, Copy)]
pub enum OperationOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl OperationOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            OperationOutcome::Succeeded => "succeeded",
            OperationOutcome::Failed => "failed",
            OperationOutcome::TimedOut => "timed_out",
        }
    }
}

/// Event emitted when an awaited operation reaches a terminal outcome.
pub struct OperationCompleted {
    pub outcome: OperationOutcome,
    pub polls: u64,
}

impl InternalEvent for OperationCompleted {
    fn emit(self) {
        trace!(outcome = self.outcome.as_str(), polls = self.polls, "Operation completed");
        counter!("squall_operations_total", "outcome" => self.outcome.as_str()).increment(1);
        histogram!("squall_operation_polls").record(self.polls as f64);
    }
}

/// Event emitted when an instance is provisioned.
pub struct InstanceProvisioned;

impl InternalEvent for InstanceProvisioned {
    fn emit(self) {
        trace!("Instance provisioned");
        counter!("squall_instances_provisioned_total").increment(1);
    }
}

/// Event emitted when an instance is terminated.
pub struct InstanceTerminated;

impl InternalEvent for InstanceTerminated {
    fn emit(self) {
        trace!("Instance terminated");
        counter!("squall_instances_terminated_total").increment(1);
    }
}

/// Status of a remote-shell connection attempt.
#[derive(Debug, Clone, Copy)]
pub enum ConnectStatus {
    Success,
    Error,
}

impl ConnectStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ConnectStatus::Success => "success",
            ConnectStatus::Error => "error",
        }
    }
}

/// Event emitted per remote-shell connection attempt.
pub struct ShellConnectAttempt {
    pub status: ConnectStatus,
}

impl InternalEvent for ShellConnectAttempt {
    fn emit(self) {
        trace!(status = self.status.as_str(), "Shell connect attempt");
        counter!("squall_shell_connect_attempts_total", "status" => self.status.as_str())
            .increment(1);
    }
}

/// Event emitted when metric points are fetched from the monitoring API.
pub struct MetricPointsFetched {
    pub count: u64,
}

impl InternalEvent for MetricPointsFetched {
    fn emit(self) {
        trace!(count = self.count, "Metric points fetched");
        counter!("squall_metric_points_fetched_total").increment(self.count);
    }
}
