//! Error types for squall using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

use crate::provider::OperationErrorDetail;

// ============ Provider Errors ============

/// A failed request against the cloud provider.
///
/// Provider backends translate their transport-level failures into this
/// type; callers wrap it with the snafu context of the operation that
/// issued the request.
#[derive(Debug, Snafu)]
#[snafu(display("Provider request failed: {message}"))]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============ Operation Errors ============

/// Errors that can occur while awaiting a provider operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum OperationError {
    /// The operation reached its terminal state carrying an error payload.
    #[snafu(display("Operation {name} failed: {detail}"))]
    OperationFailed {
        name: String,
        detail: OperationErrorDetail,
    },

    /// The operation did not reach a terminal state within the configured
    /// maximum wait.
    #[snafu(display("Operation {name} did not finish within {waited_secs}s"))]
    PollTimeout { name: String, waited_secs: u64 },

    /// A status poll against the provider failed.
    #[snafu(display("Status poll for operation {name} failed"))]
    StatusRequest { name: String, source: ProviderError },
}

// ============ Provisioning Errors ============

/// Errors that can occur during instance provisioning and teardown.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProvisionError {
    /// Insert request submission failed.
    #[snafu(display("Insert request for instance {name} failed"))]
    Insert { name: String, source: ProviderError },

    /// Instance lookup failed.
    #[snafu(display("Lookup for instance {name} failed"))]
    Lookup { name: String, source: ProviderError },

    /// Instance list request failed.
    #[snafu(display("Instance list request failed"))]
    List { source: ProviderError },

    /// Delete request submission failed.
    #[snafu(display("Delete request for instance {name} failed"))]
    Delete { name: String, source: ProviderError },

    /// The creation operation failed while being awaited.
    #[snafu(display("Creation operation for instance {name} failed"))]
    CreateOperation {
        name: String,
        source: OperationError,
    },

    /// The deletion operation failed while being awaited.
    #[snafu(display("Deletion operation for instance {name} failed"))]
    DeleteOperation {
        name: String,
        source: OperationError,
    },

    /// The instance resource carries no externally reachable address.
    #[snafu(display("Instance {name} has no external address"))]
    MissingAddress { name: String },

    /// Failed to read the public key injected into instance metadata.
    #[snafu(display("Failed to read public key from {path}"))]
    PublicKeyRead {
        path: String,
        source: std::io::Error,
    },
}

// ============ Shell Errors ============

/// Errors that can occur while establishing a remote-shell connection.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ShellError {
    /// All connection attempts were exhausted.
    #[snafu(display("Failed {attempts} times to connect to {address}"))]
    ConnectionFailed { address: String, attempts: u32 },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Project identifier is empty.
    #[snafu(display("Project cannot be empty"))]
    EmptyProject,

    /// Zone identifier is empty.
    #[snafu(display("Zone cannot be empty"))]
    EmptyZone,

    /// Image reference is empty.
    #[snafu(display("Image cannot be empty"))]
    EmptyImage,

    /// Machine type reference is empty.
    #[snafu(display("Machine type cannot be empty"))]
    EmptyMachineType,

    /// No frontend instance identifiers were configured.
    #[snafu(display("At least one frontend identifier is required"))]
    NoFrontendIdentifiers,

    /// Shell retry policy allows zero attempts.
    #[snafu(display("Shell max_attempts must be at least 1"))]
    ZeroShellAttempts,

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Telemetry Errors ============

/// Errors that can occur while fetching and reshaping metric data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TelemetryError {
    /// Time series query failed.
    #[snafu(display("Time series query failed"))]
    Query { source: ProviderError },

    /// The provider returned no series for a requested instance.
    #[snafu(display("No time series returned for instance {instance_id}"))]
    MissingSeries { instance_id: String },

    /// A data point carried an unparseable timestamp.
    #[snafu(display("Failed to parse point timestamp {raw}"))]
    TimestampParse {
        raw: String,
        source: chrono::ParseError,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ Squall Error (top-level) ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SquallError {
    /// Operation polling error.
    #[snafu(display("Operation error"))]
    Operation { source: OperationError },

    /// Provisioning error.
    #[snafu(display("Provisioning error"))]
    Provision { source: ProvisionError },

    /// Remote-shell error.
    #[snafu(display("Shell error"))]
    Shell { source: ShellError },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Telemetry error.
    #[snafu(display("Telemetry error"))]
    Telemetry { source: TelemetryError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },
}
