//! Abstract cloud-provider capabilities.
//!
//! Defines the request/response types exchanged with a compute provider and
//! the capability traits (`ComputeApi`, `OperationsApi`, `MonitoringApi`)
//! implemented once per backend. The library never talks HTTP itself; a
//! backend adapter owns the transport and surfaces failures as
//! [`ProviderError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Resource-hierarchy level of a provider operation.
///
/// The scope determines which status endpoint and key set applies:
/// global operations need only the project, regional and zonal operations
/// additionally carry the region or zone name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationScope {
    Global,
    Region(String),
    Zone(String),
}

/// Handle to an asynchronous provider operation.
///
/// Returned by mutating API calls and consumed exactly once by the
/// operation poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
    pub scope: OperationScope,
}

impl OperationHandle {
    pub fn zonal(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: OperationScope::Zone(zone.into()),
        }
    }

    pub fn regional(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: OperationScope::Region(region.into()),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: OperationScope::Global,
        }
    }
}

/// A single entry in an operation's error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorEntry {
    pub code: String,
    pub message: String,
}

/// Error payload embedded in a terminal operation result.
///
/// Carried verbatim into [`crate::error::OperationError::OperationFailed`]
/// when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorDetail {
    pub errors: Vec<OperationErrorEntry>,
}

impl std::fmt::Display for OperationErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for entry in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", entry.code, entry.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Status of an asynchronous operation as reported by the provider.
///
/// The status is kept as the provider's literal string; the poller compares
/// it against its configured terminal value rather than interpreting
/// intermediate states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrorDetail>,
}

/// Instance creation request body.
///
/// Field names serialize to the provider's camelCase wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertInstanceRequest {
    pub name: String,
    /// Machine type URI, e.g. `zones/<zone>/machineTypes/<type>`.
    pub machine_type: String,
    pub tags: Tags,
    pub disks: Vec<AttachedDisk>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub service_accounts: Vec<ServiceAccount>,
    pub metadata: Metadata,
}

/// Network tags attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    pub items: Vec<String>,
}

/// A disk attached at instance creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    pub boot: bool,
    pub auto_delete: bool,
    pub initialize_params: InitializeParams,
}

/// Boot disk initialization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Image URI, e.g. `projects/<project>/global/images/<image>`.
    pub source_image: String,
}

/// A network interface on an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

/// An access configuration granting external reachability (NAT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// External address, present only on instance resources returned by the
    /// provider, never on creation requests.
    #[serde(rename = "natIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
}

/// Service account binding with OAuth scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub email: String,
    pub scopes: Vec<String>,
}

/// Instance metadata key/value items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

/// Instance resource as returned by lookups and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResource {
    pub name: String,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl InstanceResource {
    /// Externally reachable address: the first network interface's first
    /// access configuration.
    pub fn external_address(&self) -> Option<&str> {
        self.network_interfaces
            .first()
            .and_then(|iface| iface.access_configs.first())
            .and_then(|access| access.nat_ip.as_deref())
    }
}

/// Time series query parameters.
///
/// The provider names its time bounds `oldest`/`youngest`; `oldest` receives
/// the start of the window and `youngest` the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesQuery {
    pub metric: String,
    pub oldest: String,
    pub youngest: String,
    pub label_filter: String,
}

/// A raw data point as returned by the monitoring API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    /// Textual end timestamp, `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
    pub end: String,
    pub double_value: f64,
}

/// One label-keyed series in a monitoring response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesData {
    /// Instance name label extracted from the series descriptor.
    pub instance_name: String,
    pub points: Vec<RawPoint>,
}

/// Monitoring API response: zero or more label-keyed series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    pub timeseries: Vec<TimeSeriesData>,
}

/// Compute provisioning API.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Submit an instance creation request, returning the operation handle.
    async fn insert(&self, request: &InsertInstanceRequest)
        -> Result<OperationHandle, ProviderError>;

    /// Fetch an instance resource by name.
    async fn get(&self, name: &str) -> Result<InstanceResource, ProviderError>;

    /// List instance resources matching a provider-side filter expression.
    async fn list(&self, filter: &str) -> Result<Vec<InstanceResource>, ProviderError>;

    /// Submit an instance deletion request, returning the operation handle.
    async fn delete(&self, name: &str) -> Result<OperationHandle, ProviderError>;
}

/// Operation status API.
#[async_trait]
pub trait OperationsApi: Send + Sync {
    /// Fetch the current result of an operation within the given scope.
    async fn get_operation(
        &self,
        scope: &OperationScope,
        name: &str,
    ) -> Result<OperationResult, ProviderError>;
}

/// Metrics API.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// Query raw time series for a metric over a time window.
    async fn list_time_series(
        &self,
        query: &TimeSeriesQuery,
    ) -> Result<TimeSeriesResponse, ProviderError>;
}
