//! Configuration parsing and validation.
//!
//! Handles loading configuration from YAML files. Settings are validated
//! once at startup and treated as an immutable bag afterwards; credential
//! material itself (key files, service-account tokens) is only referenced
//! by path here and loaded by the provider backend.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::Path;
use std::time::Duration;

use crate::error::{
    ConfigError, EmptyImageSnafu, EmptyMachineTypeSnafu, EmptyProjectSnafu, EmptyZoneSnafu,
    NoFrontendIdentifiersSnafu, ReadFileSnafu, YamlParseSnafu, ZeroShellAttemptsSnafu,
};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub project: ProjectConfig,
    pub instance: InstanceConfig,
    pub roster: RosterConfig,
    /// Load-test scenario settings, consumed by the orchestration driver.
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// Operation poller settings (optional).
    #[serde(default)]
    pub poller: PollerConfig,
    /// Remote-shell retry settings (optional).
    #[serde(default)]
    pub shell: ShellConfig,
    /// Policy applied when a creation operation fails (default: best-effort).
    #[serde(default)]
    pub create_failure_policy: CreateFailurePolicy,
    /// Metrics configuration (optional, enabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Service-account credential references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub client_email: String,
    pub private_key_path: String,
}

/// Cloud project and placement identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: String,
    pub zone: String,
}

/// Instance template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Image name, resolved to `projects/<project>/global/images/<image>`.
    pub image: String,
    /// Machine type name, resolved to `zones/<zone>/machineTypes/<type>`.
    pub machine_type: String,
    /// Public key injected into instance metadata for remote access.
    pub public_key_path: String,
    /// Private key used by the remote-shell transport.
    pub private_key_path: String,
    /// Remote user for shell sessions.
    pub remote_user: String,
}

/// Frontend instance roster settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Fixed instance names; in autoscaled mode the first entry doubles as
    /// the name prefix used for discovery.
    pub frontend_identifiers: Vec<String>,
    /// Discover the roster dynamically by name-prefix matching instead of
    /// using the fixed list (default: false).
    #[serde(default)]
    pub autoscaled: bool,
}

impl RosterConfig {
    /// Name prefix used for autoscaled discovery and prefix label filters.
    pub fn name_prefix(&self) -> &str {
        self.frontend_identifiers
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Load-test scenario settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub num_threads: u32,
    #[serde(default)]
    pub startup_threads: u32,
    #[serde(default)]
    pub rest_threads: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    /// Number of test-runner nodes to provision.
    #[serde(default = "default_num_workers")]
    pub num_workers: u32,
}

fn default_num_workers() -> u32 {
    1
}

/// Operation poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between unfinished polls (default: 1).
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Provider status value treated as terminal (default: "DONE").
    #[serde(default = "default_terminal_status")]
    pub terminal_status: String,
    /// Maximum seconds to wait for an operation before failing with a
    /// timeout. Unset means wait indefinitely.
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            terminal_status: default_terminal_status(),
            max_wait_secs: None,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_terminal_status() -> String {
    "DONE".to_string()
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}

/// Remote-shell retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Connection attempts before giving up (default: 3).
    #[serde(default = "default_shell_max_attempts")]
    pub max_attempts: u32,
    /// Seconds between attempts (default: 30).
    #[serde(default = "default_shell_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_shell_max_attempts(),
            retry_delay_secs: default_shell_retry_delay_secs(),
        }
    }
}

fn default_shell_max_attempts() -> u32 {
    3
}

fn default_shell_retry_delay_secs() -> u64 {
    30
}

/// Policy applied when a creation operation fails while being awaited.
///
/// `BestEffort` logs the failure and proceeds to look the instance up
/// anyway; `Strict` propagates it to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateFailurePolicy {
    Strict,
    #[default]
    BestEffort,
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.project.project.is_empty(), EmptyProjectSnafu);
        ensure!(!self.project.zone.is_empty(), EmptyZoneSnafu);
        ensure!(!self.instance.image.is_empty(), EmptyImageSnafu);
        ensure!(
            !self.instance.machine_type.is_empty(),
            EmptyMachineTypeSnafu
        );
        ensure!(
            !self.roster.frontend_identifiers.is_empty(),
            NoFrontendIdentifiersSnafu
        );
        ensure!(self.shell.max_attempts >= 1, ZeroShellAttemptsSnafu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
credentials:
  client_email: "loadtest@example-project.iam.gserviceaccount.com"
  private_key_path: "/keys/service.p12"

project:
  project: "example-project"
  zone: "europe-west1-b"

instance:
  image: "jmeter-image"
  machine_type: "n1-standard-2"
  public_key_path: "/keys/id_rsa.pub"
  private_key_path: "/keys/id_rsa"
  remote_user: "loadtest"

roster:
  frontend_identifiers:
    - "frontend"
"#
    }

    #[test]
    fn test_config_yaml_parsing() {
        let config: Config = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.project.project, "example-project");
        assert_eq!(config.instance.machine_type, "n1-standard-2");
        assert_eq!(config.roster.frontend_identifiers, vec!["frontend"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.poller.interval_secs, 1);
        assert_eq!(config.poller.terminal_status, "DONE");
        assert_eq!(config.poller.max_wait_secs, None);
        assert_eq!(config.shell.max_attempts, 3);
        assert_eq!(config.shell.retry_delay_secs, 30);
        assert!(!config.roster.autoscaled);
        assert_eq!(config.create_failure_policy, CreateFailurePolicy::BestEffort);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_validation_rejects_empty_project() {
        let mut config: Config = serde_yaml::from_str(sample_yaml()).unwrap();
        config.project.project = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyProject { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_empty_roster() {
        let mut config: Config = serde_yaml::from_str(sample_yaml()).unwrap();
        config.roster.frontend_identifiers.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoFrontendIdentifiers { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, sample_yaml()).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.project.zone, "europe-west1-b");
    }

    #[test]
    fn test_create_failure_policy_parsing() {
        let yaml = format!("{}\ncreate_failure_policy: strict\n", sample_yaml());
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.create_failure_policy, CreateFailurePolicy::Strict);
    }
}
