//! Remote-shell connection establishment with bounded retry.
//!
//! The transport itself (key handling, session mechanics) is a collaborator
//! implemented outside this crate; this module only owns the retry policy:
//! a fixed number of attempts with a fixed delay between them.

use async_trait::async_trait;
use snafu::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::config::ShellConfig;
use crate::emit;
use crate::error::{ConnectionFailedSnafu, ShellError};
use crate::metrics::events::{ConnectStatus, ShellConnectAttempt};

/// Credential presented to the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCredential {
    KeyFile(PathBuf),
    Password(String),
}

/// Abstract remote-shell transport.
#[async_trait]
pub trait ShellTransport: Send + Sync {
    /// Established session type.
    type Session: Send;
    /// Transport-level connection error.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(
        &self,
        address: &str,
        user: &str,
        credential: &ShellCredential,
    ) -> Result<Self::Session, Self::Error>;
}

/// Bounded-retry policy for connection establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
        }
    }
}

impl From<&ShellConfig> for RetryPolicy {
    fn from(config: &ShellConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Connect to a remote host, retrying under the given policy.
///
/// Each failed attempt is logged and followed by the fixed delay; the delay
/// is skipped after the final attempt. Exhausting all attempts is fatal to
/// the calling operation and returns [`ShellError::ConnectionFailed`].
pub async fn connect_with_retry<T: ShellTransport>(
    transport: &T,
    address: &str,
    user: &str,
    credential: &ShellCredential,
    policy: &RetryPolicy,
) -> Result<T::Session, ShellError> {
    for attempt in 1..=policy.max_attempts {
        match transport.connect(address, user, credential).await {
            Ok(session) => {
                emit!(ShellConnectAttempt {
                    status: ConnectStatus::Success,
                });
                return Ok(session);
            }
            Err(err) => {
                emit!(ShellConnectAttempt {
                    status: ConnectStatus::Error,
                });
                warn!(address, attempt, error = %err, "Connection failed, trying to reconnect");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    ConnectionFailedSnafu {
        address: address.to_string(),
        attempts: policy.max_attempts,
    }
    .fail()
}
