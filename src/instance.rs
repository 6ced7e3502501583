//! Instance lifecycle management.
//!
//! Creates, locates, and terminates the compute instances that run the
//! distributed test driver. Mutating calls hand their operation handles to
//! the shared [`OperationPoller`]; lookups convert provider resources into
//! the internal [`Instance`] model.

use snafu::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

use crate::config::{Config, CreateFailurePolicy};
use crate::emit;
use crate::error::{
    CreateOperationSnafu, DeleteOperationSnafu, DeleteSnafu, InsertSnafu, ListSnafu, LookupSnafu,
    MissingAddressSnafu, ProvisionError, PublicKeyReadSnafu,
};
use crate::metrics::events::{InstanceProvisioned, InstanceTerminated};
use crate::operation::OperationPoller;
use crate::provider::{
    AccessConfig, AttachedDisk, ComputeApi, InitializeParams, InsertInstanceRequest,
    InstanceResource, Metadata, MetadataItem, NetworkInterface, ServiceAccount, Tags,
};

/// OAuth scopes granted to provisioned instances: cloud storage read-write
/// and logging write.
const SERVICE_ACCOUNT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/devstorage.read_write",
    "https://www.googleapis.com/auth/logging.write",
];

/// A provisioned compute instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub address: String,
}

/// Creates, locates, and terminates compute instances.
///
/// Composes the compute provider capability with the shared operation
/// poller. The instance name counter is owned by the manager, initialized
/// to zero at construction, and incremented once per creation; it is never
/// reset during a run.
pub struct InstanceManager {
    compute: Arc<dyn ComputeApi>,
    poller: OperationPoller,
    config: Arc<Config>,
    sequence: AtomicU64,
}

impl InstanceManager {
    pub fn new(compute: Arc<dyn ComputeApi>, poller: OperationPoller, config: Arc<Config>) -> Self {
        Self {
            compute,
            poller,
            config,
            sequence: AtomicU64::new(0),
        }
    }

    /// Next locally-generated instance name, `jmeter-<n>` with a strictly
    /// increasing suffix starting from 0.
    fn next_name(&self) -> String {
        format!("jmeter-{}", self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Provision a new test-runner instance.
    ///
    /// Submits the creation request, awaits the zone-scoped operation, then
    /// fetches the resulting resource and extracts its external address.
    /// Under [`CreateFailurePolicy::BestEffort`] a failed creation operation
    /// is logged and execution proceeds to the lookup anyway; under
    /// [`CreateFailurePolicy::Strict`] it propagates.
    pub async fn create_instance(&self) -> Result<Instance, ProvisionError> {
        let name = self.next_name();
        info!(instance = %name, "Creating instance");

        let public_key_path = &self.config.instance.public_key_path;
        let public_key = tokio::fs::read_to_string(public_key_path)
            .await
            .context(PublicKeyReadSnafu {
                path: public_key_path.clone(),
            })?;

        let request = self.build_insert_request(&name, public_key.trim_end());

        if let Err(err) = self.submit_and_await(&name, &request).await {
            match self.config.create_failure_policy {
                CreateFailurePolicy::Strict => return Err(err),
                CreateFailurePolicy::BestEffort => {
                    error!(instance = %name, error = %err, "Creation operation failed, looking up instance anyway");
                }
            }
        }

        let resource = self.compute.get(&name).await.context(LookupSnafu {
            name: name.clone(),
        })?;
        let instance = instance_from_resource(&resource)?;

        emit!(InstanceProvisioned);
        Ok(instance)
    }

    async fn submit_and_await(
        &self,
        name: &str,
        request: &InsertInstanceRequest,
    ) -> Result<(), ProvisionError> {
        let handle = self.compute.insert(request).await.context(InsertSnafu {
            name: name.to_string(),
        })?;
        self.poller
            .await_operation(handle)
            .await
            .context(CreateOperationSnafu {
                name: name.to_string(),
            })?;
        Ok(())
    }

    /// Build the provider creation request for a named instance.
    fn build_insert_request(&self, name: &str, public_key: &str) -> InsertInstanceRequest {
        let project = &self.config.project.project;
        let zone = &self.config.project.zone;

        InsertInstanceRequest {
            name: name.to_string(),
            machine_type: format!(
                "zones/{zone}/machineTypes/{}",
                self.config.instance.machine_type
            ),
            tags: Tags {
                items: vec!["jmeter".to_string(), "http-server".to_string()],
            },
            disks: vec![AttachedDisk {
                boot: true,
                auto_delete: true,
                initialize_params: InitializeParams {
                    source_image: format!(
                        "projects/{project}/global/images/{}",
                        self.config.instance.image
                    ),
                },
            }],
            // NAT network interface so the instance is reachable from outside.
            network_interfaces: vec![NetworkInterface {
                network: "global/networks/default".to_string(),
                access_configs: vec![AccessConfig {
                    kind: "ONE_TO_ONE_NAT".to_string(),
                    name: "External NAT".to_string(),
                    nat_ip: None,
                }],
            }],
            service_accounts: vec![ServiceAccount {
                email: "default".to_string(),
                scopes: SERVICE_ACCOUNT_SCOPES.iter().map(|s| s.to_string()).collect(),
            }],
            metadata: Metadata {
                items: vec![
                    MetadataItem {
                        key: "sshKeys".to_string(),
                        value: public_key.to_string(),
                    },
                    // Every project has a default storage bucket named after
                    // the project.
                    MetadataItem {
                        key: "bucket".to_string(),
                        value: project.clone(),
                    },
                ],
            },
        }
    }

    /// Tear down the given instances, awaiting each deletion operation.
    pub async fn terminate_instances(&self, names: &[String]) -> Result<(), ProvisionError> {
        for name in names {
            info!(instance = %name, "Terminating instance");
            let handle = self.compute.delete(name).await.context(DeleteSnafu {
                name: name.clone(),
            })?;
            self.poller
                .await_operation(handle)
                .await
                .context(DeleteOperationSnafu {
                    name: name.clone(),
                })?;
            emit!(InstanceTerminated);
        }
        Ok(())
    }

    /// Resolve the current frontend roster to instances.
    ///
    /// In fixed-roster mode the given names are looked up directly, in
    /// input order. In autoscaled mode the names are ignored and the roster
    /// is discovered by listing instances whose name matches the configured
    /// prefix.
    pub async fn instances_by_roster(
        &self,
        names: &[String],
    ) -> Result<Vec<Instance>, ProvisionError> {
        let names: Vec<String> = if self.config.roster.autoscaled {
            let filter = format!("name eq {}.*", self.config.roster.name_prefix());
            self.compute
                .list(&filter)
                .await
                .context(ListSnafu)?
                .into_iter()
                .map(|resource| resource.name)
                .collect()
        } else {
            names.to_vec()
        };

        let mut instances = Vec::with_capacity(names.len());
        for name in names {
            let resource = self.compute.get(&name).await.context(LookupSnafu {
                name: name.clone(),
            })?;
            instances.push(instance_from_resource(&resource)?);
        }
        Ok(instances)
    }
}

/// Convert a provider resource into the internal instance model.
fn instance_from_resource(resource: &InstanceResource) -> Result<Instance, ProvisionError> {
    let address = resource
        .external_address()
        .context(MissingAddressSnafu {
            name: resource.name.clone(),
        })?;
    Ok(Instance {
        id: resource.name.clone(),
        address: address.to_string(),
    })
}
