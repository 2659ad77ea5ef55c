//! apgate provisioning workflow
//!
//! Orchestrates access point provisioning on top of the `apgate-cloud`
//! ports:
//!
//! - [`cascade`]: dependent-resource cascade resolution per provider graph
//! - [`reconciler`]: reuse, create or reject a selected core resource
//! - [`poller`]: bounded polling of access point and agent status
//! - [`aggregate`]: the gateway configuration being assembled
//! - [`workflow`]: the facade binding them to one cloud account

pub mod aggregate;
pub mod cascade;
pub mod debounce;
pub mod poller;
pub mod providers;
pub mod reconciler;
pub mod workflow;

pub use aggregate::{
    AccessDetails, ConfigUpdate, GatewayConfiguration, GatewayConfigurationAggregate,
    GatewayMetadata, HealthCheck, PortConfig, RoutingConfig,
};
pub use cascade::{CascadeEvent, CascadeResolver, FetchRequest, FieldStatus, ResourceSelection};
pub use debounce::Debouncer;
pub use poller::{
    AccessPointProbe, HeartbeatProbe, PollConfig, PollOutcome, PollSession, PollState,
    ProbeStatus, ProvisioningPoller, StatusProbe,
};
pub use providers::adapter_for;
pub use reconciler::{AccessPointReconciler, CoreOption, Reconciliation};
pub use workflow::{GatewayWorkflow, ProvisioningReport};
