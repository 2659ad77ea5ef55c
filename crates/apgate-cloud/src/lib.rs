//! apgate cloud layer
//!
//! This crate holds the access point data model, the ports the provisioning
//! workflow consumes, and the provider adapter abstraction implemented by
//! the per-provider crates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  apgate-core                     │
//! │   cascade · reconciler · poller · aggregate      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 apgate-cloud                     │
//! │  ┌──────────────────┐  ┌─────────────────────┐  │
//! │  │ trait            │  │ ResourceFetchPort   │  │
//! │  │ ProviderAdapter  │  │ AccessPointApi      │  │
//! │  └──────────────────┘  └─────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │PlatformClient│  │ FixtureCloud         │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────┬───────────────┬────────────────┬────────┘
//!         │               │                │
//! ┌───────▼──────┐ ┌──────▼───────┐ ┌──────▼───────┐
//! │     aws      │ │    azure     │ │     gcp      │
//! │   adapter    │ │   adapter    │ │   adapter    │
//! └──────────────┘ └──────────────┘ └──────────────┘
//! ```

pub mod adapter;
pub mod error;
pub mod fixture;
pub mod graph;
pub mod http;
pub mod model;
pub mod port;

// Re-exports
pub use adapter::{GenericApConfig, ProviderAdapter, ProviderPayload};
pub use error::{CloudError, Result};
pub use fixture::{CloudSnapshot, FixtureBehaviour, FixtureCloud, ProvisionOutcome};
pub use graph::{CascadeGraph, FieldSpec};
pub use http::{PlatformClient, PlatformConfig};
pub use model::{
    AccessPoint, AccessPointCore, AccessPointMetadata, AccessPointStatus, AgentHeartbeat,
    CloudAccountRef, CoreDetails, DnsConfig, FieldId, NativeCoreResource, ParentSelections,
    ProviderKind, Route53Dns, SelectableOption, SubmitResponse,
};
pub use port::{AccessPointApi, ResourceFetchPort};
