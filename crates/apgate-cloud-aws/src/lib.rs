//! AWS adapter for apgate
//!
//! Maps application load balancers onto access points. An access point wraps
//! a load balancer when its `metadata.albArn` equals the balancer's ARN.
//!
//! # Example
//!
//! ```ignore
//! use apgate_cloud::ProviderAdapter;
//! use apgate_cloud_aws::AwsAdapter;
//!
//! let adapter = AwsAdapter::new();
//! let graph = adapter.cascade_graph()?;
//! let payload = adapter.to_create_payload(&config)?;
//! ```

pub mod native;
pub mod provider;

pub use native::AwsLoadBalancer;
pub use provider::AwsAdapter;
