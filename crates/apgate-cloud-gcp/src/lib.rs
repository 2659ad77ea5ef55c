//! GCP adapter for apgate
//!
//! Maps GCP load balancers onto access points. Matching uses
//! `metadata.app_gateway_id`, like Azure.

pub mod native;
pub mod provider;

pub use native::GcpLoadBalancer;
pub use provider::GcpAdapter;
