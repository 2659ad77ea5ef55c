//! Azure adapter for apgate
//!
//! Maps application gateways onto access points. Matching uses
//! `metadata.app_gateway_id`; access points still in `submitted` state match
//! on their own id.

pub mod native;
pub mod provider;

pub use native::AzureAppGateway;
pub use provider::AzureAdapter;
