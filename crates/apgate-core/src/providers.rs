//! Provider adapter selection

use apgate_cloud::{ProviderAdapter, ProviderKind};
use apgate_cloud_aws::AwsAdapter;
use apgate_cloud_azure::AzureAdapter;
use apgate_cloud_gcp::GcpAdapter;
use std::sync::Arc;

/// Adapter for `kind`, chosen once per workflow
pub fn adapter_for(kind: ProviderKind) -> Arc<dyn ProviderAdapter> {
    match kind {
        ProviderKind::Aws => Arc::new(AwsAdapter::new()),
        ProviderKind::Azure => Arc::new(AzureAdapter::new()),
        ProviderKind::Gcp => Arc::new(GcpAdapter::new()),
    }
}
