//! Ports consumed by the provisioning workflow
//!
//! Both traits are implemented by the platform HTTP client and by the
//! in-memory fixture cloud.

use crate::adapter::ProviderPayload;
use crate::error::Result;
use crate::model::{
    AccessPoint, AgentHeartbeat, CloudAccountRef, FieldId, NativeCoreResource, ParentSelections,
    SelectableOption, SubmitResponse,
};
use async_trait::async_trait;

/// Lists the options of a cascade field for a cloud account
#[async_trait]
pub trait ResourceFetchPort: Send + Sync {
    /// `parents` holds the value of every upstream field of `field`
    async fn list_options(
        &self,
        account: &CloudAccountRef,
        field: FieldId,
        parents: &ParentSelections,
    ) -> Result<Vec<SelectableOption>>;
}

/// Platform operations on access points, core resources and agents
#[async_trait]
pub trait AccessPointApi: Send + Sync {
    async fn list_access_points(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
        vpc: Option<&str>,
    ) -> Result<Vec<AccessPoint>>;

    async fn create_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse>;

    async fn edit_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse>;

    async fn get_access_point(&self, id: &str) -> Result<AccessPoint>;

    async fn list_supported_cores(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
    ) -> Result<Vec<NativeCoreResource>>;

    async fn get_agent_heartbeat(
        &self,
        account: &CloudAccountRef,
        rule_name: &str,
    ) -> Result<AgentHeartbeat>;
}
