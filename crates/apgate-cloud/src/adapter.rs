//! Provider adapter abstraction
//!
//! Every cloud provider (AWS, Azure, GCP) implements [`ProviderAdapter`] to map
//! the generic access point onto its own field set, payload shape and
//! "does this access point wrap this core resource" rule.

use crate::error::{CloudError, Result};
use crate::graph::CascadeGraph;
use crate::model::{
    AccessPoint, AccessPointCore, AccessPointStatus, CloudAccountRef, FieldId, NativeCoreResource,
    ParentSelections, ProviderKind,
};
use serde::{Deserialize, Serialize};

/// Provider adapter trait
pub trait ProviderAdapter: Send + Sync {
    /// Provider tag handled by this adapter
    fn kind(&self) -> ProviderKind;

    /// Provider display name for UI
    fn display_name(&self) -> &str;

    /// Cascade fields used by this provider's access point form
    fn cascade_graph(&self) -> Result<CascadeGraph>;

    /// Map a provider-native load balancer record to a generic core
    fn to_generic_access_point(&self, native: &NativeCoreResource) -> Result<AccessPointCore>;

    /// Check provider-required fields before submission
    fn validate(&self, config: &GenericApConfig) -> Result<()>;

    /// Build the creation payload
    fn to_create_payload(&self, config: &GenericApConfig) -> Result<ProviderPayload>;

    /// Whether `access_point` wraps `core`
    fn matches_core(&self, access_point: &AccessPoint, core: &AccessPointCore) -> bool;

    /// Provider identifier of the primitive an access point wraps, if assigned
    fn linked_core_id<'a>(&self, access_point: &'a AccessPoint) -> Option<&'a str>;

    /// Build the payload editing an existing access point
    fn to_edit_payload(&self, id: &str, config: &GenericApConfig) -> Result<ProviderPayload> {
        let mut payload = self.to_create_payload(config)?;
        payload.access_point.id = Some(id.to_string());
        Ok(payload)
    }

    /// Config seeded from a core the user picked for import
    fn seed_config(&self, account: &CloudAccountRef, core: &AccessPointCore) -> GenericApConfig {
        let mut config = GenericApConfig::new(account.id(), core.name(), "");
        if let AccessPointCore::Provisioned(details) = core {
            config.core_id = Some(details.core_id.clone());
            config.region = details.region.clone().unwrap_or_default();
            config.vpc = details.vpc.clone();
            config.security_groups = details.security_rules.clone();
        }
        config
    }
}

/// Provider-agnostic access point configuration collected by the workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericApConfig {
    pub name: String,
    pub cloud_account_id: String,
    pub region: String,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub vpc: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
    /// Existing provider primitive to import instead of creating one
    #[serde(default)]
    pub core_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub machine_type: Option<String>,
}

impl GenericApConfig {
    pub fn new(
        cloud_account_id: impl Into<String>,
        name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cloud_account_id: cloud_account_id.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Copy resolved cascade values into the matching config fields
    pub fn apply_selections(&mut self, selections: &ParentSelections) {
        for (field, value) in selections {
            let value = value.clone();
            match field {
                FieldId::Region => self.region = value,
                FieldId::ResourceGroup => self.resource_group = Some(value),
                FieldId::Vpc => self.vpc = Some(value),
                FieldId::Subnet => self.subnets = vec![value],
                FieldId::SecurityGroup => self.security_groups = vec![value],
                FieldId::Certificate => self.certificate_id = Some(value),
                FieldId::PublicIp => self.public_ip = Some(value),
                FieldId::HostedZone => self.hosted_zone_id = Some(value),
                FieldId::Zone => self.zone = Some(value),
            }
        }
    }

    /// Access point record shared by every provider payload
    pub fn base_access_point(&self, kind: ProviderKind) -> AccessPoint {
        AccessPoint {
            id: None,
            name: self.name.clone(),
            cloud_account_id: self.cloud_account_id.clone(),
            kind: Some(kind),
            status: AccessPointStatus::Submitted,
            region: self.region.clone(),
            vpc: self.vpc.clone().unwrap_or_default(),
            host_name: self.host_name.clone().unwrap_or_default(),
            metadata: Default::default(),
            created_at: None,
        }
    }
}

/// Provider-specific create/edit payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayload {
    pub provider: ProviderKind,
    pub access_point: AccessPoint,
}

impl ProviderPayload {
    /// Id of the access point being edited
    pub fn edit_target(&self) -> Option<&str> {
        self.access_point.id.as_deref()
    }
}

/// Fail with a validation error when a required text value is missing
pub fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CloudError::Validation(format!("{} is required", what))),
    }
}

/// Shared checks every provider applies
pub fn validate_common(config: &GenericApConfig) -> Result<()> {
    require(Some(config.name.as_str()), "name")?;
    require(Some(config.cloud_account_id.as_str()), "cloud account")?;
    require(Some(config.region.as_str()), "region")?;
    Ok(())
}

/// Match rule for cores synthesised from `submitted` access points
pub fn matches_submitted(access_point: &AccessPoint, core: &AccessPointCore) -> bool {
    match core {
        AccessPointCore::Submitted {
            access_point_id, ..
        } => access_point.has_id(access_point_id),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_selections() {
        let mut config = GenericApConfig::new("ca-1", "edge", "");
        let selections: ParentSelections = [
            (FieldId::Region, "eastus".to_string()),
            (FieldId::ResourceGroup, "rg-1".to_string()),
            (FieldId::Subnet, "subnet-a".to_string()),
        ]
        .into_iter()
        .collect();

        config.apply_selections(&selections);
        assert_eq!(config.region, "eastus");
        assert_eq!(config.resource_group.as_deref(), Some("rg-1"));
        assert_eq!(config.subnets, vec!["subnet-a".to_string()]);
    }

    #[test]
    fn test_validate_common() {
        assert!(validate_common(&GenericApConfig::new("ca-1", "edge", "us-east-1")).is_ok());
        let err = validate_common(&GenericApConfig::new("ca-1", "  ", "us-east-1")).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }
}
