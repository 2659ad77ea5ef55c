//! Data model shared by ports, adapters and the workflow

use crate::error::CloudError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Cloud provider tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Azure,
    Gcp,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "aws",
            ProviderKind::Azure => "azure",
            ProviderKind::Gcp => "gcp",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(ProviderKind::Aws),
            "azure" => Ok(ProviderKind::Azure),
            "gcp" => Ok(ProviderKind::Gcp),
            other => Err(CloudError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Cloud account the workflow operates on. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudAccountRef {
    id: String,
    provider: ProviderKind,
}

impl CloudAccountRef {
    pub fn new(id: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }
}

/// Selectable cascade field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    Region,
    ResourceGroup,
    Vpc,
    Subnet,
    SecurityGroup,
    Certificate,
    PublicIp,
    HostedZone,
    Zone,
}

impl FieldId {
    pub const ALL: [FieldId; 9] = [
        FieldId::Region,
        FieldId::ResourceGroup,
        FieldId::Vpc,
        FieldId::Subnet,
        FieldId::SecurityGroup,
        FieldId::Certificate,
        FieldId::PublicIp,
        FieldId::HostedZone,
        FieldId::Zone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Region => "region",
            FieldId::ResourceGroup => "resource_group",
            FieldId::Vpc => "vpc",
            FieldId::Subnet => "subnet",
            FieldId::SecurityGroup => "security_group",
            FieldId::Certificate => "certificate",
            FieldId::PublicIp => "public_ip",
            FieldId::HostedZone => "hosted_zone",
            FieldId::Zone => "zone",
        }
    }

    /// Collection name used in REST paths
    pub fn collection(&self) -> &'static str {
        match self {
            FieldId::Region => "regions",
            FieldId::ResourceGroup => "resource_groups",
            FieldId::Vpc => "vpcs",
            FieldId::Subnet => "subnets",
            FieldId::SecurityGroup => "security_groups",
            FieldId::Certificate => "certificates",
            FieldId::PublicIp => "public_ips",
            FieldId::HostedZone => "hosted_zones",
            FieldId::Zone => "zones",
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        FieldId::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| CloudError::Validation(format!("unknown field '{}'", s)))
    }
}

/// Values of upstream fields passed along with a fetch
pub type ParentSelections = BTreeMap<FieldId, String>;

/// One entry of a field's option list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectableOption {
    #[serde(alias = "name")]
    pub label: String,
    #[serde(alias = "id")]
    pub value: String,
}

impl SelectableOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Option whose label equals its value
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Lifecycle status of a platform access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPointStatus {
    Submitted,
    Created,
    Errored,
}

impl std::fmt::Display for AccessPointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessPointStatus::Submitted => write!(f, "submitted"),
            AccessPointStatus::Created => write!(f, "created"),
            AccessPointStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Route53 hosted zone reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route53Dns {
    pub hosted_zone_id: String,
}

/// DNS configuration of an access point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route53: Option<Route53Dns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub others: Option<String>,
}

/// Provider-specific bag carried by an access point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessPointMetadata {
    #[serde(rename = "albArn", default, skip_serializing_if = "Option::is_none")]
    pub alb_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_gateway_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AccessPointMetadata {
    pub fn get_extra<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Platform-persisted wrapper around a provider load-balancing primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub cloud_account_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    pub status: AccessPointStatus,
    pub region: String,
    #[serde(default)]
    pub vpc: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub metadata: AccessPointMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AccessPoint {
    pub fn is_errored(&self) -> bool {
        self.status == AccessPointStatus::Errored
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// Details of a provisioned core resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreDetails {
    pub core_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Provider-native load-balancing primitive, as seen by the reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccessPointCore {
    /// Listed by the provider with a real identifier
    Provisioned(CoreDetails),
    /// Backing an access point still in `submitted` state
    Submitted {
        access_point_id: String,
        name: String,
        vpc: String,
    },
    /// Referenced by an access point but not listed by the provider
    Unknown { core_id: String },
}

impl AccessPointCore {
    /// Value carried by the selection option for this core
    pub fn selection_value(&self) -> &str {
        match self {
            AccessPointCore::Provisioned(details) => &details.core_id,
            AccessPointCore::Submitted {
                access_point_id, ..
            } => access_point_id,
            AccessPointCore::Unknown { core_id } => core_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AccessPointCore::Provisioned(details) => &details.name,
            AccessPointCore::Submitted { name, .. } => name,
            AccessPointCore::Unknown { core_id } => core_id,
        }
    }

    pub fn vpc(&self) -> Option<&str> {
        match self {
            AccessPointCore::Provisioned(details) => details.vpc.as_deref(),
            AccessPointCore::Submitted { vpc, .. } => Some(vpc),
            AccessPointCore::Unknown { .. } => None,
        }
    }

    pub fn to_option(&self) -> SelectableOption {
        SelectableOption::new(self.name(), self.selection_value())
    }
}

/// Raw provider record returned by the core-resource listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeCoreResource(pub serde_json::Value);

impl NativeCoreResource {
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(self.0.clone())
            .map_err(|e| CloudError::InvalidNative(e.to_string()))
    }
}

/// Result of a create or edit submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AccessPoint>,
}

/// Agent heartbeat as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHeartbeat {
    pub number_of_connected_units: u32,
}
