//! Azure adapter implementation

use crate::native::AzureAppGateway;
use apgate_cloud::adapter::{matches_submitted, require, validate_common};
use apgate_cloud::{
    AccessPoint, AccessPointCore, CascadeGraph, CloudAccountRef, CloudError, CoreDetails,
    FieldId, FieldSpec, GenericApConfig, NativeCoreResource, ProviderAdapter, ProviderKind,
    ProviderPayload, Result,
};

const DEFAULT_SKU: &str = "Standard_v2";

/// Azure application gateway adapter
#[derive(Debug, Default, Clone)]
pub struct AzureAdapter;

impl AzureAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for AzureAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn display_name(&self) -> &str {
        "Microsoft Azure"
    }

    fn cascade_graph(&self) -> Result<CascadeGraph> {
        CascadeGraph::new(vec![
            FieldSpec::root(FieldId::Region),
            FieldSpec::new(FieldId::ResourceGroup, [FieldId::Region]),
            FieldSpec::new(FieldId::Vpc, [FieldId::ResourceGroup]),
            FieldSpec::new(FieldId::Certificate, [FieldId::ResourceGroup]),
            FieldSpec::new(FieldId::Subnet, [FieldId::Vpc]),
            FieldSpec::new(FieldId::PublicIp, [FieldId::Vpc]),
        ])
    }

    fn to_generic_access_point(&self, native: &NativeCoreResource) -> Result<AccessPointCore> {
        let gateway: AzureAppGateway = native.parse()?;

        let mut metadata = serde_json::Map::new();
        if let Some(rg) = &gateway.resource_group {
            metadata.insert("resource_group".to_string(), serde_json::json!(rg));
        }
        if let Some(subnet) = &gateway.subnet_id {
            metadata.insert("subnet_id".to_string(), serde_json::json!(subnet));
        }
        if let Some(ip) = &gateway.frontend_ip {
            metadata.insert("fe_ip_id".to_string(), serde_json::json!(ip));
        }
        if let Some(sku) = &gateway.sku {
            metadata.insert("sku".to_string(), serde_json::json!(sku));
        }

        Ok(AccessPointCore::Provisioned(CoreDetails {
            core_id: gateway.id,
            name: gateway.name,
            region: gateway.region,
            vpc: gateway.vpc,
            security_rules: Vec::new(),
            metadata,
        }))
    }

    fn validate(&self, config: &GenericApConfig) -> Result<()> {
        validate_common(config)?;
        require(config.resource_group.as_deref(), "resource group")?;
        require(config.vpc.as_deref(), "virtual network")?;
        if config.subnets.is_empty() {
            return Err(CloudError::Validation("subnet is required".to_string()));
        }
        require(config.public_ip.as_deref(), "frontend public IP")?;
        Ok(())
    }

    fn to_create_payload(&self, config: &GenericApConfig) -> Result<ProviderPayload> {
        self.validate(config)?;

        let mut access_point = config.base_access_point(ProviderKind::Azure);
        let metadata = &mut access_point.metadata;
        metadata.app_gateway_id = config.core_id.clone();
        metadata.resource_group = config.resource_group.clone();
        metadata.certificate_id = config.certificate_id.clone();
        metadata.subnets = config.subnets.clone();
        metadata.extra.insert(
            "fe_ip_id".to_string(),
            serde_json::json!(config.public_ip.clone()),
        );
        metadata.extra.insert(
            "sku".to_string(),
            serde_json::json!(config.sku.as_deref().unwrap_or(DEFAULT_SKU)),
        );

        tracing::debug!("Built Azure access point payload for {}", config.name);
        Ok(ProviderPayload {
            provider: ProviderKind::Azure,
            access_point,
        })
    }

    fn linked_core_id<'a>(&self, access_point: &'a AccessPoint) -> Option<&'a str> {
        access_point.metadata.app_gateway_id.as_deref()
    }

    fn matches_core(&self, access_point: &AccessPoint, core: &AccessPointCore) -> bool {
        if matches_submitted(access_point, core) {
            return true;
        }
        let gateway_id = match core {
            AccessPointCore::Provisioned(details) => &details.core_id,
            AccessPointCore::Unknown { core_id } => core_id,
            AccessPointCore::Submitted { .. } => return false,
        };
        access_point.metadata.app_gateway_id.as_deref() == Some(gateway_id.as_str())
    }

    fn seed_config(&self, account: &CloudAccountRef, core: &AccessPointCore) -> GenericApConfig {
        let mut config = GenericApConfig::new(account.id(), core.name(), "");
        if let AccessPointCore::Provisioned(details) = core {
            let text = |key: &str| {
                details
                    .metadata
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            config.core_id = Some(details.core_id.clone());
            config.region = details.region.clone().unwrap_or_default();
            config.vpc = details.vpc.clone();
            config.resource_group = text("resource_group");
            config.subnets = text("subnet_id").into_iter().collect();
            config.public_ip = text("fe_ip_id");
            config.sku = text("sku");
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apgate_cloud::AccessPointStatus;
    use serde_json::json;

    const GATEWAY_ID: &str = "/subscriptions/s/resourceGroups/rg-1/providers/Microsoft.Network/applicationGateways/edge";

    fn native() -> NativeCoreResource {
        NativeCoreResource(json!({
            "id": GATEWAY_ID,
            "name": "edge",
            "location": "eastus",
            "resource_group": "rg-1",
            "vnet": "vnet-1",
            "subnet_id": "subnet-1",
            "frontend_ip": "pip-1"
        }))
    }

    #[test]
    fn test_graph_shape() {
        let graph = AzureAdapter::new().cascade_graph().unwrap();
        assert_eq!(graph.roots(), vec![FieldId::Region]);
        assert_eq!(
            graph.dependents(FieldId::ResourceGroup),
            vec![FieldId::Vpc, FieldId::Certificate]
        );
        assert_eq!(
            graph.ancestors(FieldId::Subnet),
            vec![FieldId::Region, FieldId::ResourceGroup, FieldId::Vpc]
        );
    }

    #[test]
    fn test_seed_from_gateway_builds_valid_payload() {
        let adapter = AzureAdapter::new();
        let core = adapter.to_generic_access_point(&native()).unwrap();
        let account = CloudAccountRef::new("ca-az", ProviderKind::Azure);

        let config = adapter.seed_config(&account, &core);
        assert_eq!(config.region, "eastus");
        assert_eq!(config.resource_group.as_deref(), Some("rg-1"));

        let payload = adapter.to_create_payload(&config).unwrap();
        let metadata = &payload.access_point.metadata;
        assert_eq!(metadata.app_gateway_id.as_deref(), Some(GATEWAY_ID));
        assert_eq!(metadata.get_extra::<String>("sku").as_deref(), Some(DEFAULT_SKU));
        assert_eq!(metadata.get_extra::<String>("fe_ip_id").as_deref(), Some("pip-1"));
    }

    #[test]
    fn test_missing_public_ip_is_rejected() {
        let mut config = GenericApConfig::new("ca-az", "edge", "eastus");
        config.resource_group = Some("rg-1".into());
        config.vpc = Some("vnet-1".into());
        config.subnets = vec!["subnet-1".into()];

        let err = AzureAdapter::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("frontend public IP"));
    }

    #[test]
    fn test_matches_on_app_gateway_id() {
        let adapter = AzureAdapter::new();
        let core = adapter.to_generic_access_point(&native()).unwrap();

        let mut ap = GenericApConfig::new("ca-az", "edge", "eastus")
            .base_access_point(ProviderKind::Azure);
        ap.id = Some("ap-1".into());
        ap.status = AccessPointStatus::Created;
        assert!(!adapter.matches_core(&ap, &core));

        ap.metadata.app_gateway_id = Some(GATEWAY_ID.into());
        assert!(adapter.matches_core(&ap, &core));

        // albArn is meaningless on Azure
        ap.metadata.app_gateway_id = None;
        ap.metadata.alb_arn = Some(GATEWAY_ID.into());
        assert!(!adapter.matches_core(&ap, &core));
    }
}
