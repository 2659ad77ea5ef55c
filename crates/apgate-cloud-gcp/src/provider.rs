//! GCP adapter implementation

use crate::native::GcpLoadBalancer;
use apgate_cloud::adapter::{matches_submitted, require, validate_common};
use apgate_cloud::{
    AccessPoint, AccessPointCore, CascadeGraph, CloudAccountRef, CloudError, CoreDetails,
    FieldId, FieldSpec, GenericApConfig, NativeCoreResource, ProviderAdapter, ProviderKind,
    ProviderPayload, Result,
};

const DEFAULT_MACHINE_TYPE: &str = "e2-micro";

/// GCP load balancer adapter
#[derive(Debug, Default, Clone)]
pub struct GcpAdapter;

impl GcpAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for GcpAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcp
    }

    fn display_name(&self) -> &str {
        "Google Cloud Platform"
    }

    fn cascade_graph(&self) -> Result<CascadeGraph> {
        CascadeGraph::new(vec![
            FieldSpec::root(FieldId::Region),
            FieldSpec::new(FieldId::Vpc, [FieldId::Region]),
            FieldSpec::new(FieldId::Zone, [FieldId::Region]),
            FieldSpec::new(FieldId::Subnet, [FieldId::Vpc]),
        ])
    }

    fn to_generic_access_point(&self, native: &NativeCoreResource) -> Result<AccessPointCore> {
        let lb: GcpLoadBalancer = native.parse()?;

        let mut metadata = serde_json::Map::new();
        for (key, value) in [
            ("zone", &lb.zone),
            ("subnet", &lb.subnet),
            ("machine_type", &lb.machine_type),
        ] {
            if let Some(value) = value {
                metadata.insert(key.to_string(), serde_json::json!(value));
            }
        }

        Ok(AccessPointCore::Provisioned(CoreDetails {
            core_id: lb.id,
            name: lb.name,
            region: lb.region,
            vpc: lb.vpc,
            security_rules: lb.firewall_rules,
            metadata,
        }))
    }

    fn validate(&self, config: &GenericApConfig) -> Result<()> {
        validate_common(config)?;
        require(config.vpc.as_deref(), "network")?;
        require(config.zone.as_deref(), "zone")?;
        if config.subnets.is_empty() {
            return Err(CloudError::Validation("subnetwork is required".to_string()));
        }
        Ok(())
    }

    fn to_create_payload(&self, config: &GenericApConfig) -> Result<ProviderPayload> {
        self.validate(config)?;

        let mut access_point = config.base_access_point(ProviderKind::Gcp);
        let metadata = &mut access_point.metadata;
        metadata.app_gateway_id = config.core_id.clone();
        metadata.certificate_id = config.certificate_id.clone();
        metadata.subnets = config.subnets.clone();
        metadata.security_groups = config.security_groups.clone();
        metadata
            .extra
            .insert("zone".to_string(), serde_json::json!(config.zone.clone()));
        metadata.extra.insert(
            "machine_type".to_string(),
            serde_json::json!(config.machine_type.as_deref().unwrap_or(DEFAULT_MACHINE_TYPE)),
        );

        tracing::debug!("Built GCP access point payload for {}", config.name);
        Ok(ProviderPayload {
            provider: ProviderKind::Gcp,
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
        let lb_id = match core {
            AccessPointCore::Provisioned(details) => &details.core_id,
            AccessPointCore::Unknown { core_id } => core_id,
            AccessPointCore::Submitted { .. } => return false,
        };
        access_point.metadata.app_gateway_id.as_deref() == Some(lb_id.as_str())
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
            config.zone = text("zone");
            config.subnets = text("subnet").into_iter().collect();
            config.machine_type = text("machine_type");
            config.security_groups = details.security_rules.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apgate_cloud::AccessPointStatus;
    use serde_json::json;

    #[test]
    fn test_graph_shape() {
        let graph = GcpAdapter::new().cascade_graph().unwrap();
        assert_eq!(
            graph.dependents(FieldId::Region),
            vec![FieldId::Vpc, FieldId::Zone]
        );
        assert!(!graph.contains(FieldId::ResourceGroup));
    }

    #[test]
    fn test_payload_defaults() {
        let mut config = GenericApConfig::new("ca-g", "edge", "us-central1");
        config.vpc = Some("default".into());
        config.zone = Some("us-central1-a".into());
        config.subnets = vec!["default".into()];

        let payload = GcpAdapter::new().to_create_payload(&config).unwrap();
        let metadata = &payload.access_point.metadata;
        assert_eq!(
            metadata.get_extra::<String>("machine_type").as_deref(),
            Some(DEFAULT_MACHINE_TYPE)
        );
        assert_eq!(
            metadata.get_extra::<String>("zone").as_deref(),
            Some("us-central1-a")
        );
        assert!(metadata.app_gateway_id.is_none());
    }

    #[test]
    fn test_missing_zone_is_rejected() {
        let mut config = GenericApConfig::new("ca-g", "edge", "us-central1");
        config.vpc = Some("default".into());
        config.subnets = vec!["default".into()];
        assert!(matches!(
            GcpAdapter::new().validate(&config),
            Err(CloudError::Validation(msg)) if msg.contains("zone")
        ));
    }

    #[test]
    fn test_submitted_access_point_matches_by_id() {
        let adapter = GcpAdapter::new();
        let mut ap = GenericApConfig::new("ca-g", "edge", "us-central1")
            .base_access_point(ProviderKind::Gcp);
        ap.id = Some("ap-2".into());
        ap.status = AccessPointStatus::Submitted;

        let core = AccessPointCore::Submitted {
            access_point_id: "ap-2".into(),
            name: "edge".into(),
            vpc: "default".into(),
        };
        assert!(adapter.matches_core(&ap, &core));

        let native = NativeCoreResource(json!({
            "id": "lb-1", "name": "edge", "network": "default", "zone": "us-central1-a"
        }));
        let provisioned = adapter.to_generic_access_point(&native).unwrap();
        assert!(!adapter.matches_core(&ap, &provisioned));
    }
}
