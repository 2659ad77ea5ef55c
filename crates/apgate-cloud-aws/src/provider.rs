//! AWS adapter implementation

use crate::native::AwsLoadBalancer;
use apgate_cloud::adapter::{matches_submitted, require, validate_common};
use apgate_cloud::{
    AccessPoint, AccessPointCore, CascadeGraph, CloudError, CoreDetails, DnsConfig, FieldId,
    FieldSpec, GenericApConfig, NativeCoreResource, ProviderAdapter, ProviderKind,
    ProviderPayload, Result, Route53Dns,
};

/// AWS application load balancer adapter
#[derive(Debug, Default, Clone)]
pub struct AwsAdapter;

impl AwsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for AwsAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    fn cascade_graph(&self) -> Result<CascadeGraph> {
        CascadeGraph::new(vec![
            FieldSpec::root(FieldId::Region),
            FieldSpec::new(FieldId::Vpc, [FieldId::Region]),
            FieldSpec::new(FieldId::Certificate, [FieldId::Region]),
            FieldSpec::new(FieldId::Subnet, [FieldId::Vpc]),
            FieldSpec::new(FieldId::SecurityGroup, [FieldId::Vpc]),
            FieldSpec::new(FieldId::PublicIp, [FieldId::Vpc]),
            // Route53 zones are account-global
            FieldSpec::root(FieldId::HostedZone),
        ])
    }

    fn to_generic_access_point(&self, native: &NativeCoreResource) -> Result<AccessPointCore> {
        let lb: AwsLoadBalancer = native.parse()?;
        if !lb.is_application() {
            return Err(CloudError::InvalidNative(format!(
                "load balancer {} is not an application load balancer",
                lb.name
            )));
        }

        let mut metadata = serde_json::Map::new();
        if let Some(dns_name) = &lb.dns_name {
            metadata.insert("dns_name".to_string(), serde_json::json!(dns_name));
        }

        Ok(AccessPointCore::Provisioned(CoreDetails {
            core_id: lb.arn,
            name: lb.name,
            region: lb.region,
            vpc: lb.vpc_id,
            security_rules: lb.security_groups,
            metadata,
        }))
    }

    fn validate(&self, config: &GenericApConfig) -> Result<()> {
        validate_common(config)?;
        require(config.vpc.as_deref(), "vpc")?;
        if config.security_groups.is_empty() && config.core_id.is_none() {
            return Err(CloudError::Validation(
                "at least one security group is required".to_string(),
            ));
        }
        Ok(())
    }

    fn to_create_payload(&self, config: &GenericApConfig) -> Result<ProviderPayload> {
        self.validate(config)?;

        let mut access_point = config.base_access_point(ProviderKind::Aws);
        let metadata = &mut access_point.metadata;
        metadata.alb_arn = config.core_id.clone();
        metadata.certificate_id = config.certificate_id.clone();
        metadata.security_groups = config.security_groups.clone();
        metadata.subnets = config.subnets.clone();
        metadata.dns = Some(match &config.hosted_zone_id {
            Some(zone) => DnsConfig {
                route53: Some(Route53Dns {
                    hosted_zone_id: zone.clone(),
                }),
                others: None,
            },
            None => DnsConfig {
                route53: None,
                others: config.host_name.clone(),
            },
        });
        if let Some(ip) = &config.public_ip {
            metadata
                .extra
                .insert("elastic_ip".to_string(), serde_json::json!(ip));
        }

        tracing::debug!("Built AWS access point payload for {}", config.name);
        Ok(ProviderPayload {
            provider: ProviderKind::Aws,
            access_point,
        })
    }

    fn linked_core_id<'a>(&self, access_point: &'a AccessPoint) -> Option<&'a str> {
        access_point.metadata.alb_arn.as_deref()
    }

    fn matches_core(&self, access_point: &AccessPoint, core: &AccessPointCore) -> bool {
        if matches_submitted(access_point, core) {
            return true;
        }
        let arn = match core {
            AccessPointCore::Provisioned(details) => &details.core_id,
            AccessPointCore::Unknown { core_id } => core_id,
            AccessPointCore::Submitted { .. } => return false,
        };
        access_point.metadata.alb_arn.as_deref() == Some(arn.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apgate_cloud::{AccessPointStatus, CloudAccountRef};
    use serde_json::json;

    const ARN: &str = "arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/edge/1";

    fn access_point(id: &str, alb_arn: Option<&str>) -> AccessPoint {
        let mut config = GenericApConfig::new("ca-1", "edge", "us-east-1");
        config.vpc = Some("vpc-1".into());
        let mut ap = config.base_access_point(ProviderKind::Aws);
        ap.id = Some(id.into());
        ap.status = AccessPointStatus::Created;
        ap.metadata.alb_arn = alb_arn.map(str::to_string);
        ap
    }

    #[test]
    fn test_graph_shape() {
        let graph = AwsAdapter::new().cascade_graph().unwrap();
        assert_eq!(graph.roots(), vec![FieldId::Region, FieldId::HostedZone]);
        assert_eq!(
            graph.dependents(FieldId::Region),
            vec![FieldId::Vpc, FieldId::Certificate]
        );
        assert_eq!(
            graph.dependents(FieldId::Vpc),
            vec![FieldId::Subnet, FieldId::SecurityGroup, FieldId::PublicIp]
        );
    }

    #[test]
    fn test_native_mapping() {
        let native = NativeCoreResource(json!({
            "LoadBalancerArn": ARN,
            "LoadBalancerName": "edge",
            "VpcId": "vpc-1",
            "SecurityGroups": ["sg-1"],
            "DNSName": "edge-1.elb.amazonaws.com",
            "Type": "application"
        }));
        let core = AwsAdapter::new().to_generic_access_point(&native).unwrap();
        match core {
            AccessPointCore::Provisioned(details) => {
                assert_eq!(details.core_id, ARN);
                assert_eq!(details.vpc.as_deref(), Some("vpc-1"));
                assert_eq!(details.security_rules, vec!["sg-1".to_string()]);
            }
            other => panic!("unexpected core {:?}", other),
        }

        let network_lb = NativeCoreResource(json!({
            "arn": "arn:nlb", "name": "tcp", "type": "network"
        }));
        assert!(matches!(
            AwsAdapter::new().to_generic_access_point(&network_lb),
            Err(CloudError::InvalidNative(_))
        ));
    }

    #[test]
    fn test_matches_on_alb_arn() {
        let adapter = AwsAdapter::new();
        let core = AccessPointCore::Provisioned(CoreDetails {
            core_id: ARN.into(),
            name: "edge".into(),
            ..Default::default()
        });

        assert!(adapter.matches_core(&access_point("ap-1", Some(ARN)), &core));
        assert!(!adapter.matches_core(&access_point("ap-2", Some("arn:other")), &core));
        assert!(!adapter.matches_core(&access_point("ap-3", None), &core));

        let submitted = AccessPointCore::Submitted {
            access_point_id: "ap-3".into(),
            name: "edge".into(),
            vpc: "vpc-1".into(),
        };
        assert!(adapter.matches_core(&access_point("ap-3", None), &submitted));
    }

    #[test]
    fn test_payload_requires_security_group() {
        let adapter = AwsAdapter::new();
        let mut config = GenericApConfig::new("ca-1", "edge", "us-east-1");
        config.vpc = Some("vpc-1".into());
        assert!(matches!(
            adapter.to_create_payload(&config),
            Err(CloudError::Validation(_))
        ));

        config.security_groups = vec!["sg-1".into()];
        config.hosted_zone_id = Some("Z123".into());
        let payload = adapter.to_create_payload(&config).unwrap();
        let body = serde_json::to_value(&payload.access_point).unwrap();
        assert_eq!(body["type"], "aws");
        assert_eq!(body["metadata"]["security_groups"], json!(["sg-1"]));
        assert_eq!(body["metadata"]["dns"]["route53"]["hosted_zone_id"], "Z123");
    }

    #[test]
    fn test_seed_and_edit_payload() {
        let adapter = AwsAdapter::new();
        let account = CloudAccountRef::new("ca-1", ProviderKind::Aws);
        let core = AccessPointCore::Provisioned(CoreDetails {
            core_id: ARN.into(),
            name: "edge".into(),
            region: Some("us-east-1".into()),
            vpc: Some("vpc-1".into()),
            ..Default::default()
        });

        let config = adapter.seed_config(&account, &core);
        let payload = adapter.to_edit_payload("ap-5", &config).unwrap();
        assert_eq!(payload.edit_target(), Some("ap-5"));
        assert_eq!(payload.access_point.metadata.alb_arn.as_deref(), Some(ARN));
        assert_eq!(payload.access_point.vpc, "vpc-1");
    }
}
