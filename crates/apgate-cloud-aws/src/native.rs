//! Native AWS load balancer records

use serde::{Deserialize, Serialize};

/// Load balancer as returned by the ELBv2 describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsLoadBalancer {
    #[serde(alias = "LoadBalancerArn")]
    pub arn: String,
    #[serde(alias = "LoadBalancerName")]
    pub name: String,
    #[serde(default, alias = "VpcId")]
    pub vpc_id: Option<String>,
    #[serde(default, alias = "SecurityGroups")]
    pub security_groups: Vec<String>,
    #[serde(default, alias = "DNSName")]
    pub dns_name: Option<String>,
    #[serde(default, alias = "Type", rename = "type")]
    pub lb_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl AwsLoadBalancer {
    /// Only application load balancers can front an access point
    pub fn is_application(&self) -> bool {
        self.lb_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("application"))
            .unwrap_or(true)
    }
}
