//! Native GCP load balancer records

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpLoadBalancer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default, alias = "network")]
    pub vpc: Option<String>,
    #[serde(default, alias = "subnetwork")]
    pub subnet: Option<String>,
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub firewall_rules: Vec<String>,
}
