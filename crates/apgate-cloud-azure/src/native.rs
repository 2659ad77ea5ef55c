//! Native Azure application gateway records

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureAppGateway {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "location")]
    pub region: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default, alias = "vnet")]
    pub vpc: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub frontend_ip: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}
