//! Gateway configuration aggregate
//!
//! The configuration submitted with a cost-optimisation rule. It is only
//! changed through [`GatewayConfigurationAggregate::apply`], which keeps the
//! selected access point consistent with the latest fetched list.

use apgate_cloud::{AccessPoint, CloudError, Result};
use serde::{Deserialize, Serialize};

/// Port mapping of the routing section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub protocol: String,
    pub port: u16,
    pub target_protocol: String,
    pub target_port: u16,
    #[serde(default)]
    pub redirect_https: bool,
}

impl PortConfig {
    pub fn http(port: u16, target_port: u16) -> Self {
        Self {
            protocol: "http".to_string(),
            port,
            target_protocol: "http".to_string(),
            target_port,
            redirect_https: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub protocol: String,
    pub path: String,
    pub port: u16,
    pub timeout_secs: u32,
    pub status_code_from: u16,
    pub status_code_to: u16,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            path: "/".to_string(),
            port: 80,
            timeout_secs: 30,
            status_code_from: 200,
            status_code_to: 299,
        }
    }
}

/// How users reach the stopped resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDetails {
    #[serde(default)]
    pub dns_link: bool,
    #[serde(default)]
    pub ssh: bool,
    #[serde(default)]
    pub rdp: bool,
    #[serde(default)]
    pub background_tasks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayMetadata {
    #[serde(default)]
    pub access_details: AccessDetails,
}

/// Accumulated gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfiguration {
    #[serde(rename = "accessPointID", default, skip_serializing_if = "Option::is_none")]
    pub access_point_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_point_data: Option<AccessPoint>,
    #[serde(default)]
    pub custom_domains: Vec<String>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub metadata: GatewayMetadata,
}

/// Mutation accepted by [`GatewayConfigurationAggregate::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    /// Replace the known access point list
    RefreshAccessPoints(Vec<AccessPoint>),
    SetAccessPoint(String),
    ClearAccessPoint,
    SetCustomDomains(Vec<String>),
    SetRouting(RoutingConfig),
    SetHealthCheck(Option<HealthCheck>),
    SetAccessDetails(AccessDetails),
}

/// Single owner of a [`GatewayConfiguration`]
#[derive(Debug, Clone, Default)]
pub struct GatewayConfigurationAggregate {
    config: GatewayConfiguration,
    known_access_points: Vec<AccessPoint>,
}

impl GatewayConfigurationAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &GatewayConfiguration {
        &self.config
    }

    pub fn known_access_points(&self) -> &[AccessPoint] {
        &self.known_access_points
    }

    pub fn apply(&mut self, update: ConfigUpdate) -> Result<()> {
        match update {
            ConfigUpdate::RefreshAccessPoints(access_points) => {
                self.known_access_points = access_points;
                self.revalidate_selection();
            }
            ConfigUpdate::SetAccessPoint(id) => {
                let access_point = self.usable_access_point(&id)?.clone();
                tracing::debug!("Access point set to {}", id);
                self.config.access_point_id = Some(id);
                self.config.access_point_data = Some(access_point);
            }
            ConfigUpdate::ClearAccessPoint => {
                self.config.access_point_id = None;
                self.config.access_point_data = None;
            }
            ConfigUpdate::SetCustomDomains(domains) => {
                self.config.custom_domains = normalize_domains(domains)?;
            }
            ConfigUpdate::SetRouting(routing) => {
                validate_routing(&routing)?;
                self.config.routing = routing;
            }
            ConfigUpdate::SetHealthCheck(health_check) => {
                if let Some(check) = &health_check {
                    validate_health_check(check)?;
                }
                self.config.health_check = health_check;
            }
            ConfigUpdate::SetAccessDetails(details) => {
                self.config.metadata.access_details = details;
            }
        }
        Ok(())
    }

    /// JSON body for the rule submission
    pub fn to_rule_payload(&self) -> Result<serde_json::Value> {
        if self.config.access_point_id.is_none() {
            return Err(CloudError::Validation(
                "an access point must be selected".to_string(),
            ));
        }
        Ok(serde_json::to_value(&self.config)?)
    }

    fn usable_access_point(&self, id: &str) -> Result<&AccessPoint> {
        if id.trim().is_empty() {
            return Err(CloudError::Validation(
                "access point id must not be empty".to_string(),
            ));
        }
        let access_point = self
            .known_access_points
            .iter()
            .find(|ap| ap.has_id(id))
            .ok_or_else(|| {
                CloudError::Validation(format!(
                    "access point {} is not in the latest access point list",
                    id
                ))
            })?;
        if access_point.is_errored() {
            return Err(CloudError::Validation(format!(
                "access point {} is errored",
                id
            )));
        }
        Ok(access_point)
    }

    fn revalidate_selection(&mut self) {
        let Some(id) = self.config.access_point_id.clone() else {
            return;
        };
        match self.usable_access_point(&id).cloned() {
            Ok(access_point) => {
                self.config.access_point_data = Some(access_point);
            }
            Err(e) => {
                tracing::warn!("Clearing selected access point: {}", e);
                self.config.access_point_id = None;
                self.config.access_point_data = None;
            }
        }
    }
}

fn normalize_domains(domains: Vec<String>) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::new();
    for domain in domains {
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            continue;
        }
        if domain.contains(char::is_whitespace) || domain.contains('/') {
            return Err(CloudError::Validation(format!(
                "'{}' is not a valid domain",
                domain
            )));
        }
        if !normalized.contains(&domain) {
            normalized.push(domain);
        }
    }
    Ok(normalized)
}

fn validate_routing(routing: &RoutingConfig) -> Result<()> {
    for port in &routing.ports {
        if port.port == 0 || port.target_port == 0 {
            return Err(CloudError::Validation(
                "ports must be between 1 and 65535".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_health_check(check: &HealthCheck) -> Result<()> {
    if check.status_code_from > check.status_code_to {
        return Err(CloudError::Validation(format!(
            "status code range {}-{} is empty",
            check.status_code_from, check.status_code_to
        )));
    }
    if !check.path.starts_with('/') {
        return Err(CloudError::Validation(
            "health check path must start with '/'".to_string(),
        ));
    }
    Ok(())
}
