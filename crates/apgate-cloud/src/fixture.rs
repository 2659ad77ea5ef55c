//! In-memory fixture cloud
//!
//! Implements both ports over a JSON snapshot so the workflow can run
//! without a platform. The snapshot can be loaded from and saved back to a
//! file, which lets consecutive CLI invocations observe each other's
//! submissions.

use crate::adapter::ProviderPayload;
use crate::error::{CloudError, Result};
use crate::model::{
    AccessPoint, AccessPointStatus, AgentHeartbeat, CloudAccountRef, FieldId, NativeCoreResource,
    ParentSelections, SelectableOption, SubmitResponse,
};
use crate::port::{AccessPointApi, ResourceFetchPort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const FIXTURE_VERSION: u32 = 1;

fn fixture_version() -> u32 {
    FIXTURE_VERSION
}

/// Options served for one field when the request's parents match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSet {
    pub account: String,
    pub field: FieldId,
    /// Every entry must equal the request's value for that parent
    #[serde(default)]
    pub parents: ParentSelections,
    pub options: Vec<SelectableOption>,
}

/// Core resource listed for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCore {
    pub account: String,
    /// `None` lists the core in every region
    #[serde(default)]
    pub region: Option<String>,
    pub resource: NativeCoreResource,
}

/// Terminal status reached by submitted access points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    #[default]
    Created,
    Errored,
    /// Stays `submitted` forever
    Stuck,
}

/// How the fixture reacts to requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureBehaviour {
    /// Number of status reads that still report `submitted`
    #[serde(default)]
    pub polls_until_ready: u32,
    #[serde(default)]
    pub outcome: ProvisionOutcome,
    /// Fields whose option listing fails
    #[serde(default)]
    pub failing_fields: Vec<FieldId>,
}

/// Serialisable state of the fixture cloud
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSnapshot {
    #[serde(default = "fixture_version")]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub options: Vec<OptionSet>,
    #[serde(default)]
    pub cores: Vec<FixtureCore>,
    #[serde(default)]
    pub access_points: Vec<AccessPoint>,
    /// Connected agent units by rule name
    #[serde(default)]
    pub heartbeats: BTreeMap<String, u32>,
    #[serde(default)]
    pub behaviour: FixtureBehaviour,
    /// Remaining `submitted` reads by access point id
    #[serde(default)]
    pub pending: BTreeMap<String, u32>,
    #[serde(default)]
    pub next_id: u64,
}

impl Default for CloudSnapshot {
    fn default() -> Self {
        Self {
            version: FIXTURE_VERSION,
            updated_at: Utc::now(),
            options: Vec::new(),
            cores: Vec::new(),
            access_points: Vec::new(),
            heartbeats: BTreeMap::new(),
            behaviour: FixtureBehaviour::default(),
            pending: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl CloudSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(
        mut self,
        account: &str,
        field: FieldId,
        parents: &[(FieldId, &str)],
        options: &[&str],
    ) -> Self {
        self.options.push(OptionSet {
            account: account.to_string(),
            field,
            parents: parents
                .iter()
                .map(|(f, v)| (*f, v.to_string()))
                .collect(),
            options: options.iter().map(|o| SelectableOption::plain(*o)).collect(),
        });
        self
    }

    pub fn with_core(
        mut self,
        account: &str,
        region: Option<&str>,
        resource: serde_json::Value,
    ) -> Self {
        self.cores.push(FixtureCore {
            account: account.to_string(),
            region: region.map(str::to_string),
            resource: NativeCoreResource(resource),
        });
        self
    }

    pub fn with_access_point(mut self, access_point: AccessPoint) -> Self {
        self.access_points.push(access_point);
        self
    }

    pub fn with_heartbeat(mut self, rule_name: &str, units: u32) -> Self {
        self.heartbeats.insert(rule_name.to_string(), units);
        self
    }

    pub fn with_behaviour(mut self, behaviour: FixtureBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    /// Most specific option set matching the request
    fn options_for(
        &self,
        account: &str,
        field: FieldId,
        parents: &ParentSelections,
    ) -> Vec<SelectableOption> {
        self.options
            .iter()
            .filter(|set| set.account == account && set.field == field)
            .filter(|set| {
                set.parents
                    .iter()
                    .all(|(k, v)| parents.get(k).map(|p| p == v).unwrap_or(false))
            })
            .max_by_key(|set| set.parents.len())
            .map(|set| set.options.clone())
            .unwrap_or_default()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A recorded option fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub field: FieldId,
    pub parents: ParentSelections,
}

/// In-memory implementation of [`ResourceFetchPort`] and [`AccessPointApi`]
pub struct FixtureCloud {
    state: Mutex<CloudSnapshot>,
    path: Option<PathBuf>,
    fetch_log: Mutex<Vec<FetchRecord>>,
}

impl FixtureCloud {
    pub fn new(snapshot: CloudSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            path: None,
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    /// Load a snapshot file; a missing file yields an empty cloud bound to `path`
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            let snapshot: CloudSnapshot = serde_json::from_str(&content)?;
            if snapshot.version > FIXTURE_VERSION {
                return Err(CloudError::StateError(format!(
                    "fixture version {} is newer than supported version {}",
                    snapshot.version, FIXTURE_VERSION
                )));
            }
            tracing::debug!(
                "Loaded fixture with {} access points",
                snapshot.access_points.len()
            );
            snapshot
        } else {
            tracing::debug!("Fixture file not found, starting empty");
            CloudSnapshot::new()
        };

        Ok(Self {
            state: Mutex::new(snapshot),
            path: Some(path),
            fetch_log: Mutex::new(Vec::new()),
        })
    }

    /// Write the snapshot back to the file it was loaded from
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Err(CloudError::StateError(
                "fixture was not loaded from a file".to_string(),
            ));
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(&*self.state.lock().await)?;
        fs::write(path, content).await?;
        tracing::debug!("Saved fixture to {}", path.display());
        Ok(())
    }

    pub async fn snapshot(&self) -> CloudSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn fetch_log(&self) -> Vec<FetchRecord> {
        self.fetch_log.lock().await.clone()
    }

    pub async fn set_heartbeat(&self, rule_name: &str, units: u32) {
        let mut state = self.state.lock().await;
        state.heartbeats.insert(rule_name.to_string(), units);
        state.touch();
    }

    pub async fn set_behaviour(&self, behaviour: FixtureBehaviour) {
        self.state.lock().await.behaviour = behaviour;
    }
}

#[async_trait]
impl ResourceFetchPort for FixtureCloud {
    async fn list_options(
        &self,
        account: &CloudAccountRef,
        field: FieldId,
        parents: &ParentSelections,
    ) -> Result<Vec<SelectableOption>> {
        self.fetch_log.lock().await.push(FetchRecord {
            field,
            parents: parents.clone(),
        });

        let state = self.state.lock().await;
        if state.behaviour.failing_fields.contains(&field) {
            return Err(CloudError::Fetch(format!(
                "listing {} is unavailable",
                field.collection()
            )));
        }
        Ok(state.options_for(account.id(), field, parents))
    }
}

#[async_trait]
impl AccessPointApi for FixtureCloud {
    async fn list_access_points(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
        vpc: Option<&str>,
    ) -> Result<Vec<AccessPoint>> {
        let state = self.state.lock().await;
        Ok(state
            .access_points
            .iter()
            .filter(|ap| ap.cloud_account_id == account.id())
            .filter(|ap| region.is_none_or(|r| ap.region == r))
            .filter(|ap| vpc.is_none_or(|v| ap.vpc == v))
            .cloned()
            .collect())
    }

    async fn create_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = format!("ap-{}", state.next_id);

        let mut access_point = payload.access_point.clone();
        access_point.id = Some(id.clone());
        access_point.status = AccessPointStatus::Submitted;
        access_point.created_at = Some(Utc::now());

        let polls = state.behaviour.polls_until_ready;
        state.pending.insert(id.clone(), polls);
        state.access_points.push(access_point.clone());
        state.touch();

        tracing::debug!("Fixture accepted access point {}", id);
        Ok(SubmitResponse {
            id,
            response: Some(access_point),
        })
    }

    async fn edit_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse> {
        let id = payload
            .edit_target()
            .ok_or_else(|| CloudError::Validation("edit payload has no id".to_string()))?
            .to_string();

        let mut state = self.state.lock().await;
        let polls = state.behaviour.polls_until_ready;
        let existing = state
            .access_points
            .iter_mut()
            .find(|ap| ap.has_id(&id))
            .ok_or_else(|| CloudError::NotFound(format!("access point {}", id)))?;

        let created_at = existing.created_at;
        *existing = payload.access_point.clone();
        existing.id = Some(id.clone());
        existing.status = AccessPointStatus::Submitted;
        existing.created_at = created_at;
        let updated = existing.clone();

        state.pending.insert(id.clone(), polls);
        state.touch();

        Ok(SubmitResponse {
            id,
            response: Some(updated),
        })
    }

    async fn get_access_point(&self, id: &str) -> Result<AccessPoint> {
        let mut state = self.state.lock().await;
        let outcome = state.behaviour.outcome;

        let settle = match state.pending.get_mut(id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => outcome != ProvisionOutcome::Stuck,
            None => false,
        };

        if settle {
            state.pending.remove(id);
            if let Some(ap) = state.access_points.iter_mut().find(|ap| ap.has_id(id)) {
                ap.status = match outcome {
                    ProvisionOutcome::Errored => AccessPointStatus::Errored,
                    _ => AccessPointStatus::Created,
                };
            }
            state.touch();
        }

        state
            .access_points
            .iter()
            .find(|ap| ap.has_id(id))
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("access point {}", id)))
    }

    async fn list_supported_cores(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
    ) -> Result<Vec<NativeCoreResource>> {
        let state = self.state.lock().await;
        Ok(state
            .cores
            .iter()
            .filter(|core| core.account == account.id())
            .filter(|core| match (region, core.region.as_deref()) {
                (Some(wanted), Some(listed)) => wanted == listed,
                _ => true,
            })
            .map(|core| core.resource.clone())
            .collect())
    }

    async fn get_agent_heartbeat(
        &self,
        _account: &CloudAccountRef,
        rule_name: &str,
    ) -> Result<AgentHeartbeat> {
        let state = self.state.lock().await;
        Ok(AgentHeartbeat {
            number_of_connected_units: state.heartbeats.get(rule_name).copied().unwrap_or(0),
        })
    }
}
