//! Platform REST client
//!
//! Implements the workflow ports over the platform's autostopping API.
//! Every response is wrapped in a `{ "response": ... }` envelope and requests
//! authenticate with a bearer token.

use crate::adapter::ProviderPayload;
use crate::error::{CloudError, Result};
use crate::model::{
    AccessPoint, AgentHeartbeat, CloudAccountRef, FieldId, NativeCoreResource, ParentSelections,
    SelectableOption, SubmitResponse,
};
use crate::port::{AccessPointApi, ResourceFetchPort};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Connection settings for [`PlatformClient`]
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    /// Platform (not cloud) account the API calls are scoped to
    pub account_id: String,
    pub api_token: Option<String>,
    /// Upper bound for one request, connect to last body byte
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

/// REST implementation of [`ResourceFetchPort`] and [`AccessPointApi`]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: Url,
    config: PlatformConfig,
}

impl PlatformClient {
    pub fn new(config: PlatformConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| CloudError::Api(format!("invalid base URL '{}'", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Endpoint URL; every segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["accounts", self.config.account_id.as_str(), "autostopping"])
                .extend(segments);
        }
        url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = self.url(segments);
        let path = segments.join("/");
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).query(query);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CloudError::NotFound(path));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CloudError::Api(format!("{} {}: {}", status, path, text)));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.response)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.call(Method::GET, segments, query, None).await
    }

    fn submit_response(access_point: AccessPoint) -> Result<SubmitResponse> {
        let id = access_point
            .id
            .clone()
            .ok_or_else(|| CloudError::Api("submission response has no id".to_string()))?;
        Ok(SubmitResponse {
            id,
            response: Some(access_point),
        })
    }
}

#[async_trait]
impl ResourceFetchPort for PlatformClient {
    async fn list_options(
        &self,
        account: &CloudAccountRef,
        field: FieldId,
        parents: &ParentSelections,
    ) -> Result<Vec<SelectableOption>> {
        let query: Vec<(&str, &str)> = parents
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.get(
            &["cloud_connectors", account.id(), field.collection()],
            &query,
        )
        .await
            .map_err(|e| match e {
                CloudError::Http(err) => CloudError::Fetch(format!("{}: {}", field, err)),
                CloudError::Api(msg) => CloudError::Fetch(msg),
                other => other,
            })
    }
}

#[async_trait]
impl AccessPointApi for PlatformClient {
    async fn list_access_points(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
        vpc: Option<&str>,
    ) -> Result<Vec<AccessPoint>> {
        let mut query = vec![("cloud_account_id", account.id())];
        if let Some(region) = region {
            query.push(("region", region));
        }
        if let Some(vpc) = vpc {
            query.push(("vpc", vpc));
        }
        self.get(&["access_points"], &query).await
    }

    async fn create_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse> {
        let body = serde_json::to_value(&payload.access_point)?;
        let created: AccessPoint = self
            .call(Method::POST, &["access_points"], &[], Some(&body))
            .await?;
        tracing::info!("Submitted access point {}", payload.access_point.name);
        Self::submit_response(created)
    }

    async fn edit_access_point(&self, payload: &ProviderPayload) -> Result<SubmitResponse> {
        let id = payload
            .edit_target()
            .ok_or_else(|| CloudError::Validation("edit payload has no id".to_string()))?;
        let body = serde_json::to_value(&payload.access_point)?;
        let updated: AccessPoint = self
            .call(Method::PUT, &["access_points", id], &[], Some(&body))
            .await?;
        tracing::info!("Submitted edit of access point {}", id);
        Self::submit_response(updated)
    }

    async fn get_access_point(&self, id: &str) -> Result<AccessPoint> {
        self.get(&["access_points", id], &[]).await
    }

    async fn list_supported_cores(
        &self,
        account: &CloudAccountRef,
        region: Option<&str>,
    ) -> Result<Vec<NativeCoreResource>> {
        let mut query = vec![("cloud_account_id", account.id())];
        if let Some(region) = region {
            query.push(("region", region));
        }
        self.get(&["access_points", "cores"], &query).await
    }

    async fn get_agent_heartbeat(
        &self,
        account: &CloudAccountRef,
        rule_name: &str,
    ) -> Result<AgentHeartbeat> {
        self.get(
            &["rules", rule_name, "agent", "heartbeat"],
            &[("cloud_account_id", account.id())],
        )
        .await
    }
}
