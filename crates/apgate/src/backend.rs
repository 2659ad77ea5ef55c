//! Port implementations selected at startup

use anyhow::Context;
use apgate_cloud::{
    AccessPointApi, CloudAccountRef, FixtureCloud, PlatformClient, PlatformConfig,
    ResourceFetchPort,
};
use apgate_config::WorkflowConfig;
use apgate_core::GatewayWorkflow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fetch and access point ports shared by every command
pub struct Backend {
    fetcher: Arc<dyn ResourceFetchPort>,
    api: Arc<dyn AccessPointApi>,
    fixture: Option<Arc<FixtureCloud>>,
}

impl Backend {
    /// Fixture cloud when `fixture` is given, the platform API otherwise
    pub async fn open(fixture: Option<&Path>, config: &WorkflowConfig) -> anyhow::Result<Self> {
        if let Some(path) = fixture {
            let cloud = FixtureCloud::load(path)
                .await
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            let cloud = Arc::new(cloud);
            tracing::debug!("Using fixture cloud {}", path.display());
            return Ok(Self {
                fetcher: cloud.clone(),
                api: cloud.clone(),
                fixture: Some(cloud),
            });
        }

        if config.api.account_id.is_empty() {
            anyhow::bail!("api.account_id is not configured; set it in apgate.yaml or pass --fixture");
        }
        let api_token = config.api.token();
        if api_token.is_none() {
            tracing::warn!("{} is not set, calling the API without a token", config.api.token_env);
        }
        let client = PlatformClient::new(PlatformConfig {
            base_url: config.api.base_url.clone(),
            account_id: config.api.account_id.clone(),
            api_token,
            request_timeout: Duration::from_millis(config.api.request_timeout_ms),
        })
        .context("Failed to build platform client")?;
        let client = Arc::new(client);
        tracing::debug!("Using platform API {}", config.api.base_url);
        Ok(Self {
            fetcher: client.clone(),
            api: client,
            fixture: None,
        })
    }

    pub fn workflow(
        &self,
        account: CloudAccountRef,
        config: &WorkflowConfig,
    ) -> anyhow::Result<GatewayWorkflow> {
        let workflow = GatewayWorkflow::new(
            account,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.api),
            config.poll.clone(),
        )?;
        Ok(workflow.with_debounce(Duration::from_millis(config.debounce_ms)))
    }

    /// Save the fixture cloud back to its file
    pub async fn persist(&self) -> anyhow::Result<()> {
        if let Some(cloud) = &self.fixture {
            cloud.save().await.context("Failed to save fixture")?;
        }
        Ok(())
    }
}
