//! Access point provisioning workflow
//!
//! [`GatewayWorkflow`] binds a cloud account to its provider adapter and
//! drives the cascade, the reconciler, the poller and the configuration
//! aggregate through the injected ports.

use crate::aggregate::{ConfigUpdate, GatewayConfigurationAggregate};
use crate::cascade::{CascadeResolver, FetchRequest};
use crate::debounce::Debouncer;
use crate::poller::{
    AccessPointProbe, HeartbeatProbe, PollConfig, PollOutcome, ProvisioningPoller, StatusProbe,
};
use crate::providers::adapter_for;
use crate::reconciler::{AccessPointReconciler, CoreOption, Reconciliation};
use apgate_cloud::{
    AccessPoint, AccessPointApi, AccessPointCore, CloudAccountRef, CloudError, FieldId,
    GenericApConfig, ParentSelections, ProviderAdapter, ResourceFetchPort, Result,
    SelectableOption,
};
use apgate_config::PollSettings;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet period for typed input unless configured otherwise
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Result of a create or edit submission
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningReport {
    pub access_point_id: String,
    pub outcome: PollOutcome,
    /// Latest record of the access point, when it is still listed
    pub access_point: Option<AccessPoint>,
}

/// One provisioning workflow for a cloud account
pub struct GatewayWorkflow {
    account: CloudAccountRef,
    adapter: Arc<dyn ProviderAdapter>,
    fetcher: Arc<dyn ResourceFetchPort>,
    api: Arc<dyn AccessPointApi>,
    poll: PollSettings,
    debounce: Duration,
    cascade: CascadeResolver,
    reconciler: AccessPointReconciler,
    aggregate: GatewayConfigurationAggregate,
    access_points: Vec<AccessPoint>,
    cores: Vec<AccessPointCore>,
}

impl GatewayWorkflow {
    /// Workflow using the adapter of the account's provider
    pub fn new(
        account: CloudAccountRef,
        fetcher: Arc<dyn ResourceFetchPort>,
        api: Arc<dyn AccessPointApi>,
        poll: PollSettings,
    ) -> Result<Self> {
        let adapter = adapter_for(account.provider());
        Self::with_adapter(account, adapter, fetcher, api, poll)
    }

    pub fn with_adapter(
        account: CloudAccountRef,
        adapter: Arc<dyn ProviderAdapter>,
        fetcher: Arc<dyn ResourceFetchPort>,
        api: Arc<dyn AccessPointApi>,
        poll: PollSettings,
    ) -> Result<Self> {
        if adapter.kind() != account.provider() {
            return Err(CloudError::UnsupportedProvider(format!(
                "{} adapter cannot serve a {} account",
                adapter.kind(),
                account.provider()
            )));
        }
        let cascade = CascadeResolver::new(adapter.cascade_graph()?);
        let reconciler = AccessPointReconciler::new(Arc::clone(&adapter), account.clone());
        tracing::debug!(
            "Workflow for {} account {}",
            adapter.display_name(),
            account.id()
        );
        Ok(Self {
            account,
            adapter,
            fetcher,
            api,
            poll,
            debounce: DEFAULT_DEBOUNCE,
            cascade,
            reconciler,
            aggregate: GatewayConfigurationAggregate::new(),
            access_points: Vec::new(),
            cores: Vec::new(),
        })
    }

    /// Quiet period applied by [`Self::input_channel`]
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debounce = quiet;
        self
    }

    /// Sender for typed values and the debouncer releasing them
    pub fn input_channel(&self, capacity: usize) -> (mpsc::Sender<String>, Debouncer<String>) {
        Debouncer::channel(self.debounce, capacity)
    }

    pub fn account(&self) -> &CloudAccountRef {
        &self.account
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    pub fn cascade(&self) -> &CascadeResolver {
        &self.cascade
    }

    pub fn aggregate(&self) -> &GatewayConfigurationAggregate {
        &self.aggregate
    }

    pub fn access_points(&self) -> &[AccessPoint] {
        &self.access_points
    }

    pub fn cores(&self) -> &[AccessPointCore] {
        &self.cores
    }

    /// Load root fields and everything they unlock
    pub async fn start(&mut self) {
        let requests = self.cascade.start();
        self.drive(requests).await;
    }

    /// Refetch one field with the current upstream values
    pub async fn resolve_field(&mut self, field: FieldId) -> Result<()> {
        if let Some(request) = self.cascade.resolve(field)? {
            self.drive(vec![request]).await;
        }
        Ok(())
    }

    pub async fn select(&mut self, field: FieldId, value: Option<String>) -> Result<()> {
        let requests = self.cascade.select(field, value)?;
        self.drive(requests).await;
        Ok(())
    }

    /// Select the next settled value typed for `field`
    ///
    /// Returns `None` once the input is closed.
    pub async fn select_from_input(
        &mut self,
        field: FieldId,
        input: &mut Debouncer<String>,
    ) -> Option<Result<()>> {
        let value = input.next().await?;
        Some(self.select(field, Some(value)).await)
    }

    /// Seed values (e.g. from an access point being edited) and load
    pub async fn preset(&mut self, values: &ParentSelections) {
        self.cascade.preset(values);
        self.start().await;
    }

    pub async fn retry_field(&mut self, field: FieldId) -> Result<()> {
        if let Some(request) = self.cascade.retry(field)? {
            self.drive(vec![request]).await;
        }
        Ok(())
    }

    /// Fetch access points for the selected region and VPC
    pub async fn refresh_access_points(&mut self) -> Result<&[AccessPoint]> {
        let values = self.cascade.values();
        let access_points = self
            .api
            .list_access_points(
                &self.account,
                values.get(&FieldId::Region).map(String::as_str),
                values.get(&FieldId::Vpc).map(String::as_str),
            )
            .await?;
        tracing::debug!("Fetched {} access points", access_points.len());
        self.aggregate
            .apply(ConfigUpdate::RefreshAccessPoints(access_points.clone()))?;
        self.access_points = access_points;
        Ok(&self.access_points)
    }

    /// Fetch the provider's core resources for the selected region
    pub async fn refresh_cores(&mut self) -> Result<&[AccessPointCore]> {
        let region = self.cascade.values().remove(&FieldId::Region);
        let natives = self
            .api
            .list_supported_cores(&self.account, region.as_deref())
            .await?;
        self.cores = self.reconciler.map_cores(&natives);
        Ok(&self.cores)
    }

    pub fn core_options(&self) -> Vec<CoreOption> {
        self.reconciler.catalogue(&self.access_points, &self.cores)
    }

    /// Reconcile the chosen core and update the aggregate accordingly
    pub fn select_core(&mut self, option: &SelectableOption) -> Result<Reconciliation> {
        let verdict = self
            .reconciler
            .select_core(option, &self.access_points, &self.cores);
        match &verdict {
            Reconciliation::Reuse(access_point) => {
                if let Some(id) = &access_point.id {
                    self.aggregate
                        .apply(ConfigUpdate::SetAccessPoint(id.clone()))?;
                }
            }
            Reconciliation::Invalid(reason) => {
                tracing::warn!("Core {} cannot be used: {}", option.value, reason);
                self.aggregate.apply(ConfigUpdate::ClearAccessPoint)?;
            }
            Reconciliation::RequiresCreation { .. } => {
                self.aggregate.apply(ConfigUpdate::ClearAccessPoint)?;
            }
        }
        Ok(verdict)
    }

    /// Access point config prefilled from the cascade values
    pub fn draft_config(&self, name: &str) -> GenericApConfig {
        let mut config = GenericApConfig::new(self.account.id(), name, "");
        config.apply_selections(&self.cascade.values());
        config
    }

    /// Submit a new access point and poll until it settles
    pub async fn create_access_point(
        &mut self,
        config: &GenericApConfig,
        expected_unit_count: u32,
    ) -> Result<ProvisioningReport> {
        let payload = self.adapter.to_create_payload(config)?;
        let response = self.api.create_access_point(&payload).await?;
        tracing::info!("Submitted access point {} ({})", config.name, response.id);
        self.await_provisioning(response.id, config, expected_unit_count)
            .await
    }

    /// Submit changes to an existing access point and poll until it settles
    pub async fn edit_access_point(
        &mut self,
        id: &str,
        config: &GenericApConfig,
        expected_unit_count: u32,
    ) -> Result<ProvisioningReport> {
        let payload = self.adapter.to_edit_payload(id, config)?;
        let response = self.api.edit_access_point(&payload).await?;
        tracing::info!("Submitted edit of access point {}", response.id);
        self.await_provisioning(response.id, config, expected_unit_count)
            .await
    }

    /// Poll the agent heartbeat of `rule_name` until every unit reports in
    pub async fn verify_agent(&self, rule_name: &str, expected_unit_count: u32) -> Result<PollOutcome> {
        let probe = HeartbeatProbe::new(Arc::clone(&self.api), self.account.clone(), rule_name);
        poll_once(
            PollConfig::for_agents(&self.poll),
            Arc::new(probe),
            expected_unit_count,
        )
        .await
    }

    pub fn apply(&mut self, update: ConfigUpdate) -> Result<()> {
        self.aggregate.apply(update)
    }

    /// Poll a submitted access point, then publish its latest record
    ///
    /// Listing failures after the poll are logged; the report is still
    /// returned.
    async fn await_provisioning(
        &mut self,
        id: String,
        config: &GenericApConfig,
        expected_unit_count: u32,
    ) -> Result<ProvisioningReport> {
        let probe = AccessPointProbe::new(Arc::clone(&self.api), id.clone());
        let outcome = poll_once(
            PollConfig::for_access_points(&self.poll),
            Arc::new(probe),
            expected_unit_count,
        )
        .await?;

        let region = Some(config.region.as_str()).filter(|r| !r.is_empty());
        match self
            .api
            .list_access_points(&self.account, region, config.vpc.as_deref())
            .await
        {
            Ok(listed) => self.access_points = listed,
            Err(e) => tracing::warn!("Failed to list access points after provisioning: {}", e),
        }
        match self.api.get_access_point(&id).await {
            Ok(latest) => match self.access_points.iter_mut().find(|ap| ap.has_id(&id)) {
                Some(known) => *known = latest,
                None => self.access_points.push(latest),
            },
            Err(e) => tracing::warn!("Failed to read access point {}: {}", id, e),
        }
        let access_point = self.access_points.iter().find(|ap| ap.has_id(&id)).cloned();

        self.aggregate
            .apply(ConfigUpdate::RefreshAccessPoints(self.access_points.clone()))?;
        let usable = access_point.as_ref().is_some_and(|ap| !ap.is_errored());
        if outcome == PollOutcome::Succeeded && usable {
            self.aggregate
                .apply(ConfigUpdate::SetAccessPoint(id.clone()))?;
        }

        Ok(ProvisioningReport {
            access_point_id: id,
            outcome,
            access_point,
        })
    }

    /// Run fetch rounds until the cascade issues no more requests
    ///
    /// Requests of one round run concurrently.
    async fn drive(&mut self, mut requests: Vec<FetchRequest>) {
        let fetcher = Arc::clone(&self.fetcher);
        let account = self.account.clone();
        while !requests.is_empty() {
            let results = join_all(
                requests
                    .iter()
                    .map(|request| fetcher.list_options(&account, request.field, &request.parents)),
            )
            .await;

            let mut next = Vec::new();
            for (request, result) in requests.iter().zip(results) {
                next.extend(self.cascade.complete(request, result));
            }
            requests = next;
        }
    }
}

async fn poll_once(
    config: PollConfig,
    probe: Arc<dyn StatusProbe>,
    expected_unit_count: u32,
) -> Result<PollOutcome> {
    let mut poller = ProvisioningPoller::new(config, probe);
    poller.start(expected_unit_count);
    poller.wait().await.ok_or_else(|| {
        CloudError::StateError("polling stopped before reaching a terminal state".to_string())
    })
}
