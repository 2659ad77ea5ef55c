//! Bounded provisioning poll
//!
//! [`ProvisioningPoller`] repeatedly runs a [`StatusProbe`] until it reports
//! success or failure, or until the timeout bound elapses. The bound scales
//! with the number of expected units: `base_timeout * max(units, 1)`.
//!
//! State is published through a `tokio::sync::watch` channel. Every start
//! bumps a generation counter; a probe result from an older generation is
//! discarded, so nothing observable happens after `cancel`.

use apgate_cloud::{
    AccessPointApi, AccessPointStatus, CloudAccountRef, CloudError, Result,
};
use apgate_config::PollSettings;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout_at};

/// Poll timing
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Timeout per expected unit
    pub base_timeout: Duration,
    /// 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
}

impl PollConfig {
    pub fn fixed(interval: Duration, base_timeout: Duration) -> Self {
        Self {
            interval,
            base_timeout,
            backoff_multiplier: 1.0,
            max_interval: interval,
        }
    }

    /// Timing for access point creation and edits
    pub fn for_access_points(settings: &PollSettings) -> Self {
        Self::from_settings(settings, settings.access_point_timeout_ms)
    }

    /// Timing for agent heartbeat verification
    pub fn for_agents(settings: &PollSettings) -> Self {
        Self::from_settings(settings, settings.agent_timeout_ms)
    }

    fn from_settings(settings: &PollSettings, base_timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            base_timeout: Duration::from_millis(base_timeout_ms),
            backoff_multiplier: settings.backoff_multiplier,
            max_interval: Duration::from_millis(settings.max_interval_ms),
        }
    }

    pub fn timeout_bound(&self, expected_unit_count: u32) -> Duration {
        self.base_timeout * expected_unit_count.max(1)
    }

    /// Delay after the given zero-based attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return self.interval;
        }
        let cap = self.max_interval.max(self.interval);
        let secs = self.interval.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        if !secs.is_finite() || secs >= cap.as_secs_f64() {
            cap
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Result of one status probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Success,
    /// Explicit error reported by the backend
    Failure(String),
    Pending,
}

/// Elapsed-time bookkeeping of one polling run
#[derive(Debug, Clone)]
pub struct PollSession {
    pub started_at: Instant,
    pub attempts: u32,
    pub expected_unit_count: u32,
    pub bound: Duration,
}

impl PollSession {
    pub fn new(expected_unit_count: u32, bound: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            attempts: 0,
            expected_unit_count: expected_unit_count.max(1),
            bound,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Status check run on every poll attempt
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, session: &PollSession) -> Result<ProbeStatus>;
}

/// Terminal poll result
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded,
    Failed(String),
    TimedOut { elapsed: Duration, bound: Duration },
}

impl PollOutcome {
    pub fn into_result(self) -> Result<()> {
        match self {
            PollOutcome::Succeeded => Ok(()),
            PollOutcome::Failed(reason) => Err(CloudError::ProvisioningFailed(reason)),
            PollOutcome::TimedOut { elapsed, bound } => Err(CloudError::ProvisioningTimedOut {
                elapsed_ms: elapsed.as_millis() as u64,
                bound_ms: bound.as_millis() as u64,
            }),
        }
    }
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Succeeded => write!(f, "succeeded"),
            PollOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            PollOutcome::TimedOut { elapsed, bound } => write!(
                f,
                "timed out after {}ms (bound {}ms)",
                elapsed.as_millis(),
                bound.as_millis()
            ),
        }
    }
}

/// Observable poller state
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    Polling,
    Succeeded,
    Failed(String),
    TimedOut { elapsed: Duration, bound: Duration },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling)
    }

    pub fn outcome(&self) -> Option<PollOutcome> {
        match self {
            PollState::Idle | PollState::Polling => None,
            PollState::Succeeded => Some(PollOutcome::Succeeded),
            PollState::Failed(reason) => Some(PollOutcome::Failed(reason.clone())),
            PollState::TimedOut { elapsed, bound } => Some(PollOutcome::TimedOut {
                elapsed: *elapsed,
                bound: *bound,
            }),
        }
    }
}

impl From<PollOutcome> for PollState {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Succeeded => PollState::Succeeded,
            PollOutcome::Failed(reason) => PollState::Failed(reason),
            PollOutcome::TimedOut { elapsed, bound } => PollState::TimedOut { elapsed, bound },
        }
    }
}

/// Bounded-retry poll state machine
pub struct ProvisioningPoller {
    config: PollConfig,
    probe: Arc<dyn StatusProbe>,
    state: Arc<watch::Sender<PollState>>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl ProvisioningPoller {
    pub fn new(config: PollConfig, probe: Arc<dyn StatusProbe>) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            config,
            probe,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Enter `Polling` with a fresh session
    ///
    /// Returns `false` without side effects while already polling. From a
    /// terminal state this is a retry.
    pub fn start(&mut self, expected_unit_count: u32) -> bool {
        if *self.state.borrow() == PollState::Polling {
            tracing::debug!("Poller already running, ignoring start");
            return false;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = PollSession::new(
            expected_unit_count,
            self.config.timeout_bound(expected_unit_count),
        );
        tracing::debug!(
            "Polling started: {} unit(s), bound {}ms",
            session.expected_unit_count,
            session.bound.as_millis()
        );
        self.state.send_replace(PollState::Polling);

        self.task = Some(tokio::spawn(run(
            Arc::clone(&self.probe),
            self.config.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.generation),
            generation,
            session,
        )));
        true
    }

    /// Stop polling; no probe runs after this returns
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_if_modified(|state| {
            if *state == PollState::Polling {
                *state = PollState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Wait until the current run ends
    ///
    /// `None` when the poller is idle or was cancelled.
    pub async fn wait(&self) -> Option<PollOutcome> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| *state != PollState::Polling)
            .await
            .ok()?
            .clone();
        state.outcome()
    }
}

impl Drop for ProvisioningPoller {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    probe: Arc<dyn StatusProbe>,
    config: PollConfig,
    state: Arc<watch::Sender<PollState>>,
    generation: Arc<AtomicU64>,
    current: u64,
    mut session: PollSession,
) {
    let is_current = || generation.load(Ordering::SeqCst) == current;
    let deadline = session.started_at + session.bound;

    loop {
        if !is_current() {
            return;
        }
        session.attempts += 1;
        let status = timeout_at(deadline, probe.probe(&session)).await;
        if !is_current() {
            tracing::debug!("Dropping poll result from a superseded run");
            return;
        }

        let elapsed = session.elapsed();
        // A status read still running at the deadline is abandoned
        let outcome = match status {
            Ok(Ok(ProbeStatus::Success)) => Some(PollOutcome::Succeeded),
            Ok(Ok(ProbeStatus::Failure(reason))) => Some(PollOutcome::Failed(reason)),
            Ok(Ok(ProbeStatus::Pending)) => {
                tracing::debug!(
                    "Poll attempt {} pending after {}ms",
                    session.attempts,
                    elapsed.as_millis()
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("Poll attempt {} failed: {}", session.attempts, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Poll attempt {} did not answer before the {}ms bound",
                    session.attempts,
                    session.bound.as_millis()
                );
                None
            }
        };
        let outcome = outcome.or_else(|| {
            (elapsed >= session.bound).then_some(PollOutcome::TimedOut {
                elapsed,
                bound: session.bound,
            })
        });

        if let Some(outcome) = outcome {
            tracing::info!("Polling {} after {} attempt(s)", outcome, session.attempts);
            state.send_if_modified(|s| {
                if is_current() && *s == PollState::Polling {
                    *s = outcome.into();
                    true
                } else {
                    false
                }
            });
            return;
        }

        let delay = config
            .delay_for_attempt(session.attempts - 1)
            .min(session.bound.saturating_sub(elapsed));
        sleep(delay).await;
    }
}

/// Succeeds once the access point reports `created`
pub struct AccessPointProbe {
    api: Arc<dyn AccessPointApi>,
    id: String,
}

impl AccessPointProbe {
    pub fn new(api: Arc<dyn AccessPointApi>, id: impl Into<String>) -> Self {
        Self { api, id: id.into() }
    }
}

#[async_trait]
impl StatusProbe for AccessPointProbe {
    async fn probe(&self, _session: &PollSession) -> Result<ProbeStatus> {
        let access_point = self.api.get_access_point(&self.id).await?;
        Ok(match access_point.status {
            AccessPointStatus::Created => ProbeStatus::Success,
            AccessPointStatus::Errored => {
                ProbeStatus::Failure(format!("access point {} errored", self.id))
            }
            AccessPointStatus::Submitted => ProbeStatus::Pending,
        })
    }
}

/// Succeeds once every expected agent unit reports in
pub struct HeartbeatProbe {
    api: Arc<dyn AccessPointApi>,
    account: CloudAccountRef,
    rule_name: String,
}

impl HeartbeatProbe {
    pub fn new(
        api: Arc<dyn AccessPointApi>,
        account: CloudAccountRef,
        rule_name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            account,
            rule_name: rule_name.into(),
        }
    }
}

#[async_trait]
impl StatusProbe for HeartbeatProbe {
    async fn probe(&self, session: &PollSession) -> Result<ProbeStatus> {
        let heartbeat = self
            .api
            .get_agent_heartbeat(&self.account, &self.rule_name)
            .await?;
        Ok(
            if heartbeat.number_of_connected_units >= session.expected_unit_count {
                ProbeStatus::Success
            } else {
                ProbeStatus::Pending
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apgate_cloud::{
        CloudSnapshot, FixtureBehaviour, FixtureCloud, GenericApConfig, ProviderKind,
        ProviderPayload, ProvisionOutcome,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    /// Replays scripted answers, then reports `Pending`
    #[derive(Default)]
    struct ScriptedProbe {
        script: Mutex<VecDeque<Result<ProbeStatus>>>,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Result<ProbeStatus>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        async fn probe(&self, _session: &PollSession) -> Result<ProbeStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(ProbeStatus::Pending))
        }
    }

    /// Answers `Pending` after a fixed latency
    struct LaggingStatus {
        latency: Duration,
        calls: AtomicU32,
    }

    impl LaggingStatus {
        fn new(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                latency,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl StatusProbe for LaggingStatus {
        async fn probe(&self, _session: &PollSession) -> Result<ProbeStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.latency).await;
            Ok(ProbeStatus::Pending)
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn poller(probe: Arc<ScriptedProbe>, base_timeout: u64) -> ProvisioningPoller {
        ProvisioningPoller::new(PollConfig::fixed(ms(1000), ms(base_timeout)), probe)
    }

    #[test]
    fn test_timeout_bound_scales_with_units() {
        let config = PollConfig::fixed(ms(1000), ms(5000));
        assert_eq!(config.timeout_bound(0), ms(5000));
        assert_eq!(config.timeout_bound(1), ms(5000));
        assert_eq!(config.timeout_bound(3), ms(15000));
    }

    #[test]
    fn test_delay_backoff_is_capped() {
        let config = PollConfig {
            interval: ms(1000),
            base_timeout: ms(60_000),
            backoff_multiplier: 2.0,
            max_interval: ms(5000),
        };
        assert_eq!(config.delay_for_attempt(0), ms(1000));
        assert_eq!(config.delay_for_attempt(1), ms(2000));
        assert_eq!(config.delay_for_attempt(2), ms(4000));
        assert_eq!(config.delay_for_attempt(3), ms(5000));
        assert_eq!(PollConfig::fixed(ms(700), ms(1)).delay_for_attempt(9), ms(700));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = PollSettings::default();
        let config = PollConfig::for_agents(&settings);
        assert_eq!(config.interval, ms(settings.interval_ms));
        assert_eq!(config.base_timeout, ms(settings.agent_timeout_ms));
        assert_eq!(
            PollConfig::for_access_points(&settings).base_timeout,
            ms(settings.access_point_timeout_ms)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_scaled_bound() {
        let probe = ScriptedProbe::new(vec![]);
        let mut poller = poller(Arc::clone(&probe), 5000);
        assert!(poller.start(2));

        sleep(ms(9000)).await;
        assert_eq!(poller.state(), PollState::Polling);

        sleep(ms(999)).await;
        assert_eq!(poller.state(), PollState::Polling);

        sleep(ms(2)).await;
        assert_eq!(
            poller.state(),
            PollState::TimedOut {
                elapsed: ms(10_000),
                bound: ms(10_000)
            }
        );
        assert_eq!(probe.calls(), 11);

        sleep(ms(5000)).await;
        assert_eq!(probe.calls(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_status_reads_do_not_extend_the_bound() {
        let status = LaggingStatus::new(ms(3000));
        let mut poller = ProvisioningPoller::new(
            PollConfig::fixed(ms(1000), ms(5000)),
            Arc::clone(&status) as Arc<dyn StatusProbe>,
        );
        assert!(poller.start(2));

        sleep(ms(9999)).await;
        assert_eq!(poller.state(), PollState::Polling);

        sleep(ms(2)).await;
        assert_eq!(
            poller.state(),
            PollState::TimedOut {
                elapsed: ms(10_000),
                bound: ms(10_000)
            }
        );
        assert_eq!(status.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_status_read_times_out() {
        let status = LaggingStatus::new(Duration::from_secs(3600));
        let mut poller = ProvisioningPoller::new(
            PollConfig::fixed(ms(1000), ms(5000)),
            Arc::clone(&status) as Arc<dyn StatusProbe>,
        );
        assert!(poller.start(1));

        assert_eq!(
            poller.wait().await,
            Some(PollOutcome::TimedOut {
                elapsed: ms(5000),
                bound: ms(5000)
            })
        );
        assert_eq!(status.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_notified_once() {
        let probe = ScriptedProbe::new(vec![
            Ok(ProbeStatus::Pending),
            Ok(ProbeStatus::Pending),
            Ok(ProbeStatus::Success),
        ]);
        let mut poller = poller(Arc::clone(&probe), 60_000);
        let mut rx = poller.subscribe();
        rx.mark_unchanged();

        assert!(poller.start(1));
        assert!(!poller.start(1));
        assert!(!poller.start(3));

        assert_eq!(poller.wait().await, Some(PollOutcome::Succeeded));
        assert_eq!(probe.calls(), 3);

        let mut notifications = Vec::new();
        while rx.has_changed().unwrap() {
            notifications.push(rx.borrow_and_update().clone());
        }
        assert_eq!(notifications, vec![PollState::Succeeded]);

        sleep(ms(10_000)).await;
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_failure_is_not_a_timeout() {
        let probe = ScriptedProbe::new(vec![
            Ok(ProbeStatus::Pending),
            Ok(ProbeStatus::Failure("access point ap-1 errored".into())),
        ]);
        let mut poller = poller(probe, 60_000);
        poller.start(1);

        let outcome = poller.wait().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Failed("access point ap-1 errored".into())
        );
        assert!(matches!(
            outcome.into_result(),
            Err(CloudError::ProvisioningFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_errors_are_transient() {
        let probe = ScriptedProbe::new(vec![
            Err(CloudError::Api("502 bad gateway".into())),
            Ok(ProbeStatus::Success),
        ]);
        let mut poller = poller(Arc::clone(&probe), 60_000);
        poller.start(1);
        assert_eq!(poller.wait().await, Some(PollOutcome::Succeeded));
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_probes() {
        let probe = ScriptedProbe::new(vec![]);
        let mut poller = poller(Arc::clone(&probe), 60_000);
        poller.start(1);

        sleep(ms(1500)).await;
        assert_eq!(probe.calls(), 2);

        poller.cancel();
        assert_eq!(poller.state(), PollState::Idle);
        assert_eq!(poller.wait().await, None);

        sleep(ms(10_000)).await;
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_probes() {
        let probe = ScriptedProbe::new(vec![]);
        let mut poller = poller(Arc::clone(&probe), 60_000);
        poller.start(1);
        sleep(ms(500)).await;
        drop(poller);

        sleep(ms(10_000)).await;
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_resets_elapsed() {
        let probe = ScriptedProbe::new(vec![]);
        let mut poller = poller(Arc::clone(&probe), 2000);
        poller.start(1);
        assert!(matches!(
            poller.wait().await,
            Some(PollOutcome::TimedOut { .. })
        ));

        assert!(poller.start(1));
        sleep(ms(1500)).await;
        assert_eq!(poller.state(), PollState::Polling);

        let outcome = poller.wait().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                elapsed: ms(2000),
                bound: ms(2000)
            }
        );
        assert!(matches!(
            outcome.into_result(),
            Err(CloudError::ProvisioningTimedOut {
                elapsed_ms: 2000,
                bound_ms: 2000
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_point_probe_against_fixture() {
        let cloud = Arc::new(FixtureCloud::new(CloudSnapshot::new().with_behaviour(
            FixtureBehaviour {
                polls_until_ready: 2,
                ..Default::default()
            },
        )));
        let config = GenericApConfig::new("ca-1", "edge", "us-east-1");
        let submitted = cloud
            .create_access_point(&ProviderPayload {
                provider: ProviderKind::Aws,
                access_point: config.base_access_point(ProviderKind::Aws),
            })
            .await
            .unwrap();

        let probe = Arc::new(AccessPointProbe::new(cloud.clone(), submitted.id.clone()));
        let mut poller = ProvisioningPoller::new(PollConfig::fixed(ms(1000), ms(60_000)), probe);
        poller.start(1);
        assert_eq!(poller.wait().await, Some(PollOutcome::Succeeded));

        let ap = cloud.get_access_point(&submitted.id).await.unwrap();
        assert_eq!(ap.status, AccessPointStatus::Created);

        cloud
            .set_behaviour(FixtureBehaviour {
                outcome: ProvisionOutcome::Errored,
                ..Default::default()
            })
            .await;
        let failing = cloud
            .create_access_point(&ProviderPayload {
                provider: ProviderKind::Aws,
                access_point: config.base_access_point(ProviderKind::Aws),
            })
            .await
            .unwrap();
        let probe = Arc::new(AccessPointProbe::new(cloud.clone(), failing.id));
        let mut poller = ProvisioningPoller::new(PollConfig::fixed(ms(1000), ms(60_000)), probe);
        poller.start(1);
        assert!(matches!(poller.wait().await, Some(PollOutcome::Failed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_probe_waits_for_all_units() {
        let cloud = Arc::new(FixtureCloud::new(
            CloudSnapshot::new().with_heartbeat("nightly", 1),
        ));
        let account = CloudAccountRef::new("ca-1", ProviderKind::Aws);
        let probe = Arc::new(HeartbeatProbe::new(cloud.clone(), account, "nightly"));
        let mut poller = ProvisioningPoller::new(PollConfig::fixed(ms(1000), ms(5000)), probe);

        poller.start(2);
        sleep(ms(3500)).await;
        assert_eq!(poller.state(), PollState::Polling);

        cloud.set_heartbeat("nightly", 2).await;
        assert_eq!(poller.wait().await, Some(PollOutcome::Succeeded));
    }
}
