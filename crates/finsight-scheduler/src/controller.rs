//! Scheduler on/off controller.
//!
//! Owns the client's belief about whether the remote scheduler is active, drives the
//! status poll loop from that belief, and reconciles start/stop actions with the
//! status the server reports afterwards.
//!
//! The belief is written from exactly three places: an applied status response,
//! an accepted start and an accepted stop. Every status request carries a sequence
//! number; a response is applied only if no newer response has been applied and no
//! start/stop was accepted after the request was issued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use finsight_bus::BusPublisher;
use finsight_client::{ApiResult, SchedulerApi};
use finsight_schema::{
    Belief, ConsoleAction, ConsoleEvent, NotificationLevel, SchedulerStatus,
};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notify::{announce, emit};
use crate::registry::success_message;
use crate::{polling_interval, ConsoleConfig, ControllerError, ScheduleRegistry};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    /// Wait after an accepted start/stop before the reconciling status fetch.
    pub settle_delay: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: crate::DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl From<&ConsoleConfig> for ControllerOptions {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// What a view renders: status panel, job table and button enablement.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub belief: Belief,
    pub last_status: Option<SchedulerStatus>,
    /// Last transient fetch failure, cleared by the next applied response.
    pub last_error: Option<String>,
    pub action_pending: Option<ConsoleAction>,
    pub fetch_in_flight: bool,
    pub visible: bool,
    pub mounted: bool,
    issued_seq: u64,
    applied_seq: u64,
    superseded_below: u64,
    in_flight: usize,
    focus_refetch: bool,
    supersede: CancellationToken,
}

impl ControllerSnapshot {
    fn new() -> Self {
        Self {
            belief: Belief::Unknown,
            last_status: None,
            last_error: None,
            action_pending: None,
            fetch_in_flight: false,
            visible: true,
            mounted: true,
            issued_seq: 0,
            applied_seq: 0,
            superseded_below: 0,
            in_flight: 0,
            focus_refetch: false,
            supersede: CancellationToken::new(),
        }
    }

    pub fn can_start(&self) -> bool {
        self.mounted && self.action_pending.is_none() && self.belief != Belief::Active
    }

    pub fn can_stop(&self) -> bool {
        self.mounted && self.action_pending.is_none() && self.belief != Belief::Inactive
    }

    fn is_stale(&self, seq: u64) -> bool {
        seq < self.superseded_below || seq <= self.applied_seq
    }
}

type Transition = Option<(Belief, Belief)>;

fn record_belief(state: &mut ControllerSnapshot, to: Belief) -> Transition {
    let from = state.belief;
    state.belief = to;
    (from != to).then_some((from, to))
}

pub struct SchedulerStatusController {
    api: Arc<dyn SchedulerApi>,
    registry: Arc<ScheduleRegistry>,
    bus: BusPublisher,
    options: ControllerOptions,
    state: watch::Sender<ControllerSnapshot>,
    lifecycle: CancellationToken,
    wake: Notify,
}

impl SchedulerStatusController {
    pub fn new(
        api: Arc<dyn SchedulerApi>,
        registry: Arc<ScheduleRegistry>,
        bus: BusPublisher,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ControllerSnapshot::new());
        Arc::new(Self {
            api,
            registry,
            bus,
            options,
            state,
            lifecycle: CancellationToken::new(),
            wake: Notify::new(),
        })
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.state.borrow().clone()
    }

    pub fn belief(&self) -> Belief {
        self.state.borrow().belief
    }

    /// Delay before the next poll tick, `None` while polling is halted.
    pub fn polling_interval(&self) -> Option<Duration> {
        let state = self.state.borrow();
        if !state.mounted {
            return None;
        }
        polling_interval(state.belief, state.visible, self.options.poll_interval)
    }

    /// Starts the poll loop. Dropping or unmounting the handle stops it.
    pub fn spawn_poller(self: &Arc<Self>) -> PollerHandle {
        let controller = Arc::clone(self);
        let task = tokio::spawn(Arc::clone(self).poll_loop());
        PollerHandle {
            controller,
            task: Some(task),
        }
    }

    /// Cancels the pending timer and any in-flight request. No state changes afterwards.
    pub fn unmount(&self) {
        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            state.mounted = false;
            self.lifecycle.cancel();
            true
        });
        tracing::debug!("scheduler controller unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        !self.lifecycle.is_cancelled()
    }

    /// Background-tab suppression. Becoming visible again refetches immediately.
    pub fn set_visible(&self, visible: bool) {
        let changed = self.state.send_if_modified(|state| {
            if !state.mounted || state.visible == visible {
                return false;
            }
            state.visible = visible;
            state.focus_refetch = visible;
            true
        });
        if changed {
            tracing::debug!(visible, "scheduler view visibility changed");
            self.wake.notify_one();
        }
    }

    pub async fn fetch_status(&self) -> Result<SchedulerStatus, ControllerError> {
        let (seq, superseded) = self.begin_fetch()?;
        tracing::debug!(seq, "fetching scheduler status");

        let response = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => return Err(ControllerError::Unmounted),
            _ = superseded.cancelled() => None,
            result = self.api.status() => Some(result),
        };
        self.finish_fetch(seq, response).await
    }

    pub async fn start(&self) -> Result<(), ControllerError> {
        self.run_action(ConsoleAction::Start).await
    }

    pub async fn stop(&self) -> Result<(), ControllerError> {
        self.run_action(ConsoleAction::Stop).await
    }

    fn begin_fetch(&self) -> Result<(u64, CancellationToken), ControllerError> {
        let mut begun = Err(ControllerError::Unmounted);
        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            state.issued_seq += 1;
            state.in_flight += 1;
            state.fetch_in_flight = true;
            begun = Ok((state.issued_seq, state.supersede.clone()));
            true
        });
        begun
    }

    async fn finish_fetch(
        &self,
        seq: u64,
        response: Option<ApiResult<SchedulerStatus>>,
    ) -> Result<SchedulerStatus, ControllerError> {
        let mut outcome = Err(ControllerError::Unmounted);
        let mut transition = None;
        let mut failure = None;

        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            state.in_flight = state.in_flight.saturating_sub(1);
            state.fetch_in_flight = state.in_flight > 0;

            let Some(result) = response else {
                outcome = Err(ControllerError::Superseded);
                return true;
            };
            if state.is_stale(seq) {
                tracing::debug!(seq, applied = state.applied_seq, "ignoring stale status response");
                outcome = Err(ControllerError::Superseded);
                return true;
            }

            match result {
                Ok(status) => {
                    state.applied_seq = seq;
                    state.last_error = None;
                    state.last_status = Some(status.clone());
                    transition = record_belief(state, Belief::from_active(status.is_active));
                    outcome = Ok(status);
                }
                Err(e) => {
                    state.last_error = Some(e.to_string());
                    failure = Some(e.to_string());
                    outcome = Err(ControllerError::TransientFetch(e));
                }
            }
            true
        });

        if let Some(error) = failure {
            tracing::warn!(seq, %error, "scheduler status fetch failed, retrying on next tick");
            emit(&self.bus, ConsoleEvent::StatusFetchFailed { error }).await;
        }
        self.publish_transition(transition).await;
        outcome
    }

    async fn run_action(&self, action: ConsoleAction) -> Result<(), ControllerError> {
        self.begin_action(action)?;

        let request = match action {
            ConsoleAction::Stop => self.api.stop(),
            _ => self.api.start(),
        };
        let result = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => return Err(ControllerError::Unmounted),
            result = request => result,
        };

        if let Err(source) = result {
            self.end_action();
            if !self.is_mounted() {
                return Err(ControllerError::Unmounted);
            }
            tracing::warn!(error = %source, %action, "scheduler action failed");
            announce(
                &self.bus,
                NotificationLevel::Error,
                action,
                format!("Failed to {action}: {source}"),
            )
            .await;
            return Err(ControllerError::Action { action, source });
        }

        tracing::info!(%action, "scheduler action accepted");
        let transition = self.accept_action(action)?;
        self.publish_transition(transition).await;

        if !self.settle().await {
            return Err(ControllerError::Unmounted);
        }

        if action == ConsoleAction::Start {
            let transition = self.confirm_start()?;
            self.publish_transition(transition).await;
        }

        match self.fetch_status().await {
            Ok(_) | Err(ControllerError::Superseded) => {}
            Err(ControllerError::Unmounted) => return Err(ControllerError::Unmounted),
            Err(e) => tracing::warn!(error = %e, %action, "reconciling status fetch failed"),
        }

        self.registry.invalidate().await;
        self.end_action();
        if !self.is_mounted() {
            return Err(ControllerError::Unmounted);
        }
        announce(
            &self.bus,
            NotificationLevel::Success,
            action,
            success_message(action),
        )
        .await;
        Ok(())
    }

    fn begin_action(&self, action: ConsoleAction) -> Result<(), ControllerError> {
        let mut begun = Err(ControllerError::Unmounted);
        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            if let Some(pending) = state.action_pending {
                begun = Err(ControllerError::ActionInFlight(pending));
                return false;
            }
            state.action_pending = Some(action);
            begun = Ok(());
            true
        });
        if let Err(ControllerError::ActionInFlight(pending)) = &begun {
            tracing::debug!(%action, %pending, "ignoring scheduler action while another is pending");
        }
        begun
    }

    fn end_action(&self) {
        self.state.send_if_modified(|state| {
            if !state.mounted || state.action_pending.is_none() {
                return false;
            }
            state.action_pending = None;
            true
        });
    }

    /// Supersedes every in-flight status request. A stop also halts polling right away.
    fn accept_action(&self, action: ConsoleAction) -> Result<Transition, ControllerError> {
        let mut accepted = Err(ControllerError::Unmounted);
        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            state.superseded_below = state.issued_seq + 1;
            let stale = std::mem::replace(&mut state.supersede, CancellationToken::new());
            stale.cancel();

            let transition = if action == ConsoleAction::Stop {
                if state.last_status.is_none() {
                    state.last_status = Some(SchedulerStatus::placeholder(false));
                }
                record_belief(state, Belief::Inactive)
            } else {
                None
            };
            accepted = Ok(transition);
            true
        });
        accepted
    }

    fn confirm_start(&self) -> Result<Transition, ControllerError> {
        let mut confirmed = Err(ControllerError::Unmounted);
        self.state.send_if_modified(|state| {
            if !state.mounted {
                return false;
            }
            if state.last_status.is_none() {
                state.last_status = Some(SchedulerStatus::placeholder(true));
            }
            confirmed = Ok(record_belief(state, Belief::Active));
            true
        });
        confirmed
    }

    async fn settle(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => false,
            _ = tokio::time::sleep(self.options.settle_delay) => true,
        }
    }

    async fn publish_transition(&self, transition: Transition) {
        let Some((from, to)) = transition else {
            return;
        };
        tracing::info!(%from, %to, "scheduler belief changed");
        self.wake.notify_one();
        emit(&self.bus, ConsoleEvent::BeliefChanged { from, to }).await;
    }

    fn tick_allowed(&self) -> bool {
        let state = self.state.borrow();
        state.mounted
            && state.in_flight == 0
            && state.action_pending.is_none()
            && polling_interval(state.belief, state.visible, self.options.poll_interval).is_some()
    }

    fn take_focus_refetch(&self) -> bool {
        let mut requested = false;
        self.state.send_if_modified(|state| {
            requested = std::mem::take(&mut state.focus_refetch);
            false
        });
        requested
    }

    async fn poll_once(&self) {
        match self.fetch_status().await {
            Ok(status) => tracing::debug!(is_active = status.is_active, "scheduler status polled"),
            Err(ControllerError::Superseded) => tracing::debug!("poll response superseded"),
            Err(ControllerError::Unmounted) => {}
            Err(e) => tracing::debug!(error = %e, "scheduler poll failed"),
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut fetch_now = true;
        loop {
            if fetch_now && self.tick_allowed() {
                self.poll_once().await;
            }
            let interval = self.polling_interval();
            tokio::select! {
                biased;
                _ = self.lifecycle.cancelled() => break,
                _ = self.wake.notified() => fetch_now = self.take_focus_refetch(),
                _ = sleep_or_halt(interval) => fetch_now = true,
            }
        }
        tracing::debug!("scheduler poll loop stopped");
    }
}

fn sleep_or_halt(interval: Option<Duration>) -> impl Future<Output = ()> {
    async move {
        match interval {
            Some(interval) => tokio::time::sleep(interval).await,
            None => std::future::pending().await,
        }
    }
}

/// Poll loop owned by a mounted view.
pub struct PollerHandle {
    controller: Arc<SchedulerStatusController>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn controller(&self) -> &Arc<SchedulerStatusController> {
        &self.controller
    }

    pub async fn unmount(mut self) {
        self.controller.unmount();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "scheduler poll loop ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.controller.unmount();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
