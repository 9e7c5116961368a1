//! Reading session engine.
//!
//! Drives one session end to end: submits signed progress reports on the
//! pacing schedule, turns pages between them, and recovers from expired
//! sessions through the refresher with exponential backoff. Everything runs
//! on a single task with at most one request in flight.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::credentials::Credentials;
use crate::error::{EngineError, EngineResult};
use crate::fsm::{RetryPolicy, SessionMachine, SessionMachineInput, SessionState};
use crate::notifier::Notifier;
use crate::pacing::{PacingMode, PacingScheduler};
use crate::payload::{Payload, NONCE_MAX};
use crate::progress::{ProgressModel, ProgressPolicy, ProgressState};
use crate::refresher::{CredentialRefresher, Endpoints};
use crate::transport::{OutboundRequest, Transport, DEFAULT_REQUEST_TIMEOUT};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub endpoints: Endpoints,
    pub pacing: PacingMode,
    pub retry: RetryPolicy,
    pub progress: ProgressPolicy,
    /// Submit once before the loop and recover first if that fails.
    pub preflight: bool,
    pub request_timeout_secs: u64,
    /// Seed for every random draw. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            pacing: PacingMode::default(),
            retry: RetryPolicy::default(),
            progress: ProgressPolicy::default(),
            preflight: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Attempt bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttemptCounters {
    /// Index of the next submission in the schedule.
    pub attempt_index: u64,
    /// Failures since the last success or drift reset.
    pub consecutive_failures: u32,
    /// Failed recovery cycles since the last success.
    pub retry_count: u32,
    /// Failures since the last success; never reset by drift.
    pub failures_since_success: u32,
    pub successes: u64,
    pub total_failures: u64,
    pub refreshes: u64,
}

/// Everything the session mutates, owned in one place.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub credentials: Credentials,
    pub payload: Payload,
    original_payload: Payload,
    pub progress: ProgressModel,
    pub counters: AttemptCounters,
}

impl SessionContext {
    pub fn new(credentials: Credentials, payload: Payload, policy: ProgressPolicy) -> Self {
        let progress = ProgressModel::new(ProgressState::from_payload(&payload), policy);
        Self {
            credentials,
            original_payload: payload.clone(),
            payload,
            progress,
            counters: AttemptCounters::default(),
        }
    }

    /// Payload as it was at session start.
    pub fn original_payload(&self) -> &Payload {
        &self.original_payload
    }

    /// Return payload and reading position to the start-of-session
    /// snapshot after repeated failures.
    pub fn reset_drift(&mut self) {
        self.payload = self.original_payload.clone();
        self.progress.reset();
        self.counters.consecutive_failures = 0;
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub state: SessionState,
    pub successes: u64,
    pub failures: u64,
    pub refreshes: u64,
    pub elapsed_secs: u64,
    pub percent_complete: f64,
    pub chapter_index: u32,
}

impl SessionReport {
    pub fn summary(&self) -> String {
        format!(
            "Reading session finished: {} progress reports over {:.1} minutes, {:.1}% complete (chapter {})",
            self.successes,
            self.elapsed_secs as f64 / 60.0,
            self.percent_complete,
            self.chapter_index
        )
    }
}

/// Runs one reading session.
pub struct SessionEngine {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    refresher: CredentialRefresher,
    notifier: Arc<dyn Notifier>,
    fsm: SessionMachine,
    rng: StdRng,
    scheduler: PacingScheduler,
    context: SessionContext,
    started: Option<Instant>,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        context: SessionContext,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scheduler = PacingScheduler::new(config.pacing.clone(), &mut rng);
        let refresher = CredentialRefresher::new(config.endpoints.clone(), transport.clone());

        Self {
            config,
            transport,
            refresher,
            notifier,
            fsm: SessionMachine::new(),
            rng,
            scheduler,
            context,
            started: None,
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.fsm.state())
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn scheduler(&self) -> &PacingScheduler {
        &self.scheduler
    }

    /// Run the session to completion.
    ///
    /// Sends exactly one notification: the summary on success, or the
    /// failure reason before the error is returned.
    pub async fn run(&mut self) -> EngineResult<SessionReport> {
        self.started = Some(Instant::now());
        info!(
            planned_attempts = self.scheduler.planned_attempts(),
            preflight = self.config.preflight,
            "Reading session starting"
        );

        match self.drive().await {
            Ok(()) => {
                self.transition(SessionMachineInput::Completed)?;
                let report = self.report();
                info!(
                    successes = report.successes,
                    failures = report.failures,
                    elapsed_secs = report.elapsed_secs,
                    percent = report.percent_complete,
                    "Reading session complete"
                );
                self.notifier.notify(&report.summary()).await;
                Ok(report)
            }
            Err(e) => {
                let report = self.report();
                error!(
                    error = %e,
                    state = %report.state,
                    successes = report.successes,
                    "Reading session failed"
                );
                let message = format!(
                    "Reading session failed after {} progress reports: {}",
                    report.successes, e
                );
                self.notifier.notify(&message).await;
                Err(e)
            }
        }
    }

    /// Current snapshot of the run.
    pub fn report(&self) -> SessionReport {
        let counters = &self.context.counters;
        let progress = self.context.progress.state();
        SessionReport {
            state: self.state(),
            successes: counters.successes,
            failures: counters.total_failures,
            refreshes: counters.refreshes,
            elapsed_secs: self.started.map(|s| s.elapsed().as_secs()).unwrap_or(0),
            percent_complete: progress.percent_complete,
            chapter_index: progress.chapter_index,
        }
    }

    async fn drive(&mut self) -> EngineResult<()> {
        if self.config.preflight {
            self.preflight().await?;
        }

        while self.scheduler.remaining_attempts() > 0 {
            match self.submit().await {
                Ok(()) => self.on_success().await?,
                Err(e) if e.is_transient() => self.on_failure(e).await?,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn preflight(&mut self) -> EngineResult<()> {
        match self.submit().await {
            Ok(()) => {
                info!("Preflight report accepted");
                Ok(())
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Preflight report failed, renewing session first");
                self.transition(SessionMachineInput::SubmitRejected)?;
                self.recovery_cycle().await
            }
            Err(e) => Err(e),
        }
    }

    /// Stamp, seal and submit the current payload.
    async fn submit(&mut self) -> EngineResult<()> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let nonce = self.rng.gen_range(0..=NONCE_MAX);

        let context = &mut self.context;
        context.progress.apply_to(&mut context.payload);
        context
            .payload
            .stamp(now_ms, nonce, &self.config.endpoints.signing_secret);
        context.payload.seal();
        let body = context.payload.to_wire();
        context.payload.strip_digest();

        let request =
            OutboundRequest::post(&self.config.endpoints.read_url, &context.credentials, body?);
        let response = self.transport.send(request).await?;

        if !response.is_ok() {
            return Err(EngineError::TransportRejected {
                status: response.status,
            });
        }

        let accepted = response
            .json()
            .map(|body| body.get(&self.config.endpoints.success_marker).is_some())
            .unwrap_or(false);
        if accepted {
            Ok(())
        } else {
            Err(EngineError::AuthExpired)
        }
    }

    async fn on_success(&mut self) -> EngineResult<()> {
        self.transition(SessionMachineInput::SubmitSucceeded)?;

        let counters = &mut self.context.counters;
        counters.consecutive_failures = 0;
        counters.retry_count = 0;
        counters.failures_since_success = 0;
        counters.successes += 1;
        let attempt_index = counters.attempt_index;
        let successes = counters.successes;

        let Some(wait) = self.scheduler.next_wait(&mut self.rng) else {
            return Ok(());
        };

        if self.context.progress.should_turn(&mut self.rng)
            && self.context.progress.turn_page(attempt_index, &mut self.rng)
        {
            debug!(
                attempt = attempt_index,
                percent = self.context.progress.state().percent_complete,
                chapter = self.context.progress.state().chapter_index,
                "Page turned"
            );
        }

        info!(
            attempt = attempt_index,
            remaining = self.scheduler.remaining_attempts(),
            wait_secs = wait.as_secs(),
            "Progress report accepted"
        );
        tokio::time::sleep(wait).await;
        self.context.counters.attempt_index += 1;

        let every = self.config.retry.preventive_refresh_every;
        if every > 0 && successes % every == 0 && self.scheduler.remaining_attempts() > 0 {
            self.preventive_refresh().await?;
        }
        Ok(())
    }

    async fn on_failure(&mut self, error: EngineError) -> EngineResult<()> {
        let policy = self.config.retry.clone();
        let counters = &mut self.context.counters;
        counters.consecutive_failures += 1;
        counters.failures_since_success += 1;
        counters.total_failures += 1;
        let attempt_index = counters.attempt_index;
        let failures = counters.failures_since_success;

        warn!(
            error = %error,
            attempt = attempt_index,
            consecutive_failures = counters.consecutive_failures,
            failures_since_success = failures,
            "Progress report failed"
        );

        if failures > policy.max_failures {
            self.transition(SessionMachineInput::RetryExhausted)?;
            return Err(EngineError::RetryExhausted(failures));
        }

        if self.context.counters.consecutive_failures >= policy.drift_reset_threshold {
            info!("Resetting payload to session start after repeated failures");
            self.context.reset_drift();
            self.transition(SessionMachineInput::DriftReset)?;
            return Ok(());
        }

        // Transport failures say nothing about the page turn
        if matches!(error, EngineError::AuthExpired)
            && self.context.progress.rollback_if_recent(attempt_index)
        {
            debug!(attempt = attempt_index, "Rolled back last page turn");
            self.transition(SessionMachineInput::RolledBack)?;
            return Ok(());
        }

        self.transition(SessionMachineInput::SubmitRejected)?;
        self.recovery_cycle().await
    }

    /// Refresh until success or the retry ceiling, backing off in between.
    async fn recovery_cycle(&mut self) -> EngineResult<()> {
        loop {
            match self.refresher.recover(&mut self.context.credentials).await {
                Ok(_) => {
                    self.context.counters.retry_count = 0;
                    self.context.counters.refreshes += 1;
                    self.transition(SessionMachineInput::RefreshSucceeded)?;
                    return Ok(());
                }
                Err(e) => {
                    self.context.counters.retry_count += 1;
                    let retry_count = self.context.counters.retry_count;
                    warn!(error = %e, retry_count, "Session renewal failed");

                    if retry_count >= self.config.retry.max_refresh_retries {
                        self.transition(SessionMachineInput::RefreshExhausted)?;
                        return Err(EngineError::RefreshExhausted(retry_count));
                    }

                    self.transition(SessionMachineInput::RefreshFailed)?;
                    let jitter: f64 = self.rng.gen();
                    let delay = self.config.retry.backoff_delay(retry_count, jitter);
                    debug!(delay_ms = delay.as_millis() as u64, "Backing off before renewal");
                    tokio::time::sleep(delay).await;
                    self.transition(SessionMachineInput::BackoffElapsed)?;
                }
            }
        }
    }

    /// Scheduled renewal. Failure is logged and the session carries on.
    async fn preventive_refresh(&mut self) -> EngineResult<()> {
        self.transition(SessionMachineInput::PreventiveRefresh)?;
        match self.refresher.refresh(&mut self.context.credentials).await {
            Ok(_) => {
                self.context.counters.refreshes += 1;
                self.transition(SessionMachineInput::RefreshSucceeded)?;
            }
            Err(e) => {
                warn!(error = %e, "Preventive renewal failed, deferring");
                self.transition(SessionMachineInput::RefreshDeferred)?;
            }
        }
        Ok(())
    }

    fn transition(&mut self, input: SessionMachineInput) -> EngineResult<SessionState> {
        let old_state = SessionState::from(self.fsm.state());

        self.fsm.consume(&input).map_err(|_| {
            EngineError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.fsm.state()
            ))
        })?;

        let new_state = SessionState::from(self.fsm.state());
        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
        }
        Ok(new_state)
    }
}
