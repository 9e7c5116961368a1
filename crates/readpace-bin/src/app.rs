//! Command implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use push_notify::PushNotifier;
use rand::rngs::StdRng;
use rand::SeedableRng;
use session_config::{Bootstrap, Config, Paths};
use session_engine::{
    redact, signer, Notifier, PacingScheduler, ReqwestTransport, SessionContext, SessionEngine,
    SessionReport, Transport,
};
use tracing::{info, warn};

/// Command-line overrides applied on top of file and environment config.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Target reading time in minutes
    #[arg(long, global = true)]
    pub minutes: Option<i64>,

    /// Send a fixed number of progress reports instead of a fixed duration
    #[arg(long, global = true, conflicts_with = "minutes")]
    pub attempts: Option<u64>,

    /// Seed for pacing, nonces and jitter
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Skip the preflight submission
    #[arg(long, global = true)]
    pub no_preflight: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(minutes) = self.minutes {
            config.read_minutes = minutes;
            config.read_attempts = None;
        }
        if let Some(attempts) = self.attempts {
            config.read_attempts = Some(attempts);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if self.no_preflight {
            config.preflight = false;
        }
    }
}

/// Run one reading session until it completes, fails or is interrupted.
pub async fn run_session(config: &Config) -> anyhow::Result<SessionReport> {
    let boot = Bootstrap::from_config(config)?;
    info!(
        source = ?boot.source,
        cookies = boot.credentials.cookies.len(),
        session_key = %boot.credentials.session_key().map(redact).unwrap_or_else(|| "none".into()),
        push = boot.push.is_enabled(),
        "Session bootstrapped"
    );

    let transport: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::new(boot.engine.request_timeout())
            .context("failed to create HTTP transport")?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(PushNotifier::new(boot.push)?);
    let context = SessionContext::new(
        boot.credentials,
        boot.payload,
        boot.engine.progress.clone(),
    );
    let mut engine = SessionEngine::new(boot.engine, context, transport, notifier);

    tokio::select! {
        result = engine.run() => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning reading session");
            bail!("reading session interrupted")
        }
    }
}

/// The waits a run with this configuration would use, one line each.
pub fn plan_lines(config: &Config) -> Vec<String> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut scheduler = PacingScheduler::new(config.pacing_mode(), &mut rng);
    let planned = scheduler.planned_attempts();

    let mut lines = Vec::with_capacity(planned as usize + 1);
    let mut index = 0;
    while let Some(wait) = scheduler.next_wait(&mut rng) {
        index += 1;
        let total = scheduler.elapsed().as_secs();
        lines.push(format!(
            "{index:>4}  wait {:>3}s  at {:>3}:{:02}",
            wait.as_secs(),
            total / 60,
            total % 60
        ));
    }
    let total = scheduler.elapsed().as_secs();
    lines.insert(
        0,
        format!(
            "{planned} progress reports over {}:{:02}",
            total / 60,
            total % 60
        ),
    );
    lines
}

/// Rolling-hash digest of `input`.
pub fn sign(input: &str) -> String {
    signer::rolling_hash(input)
}

/// Write `config` to the config file, refusing to replace one unless
/// `force` is set.
pub fn init_config(config: &Config, paths: &Paths, force: bool) -> anyhow::Result<PathBuf> {
    let path = paths.config_file();
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save(paths)?;
    Ok(path)
}
