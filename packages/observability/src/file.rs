//! JSONL file output.
//!
//! Appends one JSON object per line to the log file, flushing after every
//! write so `tail -f` sees complete lines.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `~/.readpace/logs/readpace.jsonl`, if a home directory is known.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".readpace").join("logs").join("readpace.jsonl"))
}

/// Shared append-only writer.
#[derive(Clone)]
pub struct AppendWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl AppendWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for AppendWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for AppendWriter {
    type Writer = AppendWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the JSONL layer plus the optional stderr layer.
pub(crate) fn init_file_subscriber(config: &LogConfig) -> io::Result<PathBuf> {
    let log_path = match config.log_path.clone().or_else(default_log_path) {
        Some(path) => path,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine home directory for the log file",
            ))
        }
    };

    let writer = AppendWriter::new(&log_path)?;
    let json_layer = JsonLayer::new(config.service_name.clone(), writer)
        .with_redacted_fields(config.redacted_fields.iter().cloned());

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.stderr_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer.with_filter(env_filter(&config.default_level)))
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(log_path = %log_path.display(), "observability initialized");
    }
    Ok(log_path)
}
