//! `tracing` subscriber setup.
//!
//! One output layer per sink (stderr, plus an optional append-only file), each
//! rendered as pretty text or JSON lines, under a shared [`EnvFilter`].
//! `RUST_LOG` wins over the configured level.
//!
//! Field names used across the crate: `laws`, `passages`, `dimension`,
//! `embedder`, `k`, `hits`, `elapsed_ms`, `query_len`. Query text itself is
//! never logged.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub use crate::config::LogFormat;

static INITIALIZED: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `[logging]` section of lexqa.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level (`warn`, `debug`, ...) or a full filter directive.
    pub level: String,
    pub format: LogFormat,
    /// Also append logs here, without ANSI colors.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open log file: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn filter_for(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(from_env) => Ok(from_env),
        Err(_) => EnvFilter::try_new(level).map_err(|_| LogError::InvalidLevel(level.to_string())),
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

/// A formatting layer writing `format` to `writer`.
pub(crate) fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(SystemTime)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
    }
}

/// Install the global subscriber. A second call fails with
/// [`LogError::AlreadyInitialized`].
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = filter_for(&config.level)?;
    let mut layers = vec![output_layer(
        config.format,
        io::stderr,
        io::stderr().is_terminal(),
    )];
    if let Some(path) = &config.file {
        let file = Arc::new(open_log_file(path)?);
        layers.push(output_layer(config.format, file, false));
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = INITIALIZED.set(());

    tracing::debug!(
        level = %config.level,
        format = %config.format,
        file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}

/// `info_span!` for lexqa operations; accepts the same field syntax.
///
/// ```ignore
/// let span = lexqa_core::lexqa_span!("build", laws = 3, embedder = %name);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! lexqa_span {
    ($name:expr) => {
        $crate::__tracing::info_span!($name)
    };
    ($name:expr, $($fields:tt)+) => {
        $crate::__tracing::info_span!($name, $($fields)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Shared in-memory sink.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture<F: FnOnce()>(format: LogFormat, level: &str, body: F) -> String {
        let sink = Capture::default();
        let subscriber = tracing_subscriber::registry()
            .with(output_layer(format, sink.clone(), false))
            .with(EnvFilter::new(level));
        tracing::subscriber::with_default(subscriber, body);
        sink.text()
    }

    #[test]
    fn defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
    }

    #[test]
    fn toml_section_fills_missing_keys() {
        let config: LogConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn bad_level_is_rejected() {
        // Skip when the environment supplies its own filter.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(matches!(
            filter_for("lexqa_core=notalevel"),
            Err(LogError::InvalidLevel(_))
        ));
        assert!(filter_for("lexqa_core=debug,warn").is_ok());
    }

    #[test]
    fn log_file_parent_is_created() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("nested").join("lexqa.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn json_lines_carry_fields() {
        let out = capture(LogFormat::Json, "info", || {
            tracing::info!(passages = 42u64, dimension = 384u64, "Knowledge base built");
        });
        let line = out.lines().find(|l| !l.trim().is_empty()).unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["passages"], 42);
        assert_eq!(value["message"], "Knowledge base built");
    }

    #[test]
    fn pretty_output_has_no_ansi_when_disabled() {
        let out = capture(LogFormat::Pretty, "info", || {
            tracing::info!(k = 3u64, "Query answered");
        });
        assert!(out.contains("Query answered"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn filter_drops_lower_levels() {
        let out = capture(LogFormat::Pretty, "warn", || {
            tracing::debug!("hidden");
            tracing::warn!("shown");
        });
        assert!(out.contains("shown"));
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn span_macro_fields_reach_json() {
        let out = capture(LogFormat::Json, "info", || {
            let span = crate::lexqa_span!("query", k = 3u64, embedder = %"fnv1a-hash-8");
            let _guard = span.enter();
            tracing::info!("inside");
        });
        assert!(out.contains("\"k\":3"), "{out}");
        assert!(out.contains("fnv1a-hash-8"), "{out}");
    }
}
