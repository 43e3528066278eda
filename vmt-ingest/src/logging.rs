//! Logging setup for the binary
//!
//! The log level and log file come from the TOML config, but loading that
//! config logs too (a missing file is a warning). Config loading therefore
//! runs under a temporary stderr subscriber, and the global subscriber is
//! installed once the config is known.

use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use vmt_common::config::{load_toml_config, TomlConfig};
use vmt_common::{Error, Result};

/// Load the bootstrap config with its own log output going to stderr
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter_or("info"))
        .with_writer(std::io::stderr)
        .finish();
    load_config_with(explicit, bootstrap)
}

/// Load the bootstrap config while `subscriber` collects its log output
pub fn load_config_with<S>(explicit: Option<&Path>, subscriber: S) -> Result<TomlConfig>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber, || load_toml_config(explicit))
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init_tracing(config: &TomlConfig) -> Result<()> {
    let level = &config.logging.level;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(&format!("vmt_ingest={level},vmt_common={level}")));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {}", path.display(), e))
                })?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

fn env_filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// In-memory log sink
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capturing_subscriber(logs: &CapturedLogs) -> impl Subscriber + Send + Sync + 'static {
        let sink = logs.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }

    #[test]
    fn test_missing_config_file_warning_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.toml");
        let logs = CapturedLogs::default();

        let config = load_config_with(Some(&missing), capturing_subscriber(&logs)).unwrap();

        assert_eq!(config.database_file(), "vmt.db");
        let text = logs.text();
        assert!(text.contains("WARN"), "{}", text);
        assert!(text.contains("Config file not found"), "{}", text);
    }

    #[test]
    fn test_loaded_config_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let logs = CapturedLogs::default();

        let config = load_config_with(Some(&path), capturing_subscriber(&logs)).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(logs.text().contains("Loaded configuration"));
    }
}
