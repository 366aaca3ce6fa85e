//! Structured logging setup for hosts embedding the monitor.
//!
//! The monitor itself only emits `tracing` events; hosts that do not already
//! install a subscriber can use [`init_logging`] to get a sensible one with
//! env-filter support and optional JSON output.

use once_cell::sync::OnceCell;
use tracing::Level;

/// Configuration for the monitor's logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for the application.
    pub level: Level,
    /// Log level for loss-guard components specifically.
    pub monitor_level: Level,
    /// Whether to use JSON output format.
    pub json_format: bool,
    /// Environment filter override.
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            monitor_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration for production use.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            monitor_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Creates a configuration for development use.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            monitor_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    /// Sets the log level for the application.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the log level for loss-guard components.
    pub fn with_monitor_level(mut self, level: Level) -> Self {
        self.monitor_level = level;
        self
    }

    /// Sets whether to use JSON output format.
    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// Sets a custom environment filter.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},loss_guard={}",
                self.level.as_str().to_lowercase(),
                self.monitor_level.as_str().to_lowercase()
            )
        }
    }
}

static INIT: OnceCell<()> = OnceCell::new();

/// Initializes structured logging for the process.
///
/// The `RUST_LOG` environment variable overrides the configured filter.
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    INIT.get_or_try_init(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.monitor_level, Level::DEBUG);
        assert!(!config.json_format);
        assert_eq!(config.env_filter(), "info,loss_guard=debug");
    }

    #[test]
    fn test_logging_config_production() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.monitor_level, Level::INFO);
        assert!(config.json_format);
        assert_eq!(config.env_filter(), "warn,loss_guard=info");
    }

    #[test]
    fn test_env_filter_override() {
        let config = LoggingConfig::default().with_env_filter("loss_guard=trace");
        assert_eq!(config.env_filter(), "loss_guard=trace");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LoggingConfig::development()).unwrap();
        init_logging(LoggingConfig::production()).unwrap();
    }
}
