use crate::collector::{LogCollector, LEVEL_ENV_VAR};
use crate::core::{QueryLogError, Result};
use crate::level::SeverityLevel;
use crate::sink::{TracingSink, WriterSink, DEFAULT_PREFIX};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    pub level: Option<SeverityLevel>,
    pub prefix: Option<String>,
    pub sink: Option<SinkKind>,
}

/// Which sink a configured collector writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Stdout,
    Tracing,
}

impl FromStr for Config {
    type Err = QueryLogError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.log.validate()?;
        Ok(config)
    }
}

impl LogConfig {
    fn validate(&self) -> Result<()> {
        if self.sink == Some(SinkKind::Tracing) && self.prefix.is_some() {
            return Err(QueryLogError::Config(
                "prefix only applies to the stdout sink".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies the configured level and sink to `collector`.
    pub fn apply(&self, collector: &LogCollector) {
        if let Some(level) = self.level {
            collector.set_level(level);
        }
        match (self.sink, &self.prefix) {
            (Some(SinkKind::Tracing), _) => collector.set_sink(Arc::new(TracingSink)),
            (_, Some(prefix)) => {
                collector.set_sink(Arc::new(WriterSink::new(std::io::stdout(), prefix.clone())))
            }
            (Some(SinkKind::Stdout), None) => collector.set_sink(Arc::new(WriterSink::new(
                std::io::stdout(),
                DEFAULT_PREFIX,
            ))),
            (None, None) => {}
        }
    }

    /// Like [`apply`](Self::apply), but a recognized level in the environment
    /// variable wins over the configured one.
    pub fn apply_with_env(&self, collector: &LogCollector, env_value: Option<&str>) {
        self.apply(collector);
        if let Some(level) = env_value.and_then(|v| v.parse::<SeverityLevel>().ok()) {
            tracing::debug!(%level, "{} overrides configured level", LEVEL_ENV_VAR);
            collector.set_level(level);
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = querylog::config::load_config("querylog.toml").expect("Failed to load config");
/// config.log.apply(querylog::log());
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    content.parse()
}

/// `<user config dir>/querylog/config.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("querylog").join("config.toml"))
}
