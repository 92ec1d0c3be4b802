use crate::logging::{parse_level, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub memo: MemoConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Check arity and kinds before dispatch
    #[serde(default = "default_true")]
    pub validate_arguments: bool,

    /// Open a trace span around every proxy call
    #[serde(default = "default_false")]
    pub trace_calls: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoConfig {
    /// Maximum number of cached results; unbounded when absent or zero
    #[serde(default)]
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default = "default_false")]
    pub span_events: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            validate_arguments: true,
            trace_calls: false,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            filter: None,
            span_events: false,
        }
    }
}

impl LoggingSection {
    pub fn to_log_config(&self) -> LogConfig {
        let config = LogConfig::new()
            .with_level(parse_level(&self.level))
            .with_format(self.format)
            .with_span_events(self.span_events);

        match &self.filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Find and load `.interposerc` from the current directory or its parents
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    pub fn discover_from(start: &Path) -> Self {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for name in [".interposerc", ".interposerc.toml"] {
                let config_path = dir.join(name);
                if config_path.exists() {
                    if let Ok(config) = Self::load(&config_path) {
                        return config;
                    }
                }
            }

            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }
}
