use serde::Deserialize;
use std::path::{Path, PathBuf};
use vdbctl_mcp::McpConfig;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_log_format() -> String {
    "text".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Global config path: ~/.vdbctl/vdbctl.toml
    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".vdbctl").join("vdbctl.toml"))
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.vdbctl/vdbctl.toml (optional)
    /// 2. Local override: ./vdbctl.toml (optional)
    /// 3. Explicit `--config` file (required when given)
    /// 4. Environment variables with `VDBCTL__` prefix (highest priority)
    ///
    /// The server address is not part of this config; it is resolved
    /// separately from the `--server` flag, `VDBCTL_SERVER` and `.env`.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(global) = Self::global_config_path() {
            builder = builder.add_source(config::File::from(global).required(false));
        }

        builder = builder.add_source(config::File::with_name("vdbctl").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("VDBCTL").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        Ok(config)
    }
}
