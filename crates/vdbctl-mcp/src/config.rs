//! Configuration types for the MCP client
//!
//! Endpoint resolution takes every source as an explicit argument so callers
//! decide once per invocation and pass the result down.

use crate::endpoint::Endpoint;
use serde::Deserialize;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable (and `.env` key) naming the server address
pub const SERVER_ENV_VAR: &str = "VDBCTL_SERVER";

/// Address used when no source provides one
pub const DEFAULT_ADDRESS: &str = "localhost";

/// MCP client configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct McpConfig {
    /// Session deadline in seconds when a person is at the terminal
    #[serde(default = "default_interactive_timeout")]
    pub interactive_timeout: u64,

    /// Session deadline in seconds under CI or when input is piped
    #[serde(default = "default_automated_timeout")]
    pub automated_timeout: u64,
}

fn default_interactive_timeout() -> u64 {
    60
}

fn default_automated_timeout() -> u64 {
    15
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            interactive_timeout: default_interactive_timeout(),
            automated_timeout: default_automated_timeout(),
        }
    }
}

impl McpConfig {
    /// Session deadline for the given execution context
    #[must_use]
    pub fn deadline_for(&self, context: ExecutionContext) -> Duration {
        match context {
            ExecutionContext::Interactive => Duration::from_secs(self.interactive_timeout),
            ExecutionContext::Automated => Duration::from_secs(self.automated_timeout),
        }
    }
}

/// Whether a person is driving the invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A terminal session
    Interactive,
    /// CI, scripts and test runs
    Automated,
}

impl ExecutionContext {
    /// Automated when `CI` is set or stdin is not a terminal
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var_os("CI").is_some() || !std::io::stdin().is_terminal() {
            Self::Automated
        } else {
            Self::Interactive
        }
    }
}

/// Every place a server address can come from, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSources {
    /// Explicit command-line override
    pub flag: Option<String>,
    /// Value of [`SERVER_ENV_VAR`] in the process environment
    pub env: Option<String>,
    /// Value of [`SERVER_ENV_VAR`] in the local `.env` file
    pub dotenv: Option<String>,
}

impl EndpointSources {
    /// Collect sources from the process environment and the `.env` file at `dotenv_path`
    ///
    /// The `.env` file is read directly and never loaded into the process
    /// environment. A missing or unreadable file is treated as absent.
    pub fn gather(flag: Option<String>, dotenv_path: &Path) -> Self {
        Self {
            flag,
            env: std::env::var(SERVER_ENV_VAR).ok(),
            dotenv: read_dotenv_entry(dotenv_path, SERVER_ENV_VAR),
        }
    }

    /// The winning raw address; blank values count as absent
    #[must_use]
    pub fn address(&self) -> &str {
        [&self.flag, &self.env, &self.dotenv]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ADDRESS)
    }
}

/// Resolve the session endpoint from all address sources
#[must_use]
pub fn resolve_endpoint(sources: &EndpointSources) -> Endpoint {
    let endpoint = Endpoint::normalize(sources.address());
    debug!(%endpoint, "Resolved MCP endpoint");
    endpoint
}

fn read_dotenv_entry(path: &Path, key: &str) -> Option<String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No usable .env at {}: {}", path.display(), e);
            return None;
        }
    };

    entries
        .filter_map(std::result::Result::ok)
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}
