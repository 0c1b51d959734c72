//! Endpoint normalization
//!
//! Users may type a bare host, `host:port` or a full URL. [`Endpoint::normalize`]
//! turns any of these into the absolute URL of the server's MCP entry point.

use std::fmt;
use url::Url;

/// Path every MCP endpoint ends with
pub const PROTOCOL_SUFFIX: &str = "/mcp";

/// Port assumed when the address names only a host
pub const DEFAULT_PORT: u16 = 8030;

/// Canonical absolute MCP endpoint URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Normalize a free-form address
    ///
    /// Pure string transformation; never fails. Applying it to its own output
    /// returns that output unchanged.
    #[must_use]
    pub fn normalize(address: &str) -> Self {
        if address.starts_with("http://") || address.starts_with("https://") {
            let base = trim_trailing_slashes(address);
            if base.ends_with(PROTOCOL_SUFFIX) {
                return Self(base.to_string());
            }
            return Self(format!("{base}{PROTOCOL_SUFFIX}"));
        }

        if address.contains(':') {
            let base = trim_trailing_slashes(address);
            return Self(format!("http://{base}{PROTOCOL_SUFFIX}"));
        }

        Self(format!("http://{address}:{DEFAULT_PORT}{PROTOCOL_SUFFIX}"))
    }

    /// The endpoint URL as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `host:port` to open a socket to, if the URL can be parsed
    ///
    /// The port falls back to the scheme's default when the URL omits it.
    #[must_use]
    pub fn socket_addr_hint(&self) -> Option<String> {
        let url = Url::parse(&self.0).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(format!("{host}:{port}"))
    }
}

/// Strip every trailing `/`, never eating into a `scheme://` prefix
fn trim_trailing_slashes(address: &str) -> &str {
    let floor = address.find("://").map_or(0, |at| at + 3);
    let trimmed = address.trim_end_matches('/');
    if trimmed.len() < floor {
        &address[..floor]
    } else {
        trimmed
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
