//! vdbctl MCP Client Library
//!
//! Client core for a vector database server that speaks MCP (Model Context
//! Protocol) over Streamable HTTP.
//!
//! ## Features
//!
//! - Endpoint normalization from bare hosts, `host:port` or full URLs
//! - Lazy, once-only MCP handshake on the first call
//! - Per-session execution deadline with a cancellable timer
//! - Four-kind error taxonomy: transport, protocol, application, decode
//! - Normalization of structured, textual and prose-wrapped JSON replies
//! - One typed method per server tool
//!
//! ```no_run
//! # async fn demo() -> vdbctl_mcp::Result<()> {
//! use std::time::Duration;
//! use vdbctl_mcp::{resolve_endpoint, EndpointSources, Session};
//!
//! let endpoint = resolve_endpoint(&EndpointSources::default());
//! let mut session = Session::open(endpoint, Duration::from_secs(30)).await?;
//! let result = session.list_databases().await;
//! session.close().await;
//! for db in result? {
//!     println!("{db}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, unused_imports, unused_variables, missing_docs)]

pub mod config;
mod dispatch;
pub mod endpoint;
pub mod error;
pub mod facade;
pub mod normalize;
pub mod session;
pub mod transport;

pub use config::{resolve_endpoint, EndpointSources, ExecutionContext, McpConfig};
pub use endpoint::Endpoint;
pub use error::{ApplicationError, DomainErrorKind, ErrorKind, McpError, Phase, Result};
pub use normalize::Decoded;
pub use session::{HandshakeState, Session};
pub use transport::{CallRequest, RawReply, RmcpTransport, Transport, TransportFault};
pub use vdbctl_types::DatabaseRecord;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        resolve_endpoint, DatabaseRecord, Endpoint, EndpointSources, ExecutionContext,
        McpConfig, McpError, Session,
    };
}
