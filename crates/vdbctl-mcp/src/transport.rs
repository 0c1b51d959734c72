//! Transport seam between a [`Session`](crate::Session) and the wire
//!
//! [`Transport`] is the request/response primitive the session drives:
//! initialize once, call tools, close. [`RmcpTransport`] implements it over the
//! rmcp Streamable HTTP client; tests substitute scripted transports.

use crate::endpoint::Endpoint;
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
    ProtocolVersion,
};
use rmcp::service::{RoleClient, RunningService, ServiceError};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// A named tool invocation with its argument bag
///
/// Built with [`CallRequest::new`] and [`CallRequest::arg`]; immutable once
/// handed to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    name: String,
    arguments: Map<String, Value>,
}

impl CallRequest {
    /// Start a request for tool `name` with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    #[must_use]
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Add an argument only when `value` is present
    #[must_use]
    pub fn opt_arg(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.arg(key, value),
            None => self,
        }
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument bag
    #[must_use]
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }
}

/// Reply payload as received from the transport
#[derive(Debug, Clone, PartialEq)]
pub enum RawReply {
    /// Already-parsed structured content
    Structured(Value),
    /// Text content, possibly prose with embedded JSON or error markers
    Text(String),
    /// Text of a result the tool itself flagged as an error
    ToolError(String),
}

/// Failure reported by a transport
///
/// Transports only describe what went wrong; the session decides which
/// [`McpError`](crate::McpError) category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFault {
    /// The server answered with a JSON-RPC error for the envelope itself
    #[error("rejected by server: {0}")]
    Rejected(String),
    /// Any other failure, described as text
    #[error("{0}")]
    Failed(String),
}

/// Request/response primitive a session runs over
///
/// A session calls these strictly one at a time and never after `close`.
#[async_trait]
pub trait Transport: Send {
    /// Perform the protocol initialization exchange
    async fn initialize(&mut self) -> Result<(), TransportFault>;

    /// Invoke a tool and return its raw reply
    async fn call(&mut self, request: &CallRequest) -> Result<RawReply, TransportFault>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), TransportFault>;
}

/// Build the `ClientInfo` advertised during MCP initialization
fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "vdbctl".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            title: None,
            description: None,
            icons: None,
            website_url: None,
        },
        meta: None,
    }
}

/// rmcp Streamable HTTP transport
///
/// No network traffic happens until [`Transport::initialize`]; the running
/// rmcp service only exists between a successful initialize and close.
pub struct RmcpTransport {
    uri: String,
    service: Option<RunningService<RoleClient, ClientInfo>>,
}

impl RmcpTransport {
    /// Bind a transport to `endpoint`
    #[must_use]
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            uri: endpoint.to_string(),
            service: None,
        }
    }
}

#[async_trait]
impl Transport for RmcpTransport {
    async fn initialize(&mut self) -> Result<(), TransportFault> {
        debug!("Initializing MCP session with {}", self.uri);
        let transport = StreamableHttpClientTransport::from_uri(self.uri.clone());

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| TransportFault::Failed(e.to_string()))?;

        debug!("MCP session initialized with {}", self.uri);
        self.service = Some(service);
        Ok(())
    }

    async fn call(&mut self, request: &CallRequest) -> Result<RawReply, TransportFault> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| TransportFault::Failed("transport closed".into()))?;

        let result = service
            .peer()
            .call_tool(CallToolRequestParams {
                name: String::from(request.name()).into(),
                arguments: Some(request.arguments().clone()),
                meta: None,
                task: None,
            })
            .await
            .map_err(fault_from_service_error)?;

        Ok(reply_from_result(request.name(), result))
    }

    async fn close(&mut self) -> Result<(), TransportFault> {
        if let Some(service) = self.service.take() {
            let reason = service
                .cancel()
                .await
                .map_err(|e| TransportFault::Failed(e.to_string()))?;
            debug!(?reason, "MCP service stopped");
        }
        Ok(())
    }
}

fn fault_from_service_error(err: ServiceError) -> TransportFault {
    match err {
        ServiceError::McpError(data) => TransportFault::Rejected(data.message.to_string()),
        other => TransportFault::Failed(other.to_string()),
    }
}

/// Flatten a `CallToolResult` into a [`RawReply`]
///
/// Tool-reported errors keep the server's text untouched in
/// [`RawReply::ToolError`].
fn reply_from_result(tool_name: &str, result: CallToolResult) -> RawReply {
    let text = result
        .content
        .iter()
        .filter_map(|content| content.as_text())
        .map(|text| text.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        debug!(tool = tool_name, "Tool reported an error");
        return RawReply::ToolError(text);
    }

    match result.structured_content {
        Some(value) => RawReply::Structured(value),
        None => RawReply::Text(text),
    }
}
