//! Session handle and handshake coordination
//!
//! A [`Session`] owns one transport, an execution deadline and the handshake
//! state for a single invocation. Opening a session checks that the server
//! socket is reachable but does not speak MCP yet; the `initialize` exchange
//! runs on the first dispatched call and at most once.
//!
//! Sessions are not shared: every operation takes `&mut self`, so calls on one
//! session are strictly sequential. Callers must not move a session between
//! concurrently running tasks while an operation is in flight.

use crate::dispatch::run_guarded;
use crate::endpoint::Endpoint;
use crate::error::{McpError, Phase, Result};
use crate::transport::{RmcpTransport, Transport};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on how long closing the transport may take
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Handshake progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// `initialize` has not completed yet
    NotInitialized,
    /// `initialize` succeeded; tool calls may be sent
    Ready,
}

/// Execution deadline backed by a watchdog timer task
///
/// The watchdog cancels `token` when the deadline passes. Operations race
/// against the token, so expiry interrupts whatever is in flight.
pub(crate) struct Deadline {
    token: CancellationToken,
    watchdog: Option<JoinHandle<()>>,
}

impl Deadline {
    /// Start the timer; must be called inside a Tokio runtime
    fn start(duration: Duration) -> Self {
        let token = CancellationToken::new();
        let expiry = token.clone();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            debug!(?duration, "Session deadline elapsed");
            expiry.cancel();
        });
        Self {
            token,
            watchdog: Some(watchdog),
        }
    }

    /// Run `fut` until it finishes or the deadline passes (`None`)
    pub(crate) async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            output = fut => Some(output),
        }
    }

    fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the watchdog; returns whether it was still pending
    fn stop(&mut self) -> bool {
        match self.watchdog.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One client session with an MCP server
pub struct Session<T: Transport = RmcpTransport> {
    pub(crate) endpoint: Endpoint,
    pub(crate) transport: T,
    pub(crate) deadline: Deadline,
    handshake: HandshakeState,
    closed: bool,
}

impl Session<RmcpTransport> {
    /// Open a session to `endpoint` over the rmcp HTTP transport
    ///
    /// Verifies the server socket accepts connections within `deadline`, then
    /// binds the transport. The MCP handshake is deferred to the first call.
    ///
    /// # Errors
    /// Returns [`McpError::Transport`] if the host cannot be resolved, refuses
    /// the connection, or does not answer before the deadline
    pub async fn open(endpoint: Endpoint, deadline: Duration) -> Result<Self> {
        info!("Opening MCP session to {} (deadline {:?})", endpoint, deadline);
        let timer = Deadline::start(deadline);

        let Some(target) = endpoint.socket_addr_hint() else {
            warn!("Endpoint {} has no usable host", endpoint);
            return Err(McpError::transport(&endpoint));
        };

        match timer.race(TcpStream::connect(target.as_str())).await {
            Some(Ok(_probe)) => debug!("Server socket {} is reachable", target),
            Some(Err(e)) => {
                debug!(error = %e, "Connection probe to {} failed", target);
                return Err(McpError::transport(&endpoint));
            }
            None => {
                debug!("Connection probe to {} hit the session deadline", target);
                return Err(McpError::transport(&endpoint));
            }
        }

        let transport = RmcpTransport::new(&endpoint);
        Ok(Self::from_parts(endpoint, transport, timer))
    }
}

impl<T: Transport> Session<T> {
    /// Build a session over an already-constructed transport
    ///
    /// Starts the deadline timer; must be called inside a Tokio runtime.
    pub fn with_transport(endpoint: Endpoint, deadline: Duration, transport: T) -> Self {
        Self::from_parts(endpoint, transport, Deadline::start(deadline))
    }

    fn from_parts(endpoint: Endpoint, transport: T, deadline: Deadline) -> Self {
        Self {
            endpoint,
            transport,
            deadline,
            handshake: HandshakeState::NotInitialized,
            closed: false,
        }
    }

    /// Endpoint this session talks to
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current handshake state
    #[must_use]
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake
    }

    /// Whether [`Session::close`] has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the execution deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_expired()
    }

    /// Fail fast on a session that can no longer carry calls
    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.closed {
            debug!("Call attempted on closed session to {}", self.endpoint);
            return Err(McpError::transport(&self.endpoint));
        }
        Ok(())
    }

    /// Run the `initialize` exchange unless it already succeeded
    ///
    /// The state flips to [`HandshakeState::Ready`] only on success, so a
    /// failed handshake is retried by the next call.
    pub(crate) async fn ensure_handshake(&mut self) -> Result<()> {
        if self.handshake == HandshakeState::Ready {
            return Ok(());
        }

        debug!("Performing MCP handshake with {}", self.endpoint);
        run_guarded(
            &self.endpoint,
            &self.deadline,
            Phase::Initialize,
            self.transport.initialize(),
        )
        .await?;

        self.handshake = HandshakeState::Ready;
        info!("MCP handshake completed with {}", self.endpoint);
        Ok(())
    }

    /// Release the session
    ///
    /// Stops the deadline timer and closes the transport. Safe to call on a
    /// session that never completed its handshake; calling it again is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            debug!("Session to {} already closed", self.endpoint);
            return;
        }
        self.closed = true;

        if !self.deadline.stop() {
            debug!("Deadline timer was already stopped");
        }

        match tokio::time::timeout(CLOSE_GRACE, self.transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => warn!("Closing transport to {} failed: {}", self.endpoint, fault),
            Err(_) => warn!("Closing transport to {} timed out", self.endpoint),
        }
        self.handshake = HandshakeState::NotInitialized;
        info!("MCP session to {} closed", self.endpoint);
    }
}
