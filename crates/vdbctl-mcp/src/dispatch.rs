//! Call dispatch and failure classification
//!
//! [`run_guarded`] is the single boundary every transport operation passes
//! through: it applies the session deadline, turns panics from the transport
//! library into transport errors, and classifies transport faults.

use crate::endpoint::Endpoint;
use crate::error::{McpError, Phase, Result};
use crate::session::{Deadline, Session};
use crate::transport::{CallRequest, RawReply, Transport, TransportFault};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Lower-cased fragments that identify a failure as a connectivity problem
///
/// The transport only reports failures as text, so this list is the taxonomy.
const TRANSPORT_MARKERS: [&str; 14] = [
    "connection refused",
    "connection reset",
    "connection closed",
    "dns error",
    "failed to lookup address",
    "timed out",
    "timeout",
    "deadline",
    "network is unreachable",
    "broken pipe",
    "transport closed",
    "error sending request",
    "channel closed",
    "tcp connect error",
];

/// Whether `description` reads like a network/transport failure
pub(crate) fn is_transport_failure(description: &str) -> bool {
    let lowered = description.to_lowercase();
    TRANSPORT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn classify_fault(endpoint: &Endpoint, phase: Phase, fault: TransportFault) -> McpError {
    match fault {
        TransportFault::Rejected(message) => {
            warn!(%phase, "Server rejected request: {}", message);
            McpError::Protocol { phase, message }
        }
        TransportFault::Failed(description) if is_transport_failure(&description) => {
            debug!(%phase, cause = %description, "Transport failure talking to {}", endpoint);
            McpError::transport(endpoint)
        }
        TransportFault::Failed(message) => {
            warn!(%phase, "Unclassified transport failure: {}", message);
            McpError::Protocol { phase, message }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Drive one transport operation under the session deadline
///
/// Deadline expiry and panics map to [`McpError::Transport`]; faults are
/// classified by [`classify_fault`].
pub(crate) async fn run_guarded<F, O>(
    endpoint: &Endpoint,
    deadline: &Deadline,
    phase: Phase,
    operation: F,
) -> Result<O>
where
    F: Future<Output = std::result::Result<O, TransportFault>>,
{
    let guarded = AssertUnwindSafe(operation).catch_unwind();

    match deadline.race(guarded).await {
        None => {
            warn!(%phase, "Session deadline exceeded talking to {}", endpoint);
            Err(McpError::transport(endpoint))
        }
        Some(Err(payload)) => {
            error!(
                %phase,
                panic = panic_message(&*payload),
                "Transport panicked talking to {}", endpoint
            );
            Err(McpError::transport(endpoint))
        }
        Some(Ok(Err(fault))) => Err(classify_fault(endpoint, phase, fault)),
        Some(Ok(Ok(output))) => Ok(output),
    }
}

impl<T: Transport> Session<T> {
    /// Send a tool call, performing the handshake first if needed
    ///
    /// # Errors
    /// Returns [`McpError::Transport`] for connectivity failures, deadline
    /// expiry, transport panics or a closed session, and [`McpError::Protocol`]
    /// when the server rejects the handshake or the call envelope
    pub async fn dispatch(&mut self, request: CallRequest) -> Result<RawReply> {
        self.ensure_usable()?;
        self.ensure_handshake().await?;

        let started = Instant::now();
        debug!(operation = request.name(), "Dispatching tool call");

        let reply = run_guarded(
            &self.endpoint,
            &self.deadline,
            Phase::Call,
            self.transport.call(&request),
        )
        .await;

        debug!(
            operation = request.name(),
            elapsed = ?started.elapsed(),
            ok = reply.is_ok(),
            "Tool call finished"
        );
        reply
    }
}
