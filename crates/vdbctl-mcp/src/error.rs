//! Error types for MCP client operations
//!
//! Every failure surfaced by a [`Session`](crate::Session) is one of four kinds:
//! transport, protocol, application or decode. Application errors keep the
//! server's message verbatim and additionally expose a best-effort structured
//! reading of the well-known phrases the server uses.

use crate::endpoint::Endpoint;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// MCP client errors
#[derive(Debug, Error)]
pub enum McpError {
    /// Server unreachable, connection dropped mid-call, or session deadline exceeded
    #[error("server could not be reached at {endpoint}; ensure it is running and accessible")]
    Transport {
        /// Normalized endpoint the session was bound to
        endpoint: String,
    },

    /// Handshake failed or the server rejected the call envelope
    #[error("protocol error during {phase}: {message}")]
    Protocol {
        /// Phase that failed
        phase: Phase,
        /// Failure description reported by the transport
        message: String,
    },

    /// The remote tool ran and reported a domain-level failure
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// The reply arrived but does not have the shape the operation requires
    #[error("could not decode reply from '{operation}': {snippet}")]
    Decode {
        /// Tool name that produced the reply
        operation: String,
        /// Leading part of the unparsed payload
        snippet: String,
    },
}

impl McpError {
    /// Build the user-facing transport error for `endpoint`
    #[must_use]
    pub fn transport(endpoint: &Endpoint) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
        }
    }

    /// Build a decode error with a bounded preview of `payload`
    #[must_use]
    pub fn decode(operation: &str, payload: &str) -> Self {
        Self::Decode {
            operation: operation.into(),
            snippet: preview(payload),
        }
    }

    /// Which of the four categories this error belongs to
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Application(_) => ErrorKind::Application,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// The application error, if this is one
    #[must_use]
    pub fn as_application(&self) -> Option<&ApplicationError> {
        match self {
            Self::Application(err) => Some(err),
            _ => None,
        }
    }
}

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`McpError::Transport`]
    Transport,
    /// See [`McpError::Protocol`]
    Protocol,
    /// See [`McpError::Application`]
    Application,
    /// See [`McpError::Decode`]
    Decode,
}

/// Protocol phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The one-time `initialize` exchange
    Initialize,
    /// A `tools/call` request
    Call,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => f.write_str("initialize"),
            Self::Call => f.write_str("call"),
        }
    }
}

/// Domain failure reported by a remote tool
///
/// `message` is exactly what the server sent. `kind` is extracted from it by
/// pattern matching and falls back to [`DomainErrorKind::Other`] when the
/// wording is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationError {
    message: String,
    kind: DomainErrorKind,
}

/// Structured reading of an application error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainErrorKind {
    /// `Collection '<c>' not found in vector database '<d>'`
    CollectionNotFound {
        /// Missing collection
        collection: String,
        /// Database that was searched
        database: String,
    },
    /// `Vector database '<d>' not found`
    DatabaseNotFound {
        /// Missing database
        database: String,
    },
    /// `'<n>' already exists`
    AlreadyExists {
        /// Name that clashed
        name: String,
    },
    /// Anything else
    Other,
}

// Matching on server wording is fragile; these follow the phrases the server
// currently emits.
static COLLECTION_NOT_FOUND: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)collection '([^']+)' not found in (?:vector )?database '([^']+)'").ok()
});
static DATABASE_NOT_FOUND: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:vector )?database '([^']+)' (?:not found|does not exist)").ok()
});
static ALREADY_EXISTS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"'([^']+)' already exists").ok());

static LEADING_FAILURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:\w+:\s*)?(?:",
        r"collection '[^']+' not found in (?:vector )?database '[^']+'",
        r"|(?:vector )?database '[^']+' (?:not found|does not exist)",
        r"|(?:(?:vector )?database |collection |document )?'[^']+' already exists",
        r")",
    ))
    .ok()
});

fn captures<'t>(re: &Option<Regex>, text: &'t str) -> Option<regex::Captures<'t>> {
    re.as_ref().and_then(|re| re.captures(text))
}

impl DomainErrorKind {
    /// Recognize a known failure phrase anywhere in `text`
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Some(caps) = captures(&COLLECTION_NOT_FOUND, text) {
            return Self::CollectionNotFound {
                collection: caps[1].to_string(),
                database: caps[2].to_string(),
            };
        }
        if let Some(caps) = captures(&DATABASE_NOT_FOUND, text) {
            return Self::DatabaseNotFound {
                database: caps[1].to_string(),
            };
        }
        if let Some(caps) = captures(&ALREADY_EXISTS, text) {
            return Self::AlreadyExists {
                name: caps[1].to_string(),
            };
        }
        Self::Other
    }
}

impl DomainErrorKind {
    /// Recognize a failure phrase that `text` opens with
    ///
    /// A single status label such as `Failed:` may precede the phrase.
    /// Success messages may mention a clashing name in passing, so only a
    /// reply that leads with the phrase counts.
    #[must_use]
    pub fn leading(text: &str) -> Option<Self> {
        let found = LEADING_FAILURE.as_ref()?.find(text)?;
        Some(Self::parse(found.as_str()))
    }
}

impl ApplicationError {
    /// Wrap a server message, classifying it
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = DomainErrorKind::parse(&message);
        Self { message, kind }
    }

    /// Verbatim server message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured classification
    #[must_use]
    pub fn kind(&self) -> &DomainErrorKind {
        &self.kind
    }

    /// True when the server said a collection does not exist
    #[must_use]
    pub fn is_collection_not_found(&self) -> bool {
        matches!(self.kind, DomainErrorKind::CollectionNotFound { .. })
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DomainErrorKind::CollectionNotFound {
                collection,
                database,
            } => write!(
                f,
                "collection '{collection}' not found in database '{database}'"
            ),
            DomainErrorKind::DatabaseNotFound { database } => {
                write!(f, "database '{database}' not found")
            }
            DomainErrorKind::AlreadyExists { .. } | DomainErrorKind::Other => {
                f.write_str(&self.message)
            }
        }
    }
}

impl std::error::Error for ApplicationError {}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, McpError>;

const PREVIEW_CHARS: usize = 200;

fn preview(payload: &str) -> String {
    let mut snippet: String = payload.chars().take(PREVIEW_CHARS).collect();
    if payload.chars().nth(PREVIEW_CHARS).is_some() {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_not_found_is_extracted() {
        let err = ApplicationError::new(
            "Error: Collection 'foo' not found in vector database 'bar'",
        );
        assert_eq!(
            err.kind(),
            &DomainErrorKind::CollectionNotFound {
                collection: "foo".into(),
                database: "bar".into(),
            }
        );
        assert!(err.is_collection_not_found());
        assert_eq!(
            err.to_string(),
            "collection 'foo' not found in database 'bar'"
        );
        assert!(err.message().starts_with("Error: Collection"));
    }

    #[test]
    fn test_database_not_found_is_extracted() {
        let err = ApplicationError::new("ValueError: Vector database 'docs' not found");
        assert_eq!(
            err.kind(),
            &DomainErrorKind::DatabaseNotFound {
                database: "docs".into()
            }
        );
    }

    #[test]
    fn test_already_exists_keeps_verbatim_message() {
        let err = ApplicationError::new("Error: Collection 'main' already exists");
        assert_eq!(
            err.kind(),
            &DomainErrorKind::AlreadyExists {
                name: "main".into()
            }
        );
        assert_eq!(err.to_string(), "Error: Collection 'main' already exists");
    }

    #[test]
    fn test_leading_failure_phrase() {
        assert_eq!(
            DomainErrorKind::leading("Collection 'foo' not found in vector database 'bar'"),
            Some(DomainErrorKind::CollectionNotFound {
                collection: "foo".into(),
                database: "bar".into(),
            })
        );
        assert_eq!(
            DomainErrorKind::leading("Vector database 'docs' already exists"),
            Some(DomainErrorKind::AlreadyExists {
                name: "docs".into()
            })
        );
        assert_eq!(
            DomainErrorKind::leading(
                "Collection 'main' created; database 'docs' already exists, reused"
            ),
            None
        );
        assert!(DomainErrorKind::leading("Failed: Vector database 'x' not found").is_some());
        assert_eq!(DomainErrorKind::leading("Created 'docs'"), None);
    }

    #[test]
    fn test_unknown_wording_is_other() {
        let err = ApplicationError::new("Exception: disk full");
        assert_eq!(err.kind(), &DomainErrorKind::Other);
        assert_eq!(McpError::from(err).kind(), ErrorKind::Application);
    }

    #[test]
    fn test_transport_message_names_endpoint() {
        let err = McpError::transport(&Endpoint::normalize("localhost"));
        let text = err.to_string();
        assert!(text.contains("localhost:8030"));
        assert!(text.ends_with("ensure it is running and accessible"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_decode_snippet_is_bounded() {
        let payload = "x".repeat(500);
        match McpError::decode("list_vector_databases", &payload) {
            McpError::Decode { operation, snippet } => {
                assert_eq!(operation, "list_vector_databases");
                assert_eq!(snippet.len(), PREVIEW_CHARS + 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_protocol_message_names_phase() {
        let err = McpError::Protocol {
            phase: Phase::Initialize,
            message: "unsupported version".into(),
        };
        assert_eq!(
            err.to_string(),
            "protocol error during initialize: unsupported version"
        );
    }
}
