//! Session behaviour against a scripted transport

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use vdbctl_mcp::{
    CallRequest, DatabaseRecord, DomainErrorKind, Endpoint, ErrorKind, HandshakeState, McpError,
    Phase, RawReply, Session, Transport, TransportFault,
};

/// What the scripted transport does for one call
enum Step {
    Reply(Result<RawReply, TransportFault>),
    Hang,
    Panic,
}

#[derive(Default)]
struct Counters {
    initialize: AtomicUsize,
    close: AtomicUsize,
    calls: Mutex<Vec<CallRequest>>,
}

struct ScriptedTransport {
    init_result: Option<TransportFault>,
    steps: VecDeque<Step>,
    counters: Arc<Counters>,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                init_result: None,
                steps: steps.into(),
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }

    fn replying(replies: Vec<RawReply>) -> (Self, Arc<Counters>) {
        Self::new(replies.into_iter().map(|r| Step::Reply(Ok(r))).collect())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn initialize(&mut self) -> Result<(), TransportFault> {
        self.counters.initialize.fetch_add(1, Ordering::SeqCst);
        match self.init_result.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    async fn call(&mut self, request: &CallRequest) -> Result<RawReply, TransportFault> {
        self.counters.calls.lock().unwrap().push(request.clone());
        match self.steps.pop_front() {
            Some(Step::Reply(result)) => result,
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportFault::Failed("unreachable".into()))
            }
            Some(Step::Panic) => panic!("transport invariant violated"),
            None => Err(TransportFault::Failed("connection closed by peer".into())),
        }
    }

    async fn close(&mut self) -> Result<(), TransportFault> {
        self.counters.close.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn session(transport: ScriptedTransport) -> Session<ScriptedTransport> {
    Session::with_transport(
        Endpoint::normalize("localhost"),
        Duration::from_secs(10),
        transport,
    )
}

fn text(s: &str) -> RawReply {
    RawReply::Text(s.into())
}

#[tokio::test]
async fn test_handshake_runs_once_before_first_call() {
    let (transport, counters) = ScriptedTransport::replying(vec![
        text("No vector databases are currently active"),
        text("[]"),
    ]);
    let mut session = session(transport);
    assert_eq!(session.handshake_state(), HandshakeState::NotInitialized);
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 0);

    assert_ok!(session.list_databases().await);
    assert_ok!(session.list_databases().await);

    assert_eq!(session.handshake_state(), HandshakeState::Ready);
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
    session.close().await;
}

#[tokio::test]
async fn test_unused_session_never_handshakes() {
    let (transport, counters) = ScriptedTransport::replying(vec![]);
    let mut session = session(transport);
    session.close().await;
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 0);
    assert_eq!(counters.close.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_handshake_is_protocol_error_and_retried() {
    let (mut transport, counters) = ScriptedTransport::replying(vec![text("[]")]);
    transport.init_result = Some(TransportFault::Rejected("unsupported version".into()));
    let mut session = session(transport);

    let err = session.list_databases().await.unwrap_err();
    match err {
        McpError::Protocol { phase, .. } => assert_eq!(phase, Phase::Initialize),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.handshake_state(), HandshakeState::NotInitialized);
    assert!(counters.calls.lock().unwrap().is_empty());

    assert_ok!(session.list_databases().await);
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_handshake_connectivity_failure_is_transport_error() {
    let (mut transport, _counters) = ScriptedTransport::replying(vec![]);
    transport.init_result = Some(TransportFault::Failed(
        "error sending request for url (http://localhost:8030/mcp)".into(),
    ));
    let mut session = session(transport);

    let err = session.list_databases().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("localhost:8030"));
}

#[tokio::test]
async fn test_list_databases_decodes_prose_wrapped_listing() {
    let (transport, counters) = ScriptedTransport::replying(vec![text(
        "Available vector databases:\n[{\"name\":\"docs\",\"type\":\"chroma\",\"collection_name\":\"main\",\"document_count\":3}]",
    )]);
    let mut session = session(transport);

    let databases = session.list_databases().await.unwrap();
    assert_eq!(
        databases,
        vec![DatabaseRecord::new("docs", "chroma", Some("main".into()), 3)]
    );

    let calls = counters.calls.lock().unwrap();
    assert_eq!(calls[0].name(), "list_vector_databases");
    assert!(calls[0].arguments().is_empty());
}

#[tokio::test]
async fn test_list_databases_requires_structure() {
    let (transport, _counters) =
        ScriptedTransport::replying(vec![text("The server is warming up")]);
    let mut session = session(transport);

    let err = session.list_databases().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.to_string().contains("list_vector_databases"));
}

#[tokio::test]
async fn test_database_exists_scans_listing() {
    let (transport, _counters) = ScriptedTransport::replying(vec![
        RawReply::Structured(json!([{"name": "x", "type": "chroma"}])),
        RawReply::Structured(json!([])),
        RawReply::Structured(json!([{"name": "X", "type": "chroma"}])),
    ]);
    let mut session = session(transport);

    assert!(session.database_exists("x").await.unwrap());
    assert!(!session.database_exists("x").await.unwrap());
    assert!(!session.database_exists("x").await.unwrap());
}

#[tokio::test]
async fn test_collection_exists_scans_listing() {
    let (transport, counters) = ScriptedTransport::replying(vec![
        text("Collections: [\"main\", \"archive\"]"),
        text("No collections found"),
    ]);
    let mut session = session(transport);

    assert!(session.collection_exists("docs", "archive").await.unwrap());
    assert!(!session.collection_exists("docs", "archive").await.unwrap());
    assert_eq!(
        counters.calls.lock().unwrap()[0].arguments()["database"],
        json!("docs")
    );
}

#[tokio::test]
async fn test_create_database_reports_missing_collection() {
    let (transport, _counters) = ScriptedTransport::replying(vec![text(
        "Failed: Collection 'foo' not found in vector database 'bar'",
    )]);
    let mut session = session(transport);

    let err = session
        .create_database("bar", "chroma", "foo")
        .await
        .unwrap_err();
    let app = err.as_application().expect("application error");
    assert_eq!(
        app.kind(),
        &DomainErrorKind::CollectionNotFound {
            collection: "foo".into(),
            database: "bar".into(),
        }
    );
    assert_eq!(err.to_string(), "collection 'foo' not found in database 'bar'");
}

#[tokio::test]
async fn test_tool_error_text_is_application_error() {
    let (transport, _counters) = ScriptedTransport::replying(vec![text(
        "Error calling tool 'search': {\"detail\": \"index missing\"}",
    )]);
    let mut session = session(transport);

    let err = session.search("docs", "rust", 5, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert!(err.as_application().unwrap().message().contains("index missing"));
}

#[tokio::test]
async fn test_tool_flagged_error_carries_server_message() {
    let (transport, _counters) = ScriptedTransport::replying(vec![RawReply::ToolError(
        "Collection 'foo' not found in vector database 'bar'".into(),
    )]);
    let mut session = session(transport);

    let err = session.create_collection("bar", "foo").await.unwrap_err();
    let app = err.as_application().unwrap();
    assert_eq!(
        app.message(),
        "Collection 'foo' not found in vector database 'bar'"
    );
    assert!(app.is_collection_not_found());
}

#[tokio::test]
async fn test_write_document_sends_argument_bag() {
    let (transport, counters) =
        ScriptedTransport::replying(vec![text("Document 'notes' written")]);
    let mut session = session(transport);

    assert_ok!(
        session
            .write_document(
                "docs",
                "main",
                "notes",
                std::path::Path::new("/tmp/notes.md"),
                Some("minilm"),
            )
            .await
    );

    let calls = counters.calls.lock().unwrap();
    assert_eq!(calls[0].name(), "write_document");
    assert_eq!(
        serde_json::Value::Object(calls[0].arguments().clone()),
        json!({
            "database": "docs",
            "collection": "main",
            "document_name": "notes",
            "file_path": "/tmp/notes.md",
            "embedding": "minilm",
        })
    );
}

#[tokio::test]
async fn test_search_returns_text_verbatim() {
    let results = "Top results:\n1. intro.md (0.92)\n2. setup.md (0.81)";
    let (transport, counters) = ScriptedTransport::replying(vec![text(results)]);
    let mut session = session(transport);

    assert_eq!(
        session.search("docs", "install", 2, Some("main")).await.unwrap(),
        results
    );
    let calls = counters.calls.lock().unwrap();
    assert_eq!(calls[0].arguments()["limit"], json!(2));
    assert_eq!(calls[0].arguments()["collection"], json!("main"));
}

#[tokio::test]
async fn test_remote_rejection_of_call_is_protocol_error() {
    let (transport, _counters) = ScriptedTransport::new(vec![Step::Reply(Err(
        TransportFault::Rejected("Unknown tool: delete_document".into()),
    ))]);
    let mut session = session(transport);

    let err = session
        .delete_document("docs", "main", "notes")
        .await
        .unwrap_err();
    match err {
        McpError::Protocol { phase, message } => {
            assert_eq!(phase, Phase::Call);
            assert!(message.contains("Unknown tool"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_deadline_expiry_is_transport_error() {
    let (transport, counters) = ScriptedTransport::new(vec![Step::Hang]);
    let mut session = Session::with_transport(
        Endpoint::normalize("localhost"),
        Duration::from_millis(50),
        transport,
    );

    let err = tokio::time::timeout(Duration::from_secs(5), session.list_databases())
        .await
        .expect("deadline must interrupt the call")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(session.is_expired());

    session.close().await;
    assert_eq!(counters.close.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transport_panic_is_contained() {
    let (transport, _counters) = ScriptedTransport::new(vec![Step::Panic]);
    let mut session = session(transport);

    let err = session.query("docs", "why", 3, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.to_string().contains("invariant"));
}

#[tokio::test]
async fn test_close_is_idempotent_and_blocks_further_calls() {
    let (transport, counters) = ScriptedTransport::replying(vec![text("[]")]);
    let mut session = session(transport);

    assert_ok!(session.list_databases().await);
    session.close().await;
    session.close().await;
    assert_eq!(counters.close.load(Ordering::SeqCst), 1);
    assert!(session.is_closed());

    let err = assert_err!(session.list_databases().await);
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_describe_database() {
    let (transport, _counters) = ScriptedTransport::replying(vec![RawReply::Structured(
        json!({"name": "docs", "type": "qdrant", "collection": "main", "count": 9}),
    )]);
    let mut session = session(transport);

    let record = session.describe_database("docs").await.unwrap();
    assert_eq!(record.db_type(), "qdrant");
    assert_eq!(record.collection(), Some("main"));
    assert_eq!(record.document_count(), 9);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_real_server_listing() {
    let endpoint = vdbctl_mcp::resolve_endpoint(&vdbctl_mcp::EndpointSources::gather(
        None,
        std::path::Path::new(".env"),
    ));
    let mut session = Session::open(endpoint, Duration::from_secs(30))
        .await
        .expect("server should be running");
    let result = session.list_databases().await;
    session.close().await;
    assert!(result.is_ok());
}
