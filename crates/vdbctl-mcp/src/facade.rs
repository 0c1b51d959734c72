//! Typed operations for the vector database server
//!
//! Each method builds the argument bag for one remote tool, dispatches it, and
//! projects the normalized reply into a concrete type. Existence checks are
//! answered from the corresponding listing since the server has no dedicated
//! endpoint for them.

use crate::error::{ApplicationError, DomainErrorKind, McpError, Result};
use crate::normalize::{expect_structured, expect_text};
use crate::session::Session;
use crate::transport::{CallRequest, RawReply, Transport};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};
use vdbctl_types::DatabaseRecord;

/// Remote tool names
pub mod tools {
    /// List all databases
    pub const LIST_DATABASES: &str = "list_vector_databases";
    /// Describe one database
    pub const DESCRIBE_DATABASE: &str = "get_vector_database_info";
    /// Create a database bound to a collection
    pub const CREATE_DATABASE: &str = "create_vector_database";
    /// Drop a database
    pub const DELETE_DATABASE: &str = "delete_vector_database";
    /// List collections of a database
    pub const LIST_COLLECTIONS: &str = "list_collections";
    /// Create a collection
    pub const CREATE_COLLECTION: &str = "create_collection";
    /// Ingest a document
    pub const WRITE_DOCUMENT: &str = "write_document";
    /// Remove a document
    pub const DELETE_DOCUMENT: &str = "delete_document";
    /// List documents of a collection
    pub const LIST_DOCUMENTS: &str = "list_documents";
    /// Semantic search
    pub const SEARCH: &str = "search";
    /// Question answering over a database
    pub const QUERY: &str = "query";
}

/// Decode a listing of database records
///
/// Accepts a bare array or an object wrapping it under `databases`.
fn decode_records(operation: &str, value: Value) -> Result<Vec<DatabaseRecord>> {
    let items = match value {
        Value::Object(mut map) => match map.remove("databases") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(items.clone()).map_err(|e| {
        debug!("Failed to decode {} reply: {}", operation, e);
        McpError::decode(operation, &items.to_string())
    })
}

/// Decode a single record, optionally wrapped under `database`
fn decode_record(operation: &str, value: Value) -> Result<DatabaseRecord> {
    let item = match value {
        Value::Object(mut map) => match map.remove("database") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("database".into(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(item.clone()).map_err(|e| {
        debug!("Failed to decode {} reply: {}", operation, e);
        McpError::decode(operation, &item.to_string())
    })
}

/// Decode collection names from strings or `{ "name": ... }` objects
fn decode_names(operation: &str, value: Value) -> Result<Vec<String>> {
    let items = match value {
        Value::Object(mut map) => map.remove("collections").unwrap_or(Value::Object(map)),
        other => other,
    };
    let Value::Array(entries) = items else {
        return Err(McpError::decode(operation, &items.to_string()));
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(name) => Ok(name),
            Value::Object(ref map) => match map.get("name") {
                Some(Value::String(name)) => Ok(name.clone()),
                _ => Err(McpError::decode(operation, &entry.to_string())),
            },
            other => Err(McpError::decode(operation, &other.to_string())),
        })
        .collect()
}

/// Accept an acknowledgement reply
///
/// Besides error markers, acknowledgements that open with a known failure
/// phrase (for example a missing collection) are rejected as application
/// errors.
fn expect_ack(operation: &str, reply: RawReply) -> Result<String> {
    let text = expect_text(reply)?;
    if DomainErrorKind::leading(&text).is_some() {
        return Err(ApplicationError::new(text).into());
    }
    debug!("{} acknowledged: {}", operation, text);
    Ok(text)
}

impl<T: Transport> Session<T> {
    /// List all databases known to the server
    ///
    /// # Errors
    /// Fails with [`McpError::Decode`] when the reply has no record listing
    pub async fn list_databases(&mut self) -> Result<Vec<DatabaseRecord>> {
        let reply = self
            .dispatch(CallRequest::new(tools::LIST_DATABASES))
            .await?;
        match expect_structured(tools::LIST_DATABASES, reply)? {
            Some(value) => decode_records(tools::LIST_DATABASES, value),
            None => Ok(Vec::new()),
        }
    }

    /// Describe one database
    ///
    /// # Errors
    /// Fails when the database is unknown or the reply is not a record
    pub async fn describe_database(&mut self, name: &str) -> Result<DatabaseRecord> {
        let reply = self
            .dispatch(CallRequest::new(tools::DESCRIBE_DATABASE).arg("name", name))
            .await?;
        match expect_structured(tools::DESCRIBE_DATABASE, reply)? {
            Some(value) => decode_record(tools::DESCRIBE_DATABASE, value),
            None => Err(McpError::decode(tools::DESCRIBE_DATABASE, "")),
        }
    }

    /// Whether a database named exactly `name` exists
    ///
    /// # Errors
    /// Propagates failures of [`Session::list_databases`]
    pub async fn database_exists(&mut self, name: &str) -> Result<bool> {
        let databases = self.list_databases().await?;
        Ok(databases.iter().any(|db| db.name() == name))
    }

    /// Create a database of backend `db_type` bound to `collection`
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses, e.g. the
    /// name is taken
    pub async fn create_database(
        &mut self,
        name: &str,
        db_type: &str,
        collection: &str,
    ) -> Result<()> {
        let reply = self
            .dispatch(
                CallRequest::new(tools::CREATE_DATABASE)
                    .arg("name", name)
                    .arg("db_type", db_type)
                    .arg("collection", collection),
            )
            .await?;
        expect_ack(tools::CREATE_DATABASE, reply)?;
        info!("Created database '{}' ({})", name, db_type);
        Ok(())
    }

    /// Delete a database
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the database does not exist
    pub async fn delete_database(&mut self, name: &str) -> Result<()> {
        let reply = self
            .dispatch(CallRequest::new(tools::DELETE_DATABASE).arg("name", name))
            .await?;
        expect_ack(tools::DELETE_DATABASE, reply)?;
        info!("Deleted database '{}'", name);
        Ok(())
    }

    /// Collection names in `database`
    ///
    /// # Errors
    /// Fails with [`McpError::Decode`] when the reply is not a name listing
    pub async fn list_collections(&mut self, database: &str) -> Result<Vec<String>> {
        let reply = self
            .dispatch(CallRequest::new(tools::LIST_COLLECTIONS).arg("database", database))
            .await?;
        match expect_structured(tools::LIST_COLLECTIONS, reply)? {
            Some(value) => decode_names(tools::LIST_COLLECTIONS, value),
            None => Ok(Vec::new()),
        }
    }

    /// Whether `database` has a collection named exactly `collection`
    ///
    /// # Errors
    /// Propagates failures of [`Session::list_collections`]
    pub async fn collection_exists(&mut self, database: &str, collection: &str) -> Result<bool> {
        let collections = self.list_collections(database).await?;
        Ok(collections.iter().any(|name| name == collection))
    }

    /// Create a collection in `database`
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses
    pub async fn create_collection(&mut self, database: &str, collection: &str) -> Result<()> {
        let reply = self
            .dispatch(
                CallRequest::new(tools::CREATE_COLLECTION)
                    .arg("database", database)
                    .arg("collection", collection),
            )
            .await?;
        expect_ack(tools::CREATE_COLLECTION, reply)?;
        info!("Created collection '{}' in '{}'", collection, database);
        Ok(())
    }

    /// Ingest the file at `file_path` as document `doc_name`
    ///
    /// `embedding` selects the embedding model; the server default is used
    /// when `None`.
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses, e.g. the
    /// collection is missing
    pub async fn write_document(
        &mut self,
        database: &str,
        collection: &str,
        doc_name: &str,
        file_path: &Path,
        embedding: Option<&str>,
    ) -> Result<()> {
        let reply = self
            .dispatch(
                CallRequest::new(tools::WRITE_DOCUMENT)
                    .arg("database", database)
                    .arg("collection", collection)
                    .arg("document_name", doc_name)
                    .arg("file_path", file_path.to_string_lossy().into_owned())
                    .opt_arg("embedding", embedding),
            )
            .await?;
        expect_ack(tools::WRITE_DOCUMENT, reply)?;
        info!("Wrote document '{}' to '{}/{}'", doc_name, database, collection);
        Ok(())
    }

    /// Remove document `doc_name`
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses
    pub async fn delete_document(
        &mut self,
        database: &str,
        collection: &str,
        doc_name: &str,
    ) -> Result<()> {
        let reply = self
            .dispatch(
                CallRequest::new(tools::DELETE_DOCUMENT)
                    .arg("database", database)
                    .arg("collection", collection)
                    .arg("document_name", doc_name),
            )
            .await?;
        expect_ack(tools::DELETE_DOCUMENT, reply)?;
        info!("Deleted document '{}' from '{}/{}'", doc_name, database, collection);
        Ok(())
    }

    /// Human-readable document listing for a collection
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses
    pub async fn list_documents(&mut self, database: &str, collection: &str) -> Result<String> {
        let reply = self
            .dispatch(
                CallRequest::new(tools::LIST_DOCUMENTS)
                    .arg("database", database)
                    .arg("collection", collection),
            )
            .await?;
        expect_text(reply)
    }

    /// Semantic search; returns the server's formatted results
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses
    pub async fn search(
        &mut self,
        database: &str,
        query: &str,
        limit: u32,
        collection: Option<&str>,
    ) -> Result<String> {
        self.text_query(tools::SEARCH, database, query, limit, collection)
            .await
    }

    /// Question answering over a database; returns the server's answer text
    ///
    /// # Errors
    /// Fails with [`McpError::Application`] when the server refuses
    pub async fn query(
        &mut self,
        database: &str,
        query: &str,
        limit: u32,
        collection: Option<&str>,
    ) -> Result<String> {
        self.text_query(tools::QUERY, database, query, limit, collection)
            .await
    }

    async fn text_query(
        &mut self,
        tool: &str,
        database: &str,
        query: &str,
        limit: u32,
        collection: Option<&str>,
    ) -> Result<String> {
        let reply = self
            .dispatch(
                CallRequest::new(tool)
                    .arg("database", database)
                    .arg("query", query)
                    .arg("limit", limit)
                    .opt_arg("collection", collection),
            )
            .await?;
        expect_text(reply)
    }
}
