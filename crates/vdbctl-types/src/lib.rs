//! vdbctl Types - Core value types shared between the MCP client and its callers
//!
//! This module defines the records decoded from vector database server replies.

#![deny(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector database known to the server
///
/// Produced by decoding list/describe replies and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    name: String,
    #[serde(rename = "type", alias = "db_type", alias = "backend", default)]
    db_type: String,
    #[serde(alias = "collection_name", default)]
    collection: Option<String>,
    #[serde(alias = "count", alias = "documents", default)]
    document_count: u64,
}

impl DatabaseRecord {
    /// Create a record
    pub fn new(
        name: impl Into<String>,
        db_type: impl Into<String>,
        collection: Option<String>,
        document_count: u64,
    ) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            collection,
            document_count,
        }
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend type, e.g. `chroma` or `qdrant`
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    /// Default collection, when the server reports one
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> u64 {
        self.document_count
    }
}

impl fmt::Display for DatabaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) collection={} documents={}",
            self.name,
            self.db_type,
            self.collection.as_deref().unwrap_or("-"),
            self.document_count
        )
    }
}
