use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Manage vector databases through their MCP server.
#[derive(Parser, Debug)]
#[command(name = "vdbctl", version, about = "Manage vector databases through an MCP server")]
pub struct CliArgs {
    /// Server address: host, host:port or URL (overrides VDBCTL_SERVER and .env)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Path to config file (default: ~/.vdbctl/vdbctl.toml and ./vdbctl.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text where the result is structured
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List databases
    List,
    /// Show one database
    Info { name: String },
    /// Check whether a database exists
    Exists { name: String },
    /// Create a database
    Create {
        name: String,
        /// Backend type
        #[arg(long = "type", default_value = "chroma")]
        db_type: String,
        /// Collection to bind the database to
        #[arg(long)]
        collection: String,
    },
    /// Delete a database
    Delete { name: String },
    /// List collections in a database
    Collections { database: String },
    /// Create a collection
    CreateCollection { database: String, collection: String },
    /// Check whether a collection exists
    CollectionExists { database: String, collection: String },
    /// Write a file into a collection
    Write {
        database: String,
        collection: String,
        file: PathBuf,
        /// Document name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Embedding model
        #[arg(long)]
        embedding: Option<String>,
    },
    /// Delete a document
    DeleteDocument {
        database: String,
        collection: String,
        name: String,
    },
    /// List documents in a collection
    Documents { database: String, collection: String },
    /// Semantic search
    Search {
        database: String,
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: u32,
        #[arg(long)]
        collection: Option<String>,
    },
    /// Ask a question against a database
    Query {
        database: String,
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: u32,
        #[arg(long)]
        collection: Option<String>,
    },
}
