use crate::cli::Command;
use anyhow::{Context, Result};
use vdbctl_mcp::{DatabaseRecord, Session};

fn print_records(records: &[DatabaseRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else if records.is_empty() {
        println!("No vector databases are currently active");
    } else {
        for record in records {
            println!("{record}");
        }
    }
    Ok(())
}

fn print_names(names: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(names)?);
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}

/// Run one command against an open session
pub async fn run(session: &mut Session, command: &Command, json: bool) -> Result<()> {
    match command {
        Command::List => print_records(&session.list_databases().await?, json)?,
        Command::Info { name } => {
            let record = session.describe_database(name).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{record}");
            }
        }
        Command::Exists { name } => println!("{}", session.database_exists(name).await?),
        Command::Create {
            name,
            db_type,
            collection,
        } => {
            session.create_database(name, db_type, collection).await?;
            println!("Created database '{name}'");
        }
        Command::Delete { name } => {
            session.delete_database(name).await?;
            println!("Deleted database '{name}'");
        }
        Command::Collections { database } => {
            print_names(&session.list_collections(database).await?, json)?;
        }
        Command::CreateCollection {
            database,
            collection,
        } => {
            session.create_collection(database, collection).await?;
            println!("Created collection '{collection}' in '{database}'");
        }
        Command::CollectionExists {
            database,
            collection,
        } => println!("{}", session.collection_exists(database, collection).await?),
        Command::Write {
            database,
            collection,
            file,
            name,
            embedding,
        } => {
            let doc_name = match name {
                Some(name) => name.clone(),
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .with_context(|| format!("cannot derive a document name from {}", file.display()))?,
            };
            session
                .write_document(database, collection, &doc_name, file, embedding.as_deref())
                .await?;
            println!("Wrote '{doc_name}' to '{database}/{collection}'");
        }
        Command::DeleteDocument {
            database,
            collection,
            name,
        } => {
            session.delete_document(database, collection, name).await?;
            println!("Deleted '{name}' from '{database}/{collection}'");
        }
        Command::Documents {
            database,
            collection,
        } => println!("{}", session.list_documents(database, collection).await?),
        Command::Search {
            database,
            query,
            limit,
            collection,
        } => println!(
            "{}",
            session
                .search(database, query, *limit, collection.as_deref())
                .await?
        ),
        Command::Query {
            database,
            query,
            limit,
            collection,
        } => println!(
            "{}",
            session
                .query(database, query, *limit, collection.as_deref())
                .await?
        ),
    }
    Ok(())
}
