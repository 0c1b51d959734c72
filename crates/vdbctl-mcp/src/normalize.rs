//! Reply normalization
//!
//! Tool replies come back structured, as plain text, as prose wrapping a JSON
//! fragment, or as error prose. These functions sort a [`RawReply`] into one of
//! those cases without touching the network.

use crate::error::{ApplicationError, McpError, Result};
use crate::transport::RawReply;
use serde_json::Value;

/// Substrings that mark a text reply as a tool failure
pub const ERROR_MARKERS: [&str; 4] = ["Error:", "Exception:", "ValueError:", "Error calling tool"];

/// Replies the server sends instead of an empty listing
pub const EMPTY_SENTINELS: [&str; 4] = [
    "No vector databases are currently active",
    "No collections found",
    "No documents found",
    "No results found",
];

/// Result of normalizing a reply
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Structured data, either sent as such or decoded from the text
    Structured(Value),
    /// Text with no decodable structure
    Text(String),
    /// An empty-result sentinel; carries the sentinel text
    Empty(String),
}

/// Normalize a reply
///
/// # Errors
/// Returns [`McpError::Application`] for tool-flagged errors and for text
/// replies that carry an error marker
pub fn normalize(reply: RawReply) -> Result<Decoded> {
    let text = match reply {
        RawReply::Structured(value) => return Ok(Decoded::Structured(value)),
        RawReply::ToolError(text) => return Err(ApplicationError::new(text).into()),
        RawReply::Text(text) => text,
    };

    check_application_error(&text)?;

    if is_empty_sentinel(&text) {
        return Ok(Decoded::Empty(text));
    }

    Ok(match decode_text(&text) {
        Some(value) => Decoded::Structured(value),
        None => Decoded::Text(text),
    })
}

/// Normalize a reply that `operation` needs as structured data
///
/// `Ok(None)` means the server reported an empty result.
///
/// # Errors
/// Returns [`McpError::Application`] for error replies and [`McpError::Decode`]
/// when no structure can be recovered
pub fn expect_structured(operation: &str, reply: RawReply) -> Result<Option<Value>> {
    match normalize(reply)? {
        Decoded::Structured(value) => Ok(Some(value)),
        Decoded::Empty(_) => Ok(None),
        Decoded::Text(text) => Err(McpError::decode(operation, &text)),
    }
}

/// Normalize a reply meant for display
///
/// Text comes back verbatim, even when it embeds JSON; structured replies are
/// pretty-printed.
///
/// # Errors
/// Returns [`McpError::Application`] for tool-flagged errors and when the text
/// carries an error marker
pub fn expect_text(reply: RawReply) -> Result<String> {
    match reply {
        RawReply::ToolError(text) => Err(ApplicationError::new(text).into()),
        RawReply::Structured(value) => {
            Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
        }
        RawReply::Text(text) => {
            check_application_error(&text)?;
            Ok(text)
        }
    }
}

fn check_application_error(text: &str) -> std::result::Result<(), ApplicationError> {
    if ERROR_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Err(ApplicationError::new(text));
    }
    Ok(())
}

fn is_empty_sentinel(text: &str) -> bool {
    let trimmed = text.trim().trim_end_matches('.');
    EMPTY_SENTINELS.contains(&trimmed)
}

/// Decode everything from the first `[` or `{` on, else the whole text
///
/// Only trailing whitespace may follow the fragment; prose after it makes the
/// reply plain text.
fn decode_text(text: &str) -> Option<Value> {
    if let Some(start) = text.find(|c: char| c == '[' || c == '{') {
        if let Ok(value) = serde_json::from_str(&text[start..]) {
            return Some(value);
        }
    }
    serde_json::from_str(text).ok()
}
