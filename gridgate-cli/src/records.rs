//! Loading record sets from a file or the API.

use anyhow::{Context, Result, bail};
use gridgate_client::RequestPipeline;
use serde_json::Value as Json;
use std::path::Path;

use crate::session_hint;

/// Members that commonly hold the record list in a list response.
const LIST_MEMBERS: [&str; 3] = ["results", "data", "items"];

/// Extract the record list from a JSON document.
///
/// Accepts a bare array or an object holding the array under `results`,
/// `data`, or `items` (paginated list responses).
pub fn extract_records(document: Json) -> Result<Vec<Json>> {
    match document {
        Json::Array(records) => Ok(records),
        Json::Object(mut object) => {
            for member in LIST_MEMBERS {
                if let Some(Json::Array(records)) = object.remove(member) {
                    return Ok(records);
                }
            }
            bail!("expected a JSON array or an object with one of {:?}", LIST_MEMBERS)
        }
        other => bail!("expected a JSON array of records, got {}", kind_name(&other)),
    }
}

fn kind_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

pub fn load_file(path: &Path) -> Result<Vec<Json>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {:?}", path))?;
    let document: Json = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse records from {:?}", path))?;
    extract_records(document)
}

pub async fn load_remote(pipeline: &RequestPipeline, path: &str) -> Result<Vec<Json>> {
    let document: Json = match pipeline.get_json(path).await {
        Ok(document) => document,
        Err(e) if e.is_auth_expired() => return Err(session_hint(e)),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Failed to fetch records from {}", path)));
        }
    };
    tracing::debug!("Fetched records from {}", path);
    extract_records(document)
}
