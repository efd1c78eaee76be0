use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::AppResult;
use crate::error::AppError;
use crate::feedback::FeedbackItem;

/// Parse a JSON array of feedback, rejecting blank texts and duplicate ids.
pub fn parse_feedback(raw: &str) -> AppResult<Vec<FeedbackItem>> {
    let jd = &mut serde_json::Deserializer::from_str(raw);
    let items: Vec<FeedbackItem> = match serde_path_to_error::deserialize(jd) {
        Ok(items) => items,
        Err(e) => {
            error!("Failed to parse feedback at path: {}", e.path());
            return Err(e.into_inner().into());
        }
    };

    let mut ids = HashSet::with_capacity(items.len());
    for item in &items {
        if item.text.trim().is_empty() {
            return Err(AppError::Other(format!("feedback {} has no text", item.id)));
        }
        if !ids.insert(item.id.as_str()) {
            return Err(AppError::Other(format!("duplicate feedback id {}", item.id)));
        }
    }
    Ok(items)
}

/// Read feedback items from a JSON file.
#[tracing::instrument(name = "Reading feedback", level = "debug")]
pub async fn read_feedback<P: AsRef<Path> + std::fmt::Debug>(
    input: P,
) -> AppResult<Vec<FeedbackItem>> {
    let raw = fs::read_to_string(input).await?;
    let items = parse_feedback(&raw)?;
    debug!("Read {} feedback items", items.len());
    Ok(items)
}

/// Write `obj` as pretty JSON to `output`, or to stdout when no path is given.
#[tracing::instrument(name = "Saving output", level = "debug", skip(obj))]
pub async fn write_json_output<P: AsRef<Path> + std::fmt::Debug, S: Serialize>(
    output: Option<P>,
    obj: &S,
) -> AppResult<()> {
    let mut data = serde_json::to_string_pretty(obj)?;
    data.push('\n');
    match output {
        Some(path) => write_file(path, data).await,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(data.as_bytes()).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

/// Write raw string data to a file, overwriting any existing content.
async fn write_file<P: AsRef<Path> + std::fmt::Debug>(output: P, data: String) -> AppResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(output)
        .await?;
    file.write_all(data.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
