use super::traits::{Action, ActionResult, BinaryOutput};
use crate::error::ActionError;
use crate::protocol::Verb;
use async_trait::async_trait;
use std::path::Path;

/// `/download <target> <path>`: send a local file back as an attachment.
pub struct DownloadAction;

#[async_trait]
impl Action for DownloadAction {
    fn verb(&self) -> Verb {
        Verb::Download
    }

    fn description(&self) -> &str {
        "Download a file from the machine"
    }

    async fn execute(&self, argument: Option<&str>) -> ActionResult {
        let path = argument.map(clean_path).unwrap_or_default();
        if path.is_empty() {
            tracing::warn!("Download command missing file path");
            return ActionResult::failure(ActionError::Usage(Verb::Download.usage()));
        }

        match read_regular_file(path).await {
            Ok(bytes) => {
                let file_name = Path::new(path)
                    .file_name()
                    .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().to_string());
                tracing::debug!("Read {} bytes from {path}", bytes.len());
                ActionResult::Binary(BinaryOutput::document(
                    bytes,
                    &file_name,
                    &format!("File: {path}"),
                ))
            }
            Err(e) => {
                tracing::warn!("Download of {path} failed: {e}");
                ActionResult::failure(e)
            }
        }
    }
}

/// Trim whitespace, then any surrounding double quotes, then single quotes.
fn clean_path(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'')
}

/// Anything that is not a readable regular file is "not found"; a regular
/// file that cannot be read reports the OS error.
async fn read_regular_file(path: &str) -> Result<Vec<u8>, ActionError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(tokio::fs::read(path).await?),
        _ => Err(ActionError::NotFound),
    }
}
