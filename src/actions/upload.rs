use super::traits::ActionResult;
use crate::error::ActionError;
use std::path::{Path, PathBuf};

/// Default directory for received files, relative to the working directory.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Persists files sent to the channel. Uploads carry no target and are
/// accepted by whichever agent's transport session received them.
#[derive(Debug, Clone)]
pub struct UploadReceiver {
    dir: PathBuf,
}

impl UploadReceiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` and acknowledge with the local path.
    pub async fn receive(&self, file_id: &str, file_name: &str, bytes: &[u8]) -> ActionResult {
        match self.persist(file_id, file_name, bytes).await {
            Ok(path) => {
                tracing::info!("File uploaded successfully: {}", path.display());
                ActionResult::text(format!("File uploaded successfully: {}", path.display()))
            }
            Err(e) => {
                tracing::error!("Error in file upload: {e}");
                ActionResult::failure(e)
            }
        }
    }

    /// Write the payload under the uploads directory, creating it if needed.
    pub async fn persist(
        &self,
        file_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ActionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_file_name(file_name, file_id));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Reduce a client-supplied name to a bare file name that cannot leave the
/// uploads directory.
pub fn sanitize_file_name(raw: &str, file_id: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && *c != ':')
        .collect::<String>();
    let base = base.trim();

    if base.is_empty() || base.chars().all(|c| c == '.') {
        let id: String = file_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect();
        return format!("upload_{id}");
    }
    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::TextOutput;
    use tempfile::TempDir;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_file_name("report.pdf", "id"), "report.pdf");
        assert_eq!(sanitize_file_name("my notes.txt", "id"), "my notes.txt");
        assert_eq!(sanitize_file_name(".env", "id"), ".env");
    }

    #[test]
    fn traversal_is_reduced_to_basename() {
        assert_eq!(sanitize_file_name("../../etc/passwd", "id"), "passwd");
        assert_eq!(sanitize_file_name("/abs/path/x.sh", "id"), "x.sh");
        assert_eq!(sanitize_file_name("..\\..\\win.ini", "id"), "win.ini");
        assert_eq!(sanitize_file_name("C:evil.txt", "id"), "Cevil.txt");
    }

    #[test]
    fn degenerate_names_fall_back_to_file_id() {
        assert_eq!(sanitize_file_name("", "BQAC-12_x"), "upload_BQAC-12_x");
        assert_eq!(sanitize_file_name("..", "abc"), "upload_abc");
        assert_eq!(sanitize_file_name("dir/", "abc"), "upload_abc");
        assert_eq!(sanitize_file_name("a/../", "a/b"), "upload_ab");
    }

    #[tokio::test]
    async fn receive_creates_directory_and_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("uploads");
        let receiver = UploadReceiver::new(&dir);

        let result = receiver.receive("file-1", "hello.txt", b"hi there").await;
        let expected = dir.join("hello.txt");
        match result {
            ActionResult::Text(TextOutput { body, .. }) => {
                assert_eq!(
                    body,
                    format!("File uploaded successfully: {}", expected.display())
                );
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(std::fs::read(expected).unwrap(), b"hi there");
    }

    #[tokio::test]
    async fn traversal_stays_inside_uploads_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("uploads");
        let receiver = UploadReceiver::new(&dir);

        let path = receiver
            .persist("f", "../outside.txt", b"x")
            .await
            .unwrap();
        assert_eq!(path, dir.join("outside.txt"));
        assert!(!tmp.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn write_error_is_failure() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("uploads");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let receiver = UploadReceiver::new(&blocker);
        let result = receiver.receive("f", "a.txt", b"x").await;
        match result {
            ActionResult::Failure(err) => assert!(err.render().starts_with("Error: ")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
