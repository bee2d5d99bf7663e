use super::traits::{Channel, ChannelMessage, InboundEvent};
use crate::actions::upload::sanitize_file_name;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use uuid::Uuid;

/// Sender id used for every console line.
pub const CONSOLE_SENDER: &str = "console";

/// Local console channel: stdin lines in, stdout out.
///
/// Attachments are written to `save_dir` and announced by path. File
/// uploads cannot originate here.
pub struct CliChannel {
    save_dir: PathBuf,
}

impl CliChannel {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    fn line_to_message(line: &str) -> Option<ChannelMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(ChannelMessage::new(
            Uuid::new_v4().to_string(),
            "console",
            InboundEvent::TextCommand {
                raw_text: line.to_string(),
                sender_chat_id: CONSOLE_SENDER.to_string(),
            },
        ))
    }

    async fn save_attachment(&self, bytes: &[u8], file_name: &str) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.save_dir).await?;
        let path = self
            .save_dir
            .join(sanitize_file_name(file_name, "attachment"));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(
        &self,
        message: &str,
        _recipient: &str,
        _reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        println!("{message}");
        Ok(())
    }

    async fn send_document(
        &self,
        _recipient: &str,
        bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
        _reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        let path = self.save_attachment(&bytes, file_name).await?;
        println!(
            "[{}] {} ({} bytes)",
            caption.unwrap_or("Attachment"),
            path.display(),
            bytes.len()
        );
        Ok(())
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let mut lines = BufReader::new(io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let Some(msg) = Self::line_to_message(&line) else {
                continue;
            };
            if tx.send(msg).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cli_channel_name() {
        assert_eq!(CliChannel::new("out").name(), "console");
    }

    #[test]
    fn lines_become_text_commands() {
        let msg = CliChannel::line_to_message("  /cmd all ls -la \n").unwrap();
        assert_eq!(msg.channel, "console");
        assert_eq!(msg.sender(), CONSOLE_SENDER);
        assert_eq!(
            msg.event,
            InboundEvent::TextCommand {
                raw_text: "/cmd all ls -la".into(),
                sender_chat_id: CONSOLE_SENDER.into(),
            }
        );
        assert!(CliChannel::line_to_message("   ").is_none());
    }

    #[tokio::test]
    async fn cli_send_succeeds() {
        let ch = CliChannel::new("out");
        assert!(ch.send("hello", CONSOLE_SENDER, None).await.is_ok());
    }

    #[tokio::test]
    async fn attachments_are_saved_to_disk() {
        let tmp = TempDir::new().unwrap();
        let ch = CliChannel::new(tmp.path().join("received"));
        ch.send_photo(CONSOLE_SENDER, b"png".to_vec(), "screenshot.png", Some("Screenshot"), None)
            .await
            .unwrap();
        let saved = tmp.path().join("received").join("screenshot.png");
        assert_eq!(std::fs::read(saved).unwrap(), b"png");
    }

    #[tokio::test]
    async fn uploads_are_unsupported() {
        let ch = CliChannel::new("out");
        let err = ch.fetch_file("abc").await.unwrap_err();
        assert!(err.to_string().contains("does not support file uploads"));
    }
}
