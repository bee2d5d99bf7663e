use super::traits::{Channel, ChannelMessage, InboundEvent};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

/// Telegram's maximum message length for text messages
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Byte offset of the first char that no longer fits in one message, or
/// `None` when all of `text` fits. Telegram counts UTF-16 code units.
fn telegram_window_end(text: &str) -> Option<usize> {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        units += c.len_utf16();
        if units > TELEGRAM_MAX_MESSAGE_LENGTH {
            return Some(idx);
        }
    }
    None
}

/// Split a message into chunks that respect Telegram's 4096 character limit.
/// Prefers a newline in the back half of the window, then a space.
fn split_message_for_telegram(message: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = message;

    loop {
        let Some(limit) = telegram_window_end(remaining) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let end = match window.rfind('\n') {
            Some(pos) if pos >= limit / 2 => pos + 1,
            _ => match window.rfind(' ') {
                Some(pos) if pos > 0 => pos + 1,
                _ => limit,
            },
        };

        chunks.push(remaining[..end].to_string());
        remaining = &remaining[end..];
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

/// Telegram channel — long-polls the Bot API for updates
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>, api_base: &str) -> Self {
        Self {
            bot_token,
            allowed_users,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, remote_path: &str) -> String {
        format!("{}/file/bot{}/{remote_path}", self.api_base, self.bot_token)
    }

    fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// Turn one `getUpdates` entry into an inbound event.
    ///
    /// Returns `None` for senders outside the allow-list and for messages
    /// that are neither text nor a document.
    fn parse_update(&self, update: &Value) -> Option<ChannelMessage> {
        let message = update.get("message")?;

        let username = message
            .get("from")
            .and_then(|f| f.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let user_id = message
            .get("from")
            .and_then(|f| f.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string());

        let mut identities = vec![username];
        if let Some(ref id) = user_id {
            identities.push(id.as_str());
        }

        if !self.is_any_user_allowed(identities.iter().copied()) {
            tracing::warn!(
                "Telegram: ignoring message from unauthorized user: username={username}, user_id={}. \
Add the @username or numeric user ID to telegram.allowed_users.",
                user_id.as_deref().unwrap_or("unknown")
            );
            return None;
        }

        let Some(chat_id) = message
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
        else {
            tracing::warn!("Telegram: missing chat_id in message, skipping");
            return None;
        };

        let message_id = message
            .get("message_id")
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_default();

        let event = if let Some(text) = message.get("text").and_then(Value::as_str) {
            InboundEvent::TextCommand {
                raw_text: text.to_string(),
                sender_chat_id: chat_id,
            }
        } else if let Some(document) = message.get("document") {
            let file_id = document.get("file_id").and_then(Value::as_str)?.to_string();
            let file_name = document
                .get("file_name")
                .and_then(Value::as_str)
                .map_or_else(|| format!("file_{file_id}"), str::to_string);
            InboundEvent::FileUpload {
                file_id,
                file_name,
                sender_chat_id: chat_id,
            }
        } else {
            tracing::debug!("Telegram: skipping message {message_id} with no text or document");
            return None;
        };

        Some(ChannelMessage::new(message_id, self.name(), event))
    }

    fn reply_parameters(reply_to: Option<&str>) -> Option<Value> {
        let message_id = reply_to?.parse::<i64>().ok()?;
        Some(serde_json::json!({
            "message_id": message_id,
            "allow_sending_without_reply": true,
        }))
    }

    async fn send_file(
        &self,
        method: &str,
        field: &str,
        chat_id: &str,
        file: (Vec<u8>, &str),
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        let (file_bytes, file_name) = file;
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }
        if let Some(reply) = Self::reply_parameters(reply_to) {
            form = form.text("reply_parameters", reply.to_string());
        }

        let resp = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram {method} failed: {err}");
        }

        tracing::info!("Telegram {field} sent to {chat_id}: {file_name}");
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(
        &self,
        message: &str,
        chat_id: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        let chunks = split_message_for_telegram(message);

        for (i, chunk) in chunks.iter().enumerate() {
            // Plain text only: command output must arrive byte-for-byte.
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == 0 {
                if let Some(reply) = Self::reply_parameters(reply_to) {
                    body["reply_parameters"] = reply;
                }
            }

            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&body)
                .send()
                .await
                .context("Telegram sendMessage request failed")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err = resp.text().await.unwrap_or_default();
                anyhow::bail!("Telegram sendMessage failed ({status}): {err}");
            }

            // Small delay between chunks to avoid rate limiting
            if i < chunks.len() - 1 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        tracing::debug!("Telegram message sent to {chat_id} ({} parts)", chunks.len());
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        self.send_file(
            "sendDocument",
            "document",
            chat_id,
            (bytes, file_name),
            caption,
            reply_to,
        )
        .await
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        self.send_file(
            "sendPhoto",
            "photo",
            chat_id,
            (bytes, file_name),
            caption,
            reply_to,
        )
        .await
    }

    /// `getFile` then download from the file endpoint.
    async fn fetch_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        let body = serde_json::json!({ "file_id": file_id });
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&body)
            .send()
            .await
            .context("Telegram getFile request failed")?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram getFile failed: {err}");
        }

        let data: Value = resp.json().await?;
        let remote_path = data
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Telegram getFile: missing file_path"))?;

        let file_resp = self.client.get(self.file_url(remote_path)).send().await?;
        if !file_resp.status().is_success() {
            anyhow::bail!("Telegram file download failed: {}", file_resp.status());
        }
        let bytes = file_resp.bytes().await?;

        tracing::info!("Telegram file downloaded: {file_id} ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for messages...");

        loop {
            let url = self.api_url("getUpdates");
            let body = serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"]
            });

            let resp = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            let data: Value = match resp.json().await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            if data.get("ok").and_then(Value::as_bool) == Some(false) {
                let description = data
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                anyhow::bail!("Telegram getUpdates rejected: {description}");
            }

            let Some(results) = data.get("result").and_then(Value::as_array) else {
                continue;
            };

            for update in results {
                // Advance offset past this update
                if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                    offset = uid + 1;
                }

                let Some(msg) = self.parse_update(update) else {
                    continue;
                };

                if tx.send(msg).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        let timeout_duration = Duration::from_secs(5);

        match tokio::time::timeout(
            timeout_duration,
            self.client.get(self.api_url("getMe")).send(),
        )
        .await
        {
            Ok(Ok(resp)) => resp.status().is_success(),
            Ok(Err(e)) => {
                tracing::debug!("Telegram health check failed: {e}");
                false
            }
            Err(_) => {
                tracing::debug!("Telegram health check timed out after 5s");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const API: &str = "https://api.telegram.org";
    /// Nothing listens on the discard port, so requests fail fast.
    const DEAD_API: &str = "http://127.0.0.1:9";

    fn open_channel() -> TelegramChannel {
        TelegramChannel::new("t".into(), vec!["*".into()], API)
    }

    #[test]
    fn telegram_channel_name() {
        assert_eq!(open_channel().name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        let ch = TelegramChannel::new("123:ABC".into(), vec![], API);
        assert_eq!(
            ch.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
        assert_eq!(
            ch.file_url("documents/file_1.txt"),
            "https://api.telegram.org/file/bot123:ABC/documents/file_1.txt"
        );
    }

    #[test]
    fn telegram_api_base_trailing_slash_is_trimmed() {
        let ch = TelegramChannel::new("1:A".into(), vec![], "http://localhost:8081/");
        assert_eq!(ch.api_url("getMe"), "http://localhost:8081/bot1:A/getMe");
    }

    #[test]
    fn telegram_user_allowed_wildcard() {
        assert!(open_channel().is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_allowed_specific() {
        let ch = TelegramChannel::new("t".into(), vec!["alice".into(), "bob".into()], API);
        assert!(ch.is_user_allowed("alice"));
        assert!(!ch.is_user_allowed("eve"));
    }

    #[test]
    fn telegram_user_denied_empty() {
        let ch = TelegramChannel::new("t".into(), vec![], API);
        assert!(!ch.is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_exact_match_not_substring() {
        let ch = TelegramChannel::new("t".into(), vec!["alice".into()], API);
        assert!(!ch.is_user_allowed("alice_bot"));
        assert!(!ch.is_user_allowed("malice"));
        assert!(!ch.is_user_allowed(""));
    }

    #[test]
    fn telegram_user_allowed_by_numeric_id_identity() {
        let ch = TelegramChannel::new("t".into(), vec!["123456789".into()], API);
        assert!(ch.is_any_user_allowed(["unknown", "123456789"]));
        assert!(!ch.is_any_user_allowed(["unknown", "987"]));
    }

    #[test]
    fn parse_text_update() {
        let update = json!({
            "update_id": 10,
            "message": {
                "message_id": 77,
                "from": {"id": 5, "username": "ops"},
                "chat": {"id": -1001},
                "text": "/cmd all echo \"a  b\""
            }
        });
        let msg = open_channel().parse_update(&update).unwrap();
        assert_eq!(msg.id, "77");
        assert_eq!(msg.channel, "telegram");
        assert_eq!(
            msg.event,
            InboundEvent::TextCommand {
                raw_text: "/cmd all echo \"a  b\"".into(),
                sender_chat_id: "-1001".into(),
            }
        );
    }

    #[test]
    fn parse_document_update() {
        let update = json!({
            "update_id": 11,
            "message": {
                "message_id": 78,
                "from": {"id": 5},
                "chat": {"id": 42},
                "document": {"file_id": "BQAC", "file_name": "report.pdf"}
            }
        });
        let msg = open_channel().parse_update(&update).unwrap();
        assert_eq!(
            msg.event,
            InboundEvent::FileUpload {
                file_id: "BQAC".into(),
                file_name: "report.pdf".into(),
                sender_chat_id: "42".into(),
            }
        );
    }

    #[test]
    fn parse_document_without_name_uses_file_id() {
        let update = json!({
            "message": {
                "message_id": 1,
                "chat": {"id": 42},
                "document": {"file_id": "XYZ"}
            }
        });
        let msg = open_channel().parse_update(&update).unwrap();
        match msg.event {
            InboundEvent::FileUpload { file_name, .. } => assert_eq!(file_name, "file_XYZ"),
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn parse_skips_unsupported_and_unauthorized() {
        let sticker = json!({
            "message": {"message_id": 1, "chat": {"id": 1}, "sticker": {"file_id": "s"}}
        });
        assert!(open_channel().parse_update(&sticker).is_none());
        assert!(open_channel().parse_update(&json!({"edited_message": {}})).is_none());

        let ch = TelegramChannel::new("t".into(), vec!["alice".into()], API);
        let from_eve = json!({
            "message": {
                "message_id": 1,
                "from": {"id": 9, "username": "eve"},
                "chat": {"id": 1},
                "text": "/cmd all id"
            }
        });
        assert!(ch.parse_update(&from_eve).is_none());
    }

    #[test]
    fn parse_requires_chat_id() {
        let update = json!({"message": {"message_id": 1, "text": "/help"}});
        assert!(open_channel().parse_update(&update).is_none());
    }

    #[test]
    fn reply_parameters_need_numeric_id() {
        assert_eq!(
            TelegramChannel::reply_parameters(Some("77")),
            Some(json!({"message_id": 77, "allow_sending_without_reply": true}))
        );
        assert_eq!(TelegramChannel::reply_parameters(Some("abc")), None);
        assert_eq!(TelegramChannel::reply_parameters(None), None);
    }

    #[test]
    fn telegram_split_short_message() {
        assert_eq!(split_message_for_telegram("hello"), vec!["hello"]);
        assert_eq!(split_message_for_telegram(""), vec![""]);
    }

    #[test]
    fn telegram_split_exact_limit() {
        let msg = "a".repeat(TELEGRAM_MAX_MESSAGE_LENGTH);
        assert_eq!(split_message_for_telegram(&msg).len(), 1);
    }

    #[test]
    fn telegram_split_at_newline() {
        let msg = format!("{}\n{}", "a".repeat(3000), "b".repeat(3000));
        let chunks = split_message_for_telegram(&msg);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with('\n'));
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn telegram_split_multibyte_is_char_safe() {
        let msg = "é".repeat(TELEGRAM_MAX_MESSAGE_LENGTH * 2 + 5);
        let chunks = split_message_for_telegram(&msg);
        assert_eq!(chunks.len(), 3);
        assert!(chunks
            .iter()
            .all(|c| c.chars().count() <= TELEGRAM_MAX_MESSAGE_LENGTH));
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn telegram_split_counts_utf16_units() {
        let msg = "😀".repeat(2999);
        let chunks = split_message_for_telegram(&msg);
        assert_eq!(chunks.len(), 2);
        assert!(chunks
            .iter()
            .all(|c| c.encode_utf16().count() <= TELEGRAM_MAX_MESSAGE_LENGTH));
        assert_eq!(chunks[0].chars().count(), TELEGRAM_MAX_MESSAGE_LENGTH / 2);
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn telegram_split_exact_limit_in_utf16_units() {
        let msg = "😀".repeat(TELEGRAM_MAX_MESSAGE_LENGTH / 2);
        assert_eq!(split_message_for_telegram(&msg), vec![msg]);
    }

    #[tokio::test]
    async fn telegram_send_document_unreachable_api_is_error() {
        let ch = TelegramChannel::new("fake-token".into(), vec!["*".into()], DEAD_API);
        let result = ch
            .send_document("123456", b"hello".to_vec(), "test.txt", Some("Output"), Some("5"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn telegram_fetch_file_unreachable_api_is_error() {
        let ch = TelegramChannel::new("fake-token".into(), vec!["*".into()], DEAD_API);
        assert!(ch.fetch_file("BQAC").await.is_err());
    }

    #[tokio::test]
    async fn telegram_health_check_unreachable_api_is_unhealthy() {
        let ch = TelegramChannel::new("fake-token".into(), vec![], DEAD_API);
        assert!(!ch.health_check().await);
    }
}
