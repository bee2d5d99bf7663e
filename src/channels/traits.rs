use async_trait::async_trait;

/// What arrived on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    TextCommand {
        raw_text: String,
        sender_chat_id: String,
    },
    FileUpload {
        file_id: String,
        file_name: String,
        sender_chat_id: String,
    },
}

impl InboundEvent {
    /// Chat the reply should go to.
    pub fn sender_chat_id(&self) -> &str {
        match self {
            Self::TextCommand { sender_chat_id, .. } | Self::FileUpload { sender_chat_id, .. } => {
                sender_chat_id
            }
        }
    }
}

/// A message received from a channel
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    /// Transport message id, used to thread the reply.
    pub id: String,
    pub channel: String,
    pub timestamp: u64,
    pub event: InboundEvent,
}

impl ChannelMessage {
    pub fn new(id: impl Into<String>, channel: &str, event: InboundEvent) -> Self {
        Self {
            id: id.into(),
            channel: channel.to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            event,
        }
    }

    pub fn sender(&self) -> &str {
        self.event.sender_chat_id()
    }
}

/// Core channel trait — implement for any messaging transport
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name
    fn name(&self) -> &str;

    /// Send a text message, optionally as a reply to `reply_to`
    async fn send(
        &self,
        message: &str,
        recipient: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Send in-memory bytes as a file attachment
    async fn send_document(
        &self,
        recipient: &str,
        bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Send in-memory image bytes as a photo. Falls back to a document.
    async fn send_photo(
        &self,
        recipient: &str,
        bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> anyhow::Result<()> {
        self.send_document(recipient, bytes, file_name, caption, reply_to)
            .await
    }

    /// Fetch the payload of an uploaded file
    async fn fetch_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("{} does not support file uploads ({file_id})", self.name())
    }

    /// Start listening for incoming messages (long-running)
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()>;

    /// Check if channel is healthy
    async fn health_check(&self) -> bool {
        true
    }
}
