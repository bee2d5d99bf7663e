//! Turns action results into what actually goes back on the channel.

use crate::actions::{ActionResult, TextOutput};

/// Text at or above this many characters is sent as a file instead of a message.
pub const DEFAULT_INLINE_REPLY_LIMIT: usize = 3000;

/// How an attachment should be presented by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Photo,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub caption: Option<String>,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundResponse {
    InlineReply(String),
    Attachment(Attachment),
}

impl OutboundResponse {
    pub fn inline(text: impl Into<String>) -> Self {
        Self::InlineReply(text.into())
    }

    /// Inline text, or `None` for attachments.
    pub fn as_inline(&self) -> Option<&str> {
        match self {
            Self::InlineReply(text) => Some(text),
            Self::Attachment(_) => None,
        }
    }

    pub fn as_attachment(&self) -> Option<&Attachment> {
        match self {
            Self::Attachment(att) => Some(att),
            Self::InlineReply(_) => None,
        }
    }
}

/// Size policy between inline replies and file attachments.
#[derive(Debug, Clone, Copy)]
pub struct ResponseShaper {
    inline_limit: usize,
}

impl Default for ResponseShaper {
    fn default() -> Self {
        Self::new(DEFAULT_INLINE_REPLY_LIMIT)
    }
}

impl ResponseShaper {
    pub fn new(inline_limit: usize) -> Self {
        Self {
            inline_limit: inline_limit.max(1),
        }
    }

    pub fn inline_limit(&self) -> usize {
        self.inline_limit
    }

    pub fn shape(&self, result: ActionResult) -> OutboundResponse {
        match result {
            ActionResult::Text(text) => self.shape_text(text),
            ActionResult::Binary(binary) => OutboundResponse::Attachment(Attachment {
                bytes: binary.bytes,
                file_name: binary.file_name,
                caption: Some(binary.caption),
                kind: binary.kind,
            }),
            ActionResult::Failure(err) => OutboundResponse::InlineReply(err.render()),
        }
    }

    fn shape_text(&self, text: TextOutput) -> OutboundResponse {
        // Characters, not bytes: the ceiling is about what the operator reads.
        if text.body.chars().count() < self.inline_limit {
            return OutboundResponse::InlineReply(text.body);
        }

        tracing::debug!(
            "Reply exceeds {} chars; sending as {}",
            self.inline_limit,
            text.overflow_name
        );
        OutboundResponse::Attachment(Attachment {
            bytes: text.body.into_bytes(),
            file_name: text.overflow_name,
            caption: Some(text.overflow_caption),
            kind: AttachmentKind::Document,
        })
    }
}
