use crate::error::ActionError;
use crate::protocol::Verb;
use crate::response::AttachmentKind;
use async_trait::async_trait;

/// Text produced by an action, plus how to name it if it is too long to send inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutput {
    pub body: String,
    pub overflow_name: String,
    pub overflow_caption: String,
}

impl TextOutput {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            overflow_name: "output.txt".into(),
            overflow_caption: "Output".into(),
        }
    }

    #[must_use]
    pub fn overflow_as(mut self, file_name: &str, caption: &str) -> Self {
        self.overflow_name = file_name.to_string();
        self.overflow_caption = caption.to_string();
        self
    }
}

/// Binary payload that always travels as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOutput {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub caption: String,
    pub kind: AttachmentKind,
}

impl BinaryOutput {
    pub fn photo(bytes: Vec<u8>, file_name: &str, caption: &str) -> Self {
        Self {
            bytes,
            file_name: file_name.to_string(),
            caption: caption.to_string(),
            kind: AttachmentKind::Photo,
        }
    }

    pub fn document(bytes: Vec<u8>, file_name: &str, caption: &str) -> Self {
        Self {
            bytes,
            file_name: file_name.to_string(),
            caption: caption.to_string(),
            kind: AttachmentKind::Document,
        }
    }
}

/// Outcome of exactly one action for one accepted command.
#[derive(Debug)]
pub enum ActionResult {
    Text(TextOutput),
    Binary(BinaryOutput),
    Failure(ActionError),
}

impl ActionResult {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(TextOutput::new(body))
    }

    pub fn failure(err: impl Into<ActionError>) -> Self {
        Self::Failure(err.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// One verb's executable behaviour.
///
/// Implementations validate their own argument and never panic on bad input;
/// every fault comes back as [`ActionResult::Failure`].
#[async_trait]
pub trait Action: Send + Sync {
    fn verb(&self) -> Verb;

    /// One-line summary shown in logs and diagnostics.
    fn description(&self) -> &str;

    async fn execute(&self, argument: Option<&str>) -> ActionResult;
}
