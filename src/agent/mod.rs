//! Inbound router: decides what, if anything, this agent says back to an event.

use crate::actions::{all_actions, ActionResult, ActionTable, UploadReceiver};
use crate::channels::{Channel, InboundEvent};
use crate::config::AgentConfig;
use crate::error::{ActionError, ParseError};
use crate::identity::{IdentityProvider, SystemIdentity};
use crate::platform::{default_grabber, SysinfoProbe};
use crate::protocol::{self, Addressing, TargetDecision, INVALID_COMMAND_REPLY};
use crate::response::{OutboundResponse, ResponseShaper};
use std::sync::Arc;

pub struct Agent {
    identity: Arc<dyn IdentityProvider>,
    actions: ActionTable,
    shaper: ResponseShaper,
    uploads: UploadReceiver,
}

impl Agent {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        actions: ActionTable,
        shaper: ResponseShaper,
        uploads: UploadReceiver,
    ) -> Self {
        Self {
            identity,
            actions,
            shaper,
            uploads,
        }
    }

    /// Agent wired to the real OS collaborators.
    pub fn from_config(config: &AgentConfig) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(SystemIdentity::new(config.name.clone()));
        let actions = all_actions(
            Arc::clone(&identity),
            Arc::new(SysinfoProbe::new()),
            default_grabber(),
            config.action_settings(),
        );
        Self::new(
            identity,
            ActionTable::new(actions),
            ResponseShaper::new(config.inline_reply_limit),
            UploadReceiver::new(config.uploads_path()),
        )
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Name used for target matching; empty if the hostname cannot be read,
    /// in which case only broadcast commands are accepted.
    fn local_name(&self) -> String {
        self.identity.hostname().unwrap_or_else(|e| {
            tracing::error!("Cannot determine local identity: {e}");
            String::new()
        })
    }

    /// Handle one text message. `None` means stay silent.
    pub async fn handle_text(&self, raw: &str) -> Option<OutboundResponse> {
        let command = match protocol::parse(raw) {
            Ok(command) => command,
            Err(ParseError::NotACommand) => return None,
            Err(e) => {
                tracing::warn!("Rejected command {raw:?}: {e}");
                return Some(OutboundResponse::inline(INVALID_COMMAND_REPLY));
            }
        };
        let verb = command.verb;

        match command.require_target() {
            Ok(token) => {
                if protocol::resolve(token, &self.local_name()) == TargetDecision::Ignore {
                    tracing::debug!("Ignoring {verb} addressed to {token}");
                    return None;
                }
            }
            // help/list without a target answer everywhere.
            Err(_) if verb.addressing() == Addressing::OptionalTarget => {}
            Err(e) => {
                tracing::warn!("Missing target for {verb}");
                return Some(OutboundResponse::inline(e.to_string()));
            }
        }

        let argument = match command.require_argument() {
            Ok(argument) => argument,
            Err(e) => {
                tracing::warn!("Missing argument for {verb}");
                return Some(OutboundResponse::inline(e.to_string()));
            }
        };

        tracing::info!("Executing {verb}");
        let result = self.actions.dispatch(verb, argument).await;
        Some(self.shaper.shape(result))
    }

    /// Fetch an uploaded file from `channel` and store it locally.
    pub async fn handle_upload(
        &self,
        channel: &dyn Channel,
        file_id: &str,
        file_name: &str,
    ) -> OutboundResponse {
        let result = match channel.fetch_file(file_id).await {
            Ok(bytes) => self.uploads.receive(file_id, file_name, &bytes).await,
            Err(e) => {
                tracing::error!("Error in file upload: failed to fetch {file_id}: {e:#}");
                ActionResult::failure(ActionError::Transport(e.to_string()))
            }
        };
        self.shaper.shape(result)
    }

    pub async fn handle_event(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
    ) -> Option<OutboundResponse> {
        match event {
            InboundEvent::TextCommand { raw_text, .. } => self.handle_text(raw_text).await,
            InboundEvent::FileUpload {
                file_id, file_name, ..
            } => Some(self.handle_upload(channel, file_id, file_name).await),
        }
    }
}
