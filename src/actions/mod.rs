pub mod download;
pub mod info;
pub mod screenshot;
pub mod shell;
pub mod system;
pub mod traits;
pub mod upload;

pub use download::DownloadAction;
pub use info::{HelpAction, ListAction, HELP_TEXT};
pub use screenshot::ScreenshotAction;
pub use shell::ShellAction;
pub use system::{ProcessesAction, StatusAction};
pub use traits::{Action, ActionResult, BinaryOutput, TextOutput};
pub use upload::UploadReceiver;

use crate::identity::IdentityProvider;
use crate::platform::{ScreenGrabber, SystemProbe};
use crate::protocol::Verb;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tunables the actions need at construction time.
#[derive(Debug, Clone, Copy)]
pub struct ActionSettings {
    pub command_timeout: Duration,
    pub status_sample: Duration,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            command_timeout: shell::DEFAULT_COMMAND_TIMEOUT,
            status_sample: system::DEFAULT_STATUS_SAMPLE,
        }
    }
}

/// Create the full action set for one agent.
pub fn all_actions(
    identity: Arc<dyn IdentityProvider>,
    probe: Arc<dyn SystemProbe>,
    grabber: Arc<dyn ScreenGrabber>,
    settings: ActionSettings,
) -> Vec<Box<dyn Action>> {
    vec![
        Box::new(HelpAction),
        Box::new(ListAction::new(identity, Arc::clone(&probe))),
        Box::new(ShellAction::new(settings.command_timeout)),
        Box::new(ScreenshotAction::new(grabber)),
        Box::new(StatusAction::new(Arc::clone(&probe), settings.status_sample)),
        Box::new(ProcessesAction::new(probe)),
        Box::new(DownloadAction),
    ]
}

/// Verb → action dispatch table.
pub struct ActionTable {
    actions: HashMap<Verb, Box<dyn Action>>,
}

impl ActionTable {
    /// Later entries for the same verb replace earlier ones.
    pub fn new(actions: Vec<Box<dyn Action>>) -> Self {
        let actions = actions
            .into_iter()
            .map(|action| (action.verb(), action))
            .collect();
        Self { actions }
    }

    pub fn get(&self, verb: Verb) -> Option<&dyn Action> {
        self.actions.get(&verb).map(|action| &**action)
    }

    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL.into_iter().filter(|v| self.actions.contains_key(v))
    }

    /// Run the action for `verb`. A verb with no registered action is a
    /// failure, not a panic.
    pub async fn dispatch(&self, verb: Verb, argument: Option<&str>) -> ActionResult {
        let Some(action) = self.get(verb) else {
            tracing::error!("No action registered for {verb}");
            return ActionResult::failure(crate::error::ActionError::Probe(format!(
                "{verb} is not available on this agent"
            )));
        };

        tracing::debug!("Dispatching {verb}: {}", action.description());
        let result = action.execute(argument).await;
        if let ActionResult::Failure(ref err) = result {
            if !err.is_usage() {
                tracing::error!("Error in {verb} command: {err}");
            }
        }
        result
    }
}
