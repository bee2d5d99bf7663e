use super::traits::{Action, ActionResult};
use crate::identity::IdentityProvider;
use crate::platform::SystemProbe;
use crate::protocol::Verb;
use async_trait::async_trait;
use std::sync::Arc;

pub const HELP_TEXT: &str = "Available Commands\n\n\
/help - Show this help message\n\
/list - Show machine information\n\
/cmd <target|all> <command> - Execute a shell command on the machine\n\
/screenshot <target|all> - Capture and send a screenshot of the primary monitor\n\
/status <target|all> - Show CPU, RAM, and Disk usage\n\
/processes <target|all> - List all running processes\n\
/download <target|all> <filepath> - Download a file from the machine\n\n\
You can upload files by sending a document\n\n\
Note: Replace <target|all> with the hostname of the target machine or use 'all' for broadcast.";

/// `/help`: static capability text.
pub struct HelpAction;

#[async_trait]
impl Action for HelpAction {
    fn verb(&self) -> Verb {
        Verb::Help
    }

    fn description(&self) -> &str {
        "Show this help message"
    }

    async fn execute(&self, _argument: Option<&str>) -> ActionResult {
        ActionResult::text(HELP_TEXT)
    }
}

/// `/list`: hostname, OS descriptor and IP address.
pub struct ListAction {
    identity: Arc<dyn IdentityProvider>,
    probe: Arc<dyn SystemProbe>,
}

impl ListAction {
    pub fn new(identity: Arc<dyn IdentityProvider>, probe: Arc<dyn SystemProbe>) -> Self {
        Self { identity, probe }
    }
}

#[async_trait]
impl Action for ListAction {
    fn verb(&self) -> Verb {
        Verb::List
    }

    fn description(&self) -> &str {
        "Show machine information"
    }

    async fn execute(&self, _argument: Option<&str>) -> ActionResult {
        let hostname = match self.identity.hostname() {
            Ok(h) => h,
            Err(e) => return ActionResult::failure(e),
        };
        let address = match self.identity.local_address().await {
            Ok(a) => a,
            Err(e) => return ActionResult::failure(e),
        };
        let os = self.probe.os_descriptor();

        ActionResult::text(format!(
            "Machine Information\nHostname: {hostname}\nOperating System: {os}\nIP Address: {address}"
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actions::system::tests::FakeProbe;
    use crate::error::IdentityError;

    /// Identity with a fixed name and address.
    pub(crate) struct FixedIdentity {
        pub name: String,
        pub address: Option<String>,
    }

    impl FixedIdentity {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                address: Some("192.168.1.20".into()),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FixedIdentity {
        fn hostname(&self) -> Result<String, IdentityError> {
            Ok(self.name.clone())
        }

        async fn resolve_address(&self, hostname: &str) -> Result<String, IdentityError> {
            self.address
                .clone()
                .ok_or_else(|| IdentityError::NoAddress(hostname.to_string()))
        }
    }

    #[tokio::test]
    async fn help_lists_every_verb() {
        let ActionResult::Text(out) = HelpAction.execute(None).await else {
            panic!("help must be text");
        };
        for verb in Verb::ALL {
            assert!(out.body.contains(&verb.to_string()), "missing {verb}");
        }
    }

    #[tokio::test]
    async fn list_reports_host_os_and_address() {
        let action = ListAction::new(
            Arc::new(FixedIdentity::new("WORKER1")),
            Arc::new(FakeProbe::healthy()),
        );
        let ActionResult::Text(out) = action.execute(None).await else {
            panic!("list must be text");
        };
        assert_eq!(
            out.body,
            "Machine Information\nHostname: WORKER1\nOperating System: Linux-6.8.0-x86_64\nIP Address: 192.168.1.20"
        );
    }

    #[tokio::test]
    async fn list_resolution_error_is_failure() {
        let mut identity = FixedIdentity::new("WORKER1");
        identity.address = None;
        let action = ListAction::new(Arc::new(identity), Arc::new(FakeProbe::healthy()));
        match action.execute(None).await {
            ActionResult::Failure(err) => {
                assert_eq!(err.render(), "Error: no address found for WORKER1");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
