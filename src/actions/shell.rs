use super::traits::{Action, ActionResult};
use crate::error::ActionError;
use crate::protocol::Verb;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Hard upper bound on a single `/cmd`.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

pub const NO_OUTPUT_REPLY: &str = "Command executed successfully with no output";

/// `/cmd <target> <command>`: run a shell command and report its output.
pub struct ShellAction {
    timeout: Duration,
}

impl ShellAction {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellAction {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl Action for ShellAction {
    fn verb(&self) -> Verb {
        Verb::Cmd
    }

    fn description(&self) -> &str {
        "Execute a shell command on the machine"
    }

    async fn execute(&self, argument: Option<&str>) -> ActionResult {
        let Some(command) = argument.filter(|c| !c.trim().is_empty()) else {
            return ActionResult::failure(ActionError::Usage(Verb::Cmd.usage()));
        };

        tracing::debug!("Executing shell command: {command}");
        match run_shell(command, self.timeout).await {
            Ok(reply) => ActionResult::text(reply),
            Err(e) => {
                tracing::error!("Shell command failed: {command}: {e}");
                ActionResult::failure(e)
            }
        }
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    // cmd.exe does not understand the `\"` escaping std applies to quoted args.
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

/// Run `command` through the platform shell with a hard timeout.
///
/// On timeout the child is killed and no partial output is returned.
pub async fn run_shell(command: &str, timeout: Duration) -> Result<String, ActionError> {
    let child = shell_command(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ActionError::Timeout)??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(format_output(stdout.trim(), stderr.trim()))
}

/// stdout wins over stderr; the two are never combined.
fn format_output(stdout: &str, stderr: &str) -> String {
    if !stdout.is_empty() {
        format!("Output\n\n{stdout}")
    } else if !stderr.is_empty() {
        format!("Error\n\n{stderr}")
    } else {
        NO_OUTPUT_REPLY.to_string()
    }
}
