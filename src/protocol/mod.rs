//! Command surface shared by every agent on the channel:
//! `/<verb> [<target>] [<argument>]`.

pub mod command;
pub mod target;

pub use command::{parse, split_fields, Addressing, ParsedCommand, Verb, COMMAND_MARKER};
pub use target::{resolve, TargetDecision, BROADCAST_TARGET};

/// Fixed reply for marker-prefixed text that is not a known command.
pub const INVALID_COMMAND_REPLY: &str =
    "Invalid command or wrong format. Use /help to see available commands.";
