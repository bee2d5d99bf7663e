use crate::error::ParseError;
use std::fmt;

/// Leading marker that distinguishes a command from conversation.
pub const COMMAND_MARKER: char = '/';

/// How a verb expects to be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `/verb [target]`: no target means every agent answers.
    OptionalTarget,
    /// `/verb <target>`
    Target,
    /// `/verb <target> <argument...>`
    TargetAndArgument,
}

impl Addressing {
    /// Maximum whitespace-separated fields, counting the verb itself.
    pub fn max_fields(self) -> usize {
        match self {
            Self::OptionalTarget | Self::Target => 2,
            Self::TargetAndArgument => 3,
        }
    }
}

/// Every verb the dispatch table knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Help,
    List,
    Cmd,
    Screenshot,
    Status,
    Processes,
    Download,
}

impl Verb {
    pub const ALL: [Verb; 7] = [
        Verb::Help,
        Verb::List,
        Verb::Cmd,
        Verb::Screenshot,
        Verb::Status,
        Verb::Processes,
        Verb::Download,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::List => "list",
            Self::Cmd => "cmd",
            Self::Screenshot => "screenshot",
            Self::Status => "status",
            Self::Processes => "processes",
            Self::Download => "download",
        }
    }

    /// Exact, case-sensitive lookup by the name following the command marker.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.name() == name)
    }

    pub fn addressing(self) -> Addressing {
        match self {
            Self::Help | Self::List => Addressing::OptionalTarget,
            Self::Screenshot | Self::Status | Self::Processes => Addressing::Target,
            Self::Cmd | Self::Download => Addressing::TargetAndArgument,
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Self::Help => "Usage: /help [target|all]",
            Self::List => "Usage: /list [target|all]",
            Self::Cmd => "Usage: /cmd <target|all> <command>",
            Self::Screenshot => "Usage: /screenshot <target|all>",
            Self::Status => "Usage: /status <target|all>",
            Self::Processes => "Usage: /processes <target|all>",
            Self::Download => "Usage: /download <target|all> <file_path>",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// A command line split into its addressing fields.
///
/// `target` and `argument` are whatever the text carried; whether they are
/// required is decided by [`ParsedCommand::require_target`] and
/// [`ParsedCommand::require_argument`] after the caller has had a chance to
/// apply target filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: Verb,
    pub target: Option<String>,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn require_target(&self) -> Result<&str, ParseError> {
        self.target.as_deref().ok_or(ParseError::MissingTarget {
            usage: self.verb.usage(),
        })
    }

    /// The argument field, or `MissingArgument` if the verb needs one and the
    /// text did not carry it. Verbs without an argument always get `None`.
    pub fn require_argument(&self) -> Result<Option<&str>, ParseError> {
        match (self.verb.addressing(), self.argument.as_deref()) {
            (Addressing::TargetAndArgument, None) => Err(ParseError::MissingArgument {
                usage: self.verb.usage(),
            }),
            (Addressing::TargetAndArgument, Some(arg)) => Ok(Some(arg)),
            _ => Ok(None),
        }
    }
}

/// Split on whitespace into at most `max_fields` fields.
///
/// The last field is the untouched remainder of the line (leading whitespace
/// removed), so shell commands and paths keep their internal spacing.
pub fn split_fields(text: &str, max_fields: usize) -> Vec<&str> {
    let max_fields = max_fields.max(1);
    let mut fields = Vec::with_capacity(max_fields);
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        if fields.len() + 1 == max_fields {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Parse raw inbound text into a command.
///
/// Text that does not start with [`COMMAND_MARKER`] is `NotACommand`. A
/// Telegram `@botname` suffix on the verb is ignored.
pub fn parse(raw: &str) -> Result<ParsedCommand, ParseError> {
    let text = raw.trim();
    let head = text.split_whitespace().next().ok_or(ParseError::NotACommand)?;
    let name = head
        .strip_prefix(COMMAND_MARKER)
        .ok_or(ParseError::NotACommand)?;
    let name = name.split_once('@').map_or(name, |(verb, _bot)| verb);

    let verb = Verb::from_name(name).ok_or_else(|| ParseError::UnknownVerb(name.to_string()))?;

    let fields = split_fields(text, verb.addressing().max_fields());
    let target = fields
        .get(1)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let argument = fields
        .get(2)
        .filter(|a| !a.trim().is_empty())
        .map(|a| (*a).to_string());

    Ok(ParsedCommand {
        verb,
        target,
        argument,
    })
}
