use std::path::PathBuf;
use thiserror::Error;

/// Why an inbound text could not be turned into an addressed command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Plain conversational text; never answered.
    #[error("not a command")]
    NotACommand,
    #[error("unknown command: /{0}")]
    UnknownVerb(String),
    /// The verb needs a target token and none was given.
    #[error("{usage}")]
    MissingTarget { usage: &'static str },
    /// The verb needs an argument after the target and none was given.
    #[error("{usage}")]
    MissingArgument { usage: &'static str },
}

impl ParseError {
    /// Usage text to send back, if this failure deserves a reply at all.
    pub fn usage(&self) -> Option<&'static str> {
        match self {
            Self::MissingTarget { usage } | Self::MissingArgument { usage } => Some(usage),
            Self::NotACommand | Self::UnknownVerb(_) => None,
        }
    }
}

/// Failure while resolving the local identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read hostname: {0}")]
    Hostname(#[source] std::io::Error),
    #[error("hostname is not valid UTF-8")]
    NonUtf8Hostname,
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no address found for {0}")]
    NoAddress(String),
}

/// Execution-time failure of a single action.
///
/// `Usage` is shown to the operator verbatim; every other variant is shown
/// as `Error: <message>`.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("Command execution timed out")]
    Timeout,
    #[error("File not found")]
    NotFound,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("{0}")]
    Probe(String),
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("{0}")]
    Transport(String),
}

impl ActionError {
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Text the operator sees for this failure.
    pub fn render(&self) -> String {
        match self {
            Self::Usage(usage) => (*usage).to_string(),
            other => format!("Error: {other}"),
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
