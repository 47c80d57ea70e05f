use serenity::all::ChannelId;
use thiserror::Error;

pub type BotResult<T> = Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Discord answered "Unknown Channel", usually because a room was deleted concurrently.
    #[error("Channel {0} no longer exists")]
    ChannelGone(ChannelId),
    #[error("No error log channel is configured, refusing to drop: {0}")]
    AuditUnavailable(String),
    #[error("The `{0}` command is disabled")]
    CommandDisabled(String),
    #[error("Maximum number of concurrent invokers allowed: {number}, per {per}")]
    MaxConcurrency { number: usize, per: &'static str },
    #[error("You have to be inside a voice room you own")]
    NotRoomOwner,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unrecognised component `{0}`")]
    UnknownComponent(String),
    #[error("Interaction is missing the `{0}` field")]
    MissingField(&'static str),
}

impl BotError {
    /// True when Discord refused the call for lack of access.
    pub fn is_forbidden(&self) -> bool {
        match self {
            BotError::Serenity(serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response))) => response.status_code.as_u16() == 403,
            _ => false,
        }
    }

    /// True when Discord reports the interaction was already acknowledged (code 40060).
    pub fn is_already_responded(&self) -> bool {
        discord_code(self) == Some(40060)
    }
}

/// JSON error code returned by Discord, if the error came from an HTTP response.
pub fn discord_code(error: &BotError) -> Option<isize> {
    match error {
        BotError::Serenity(serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response))) => Some(response.error.code),
        _ => None,
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read settings file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Error parsing settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("No discord token found, set DISCORD_TOKEN or `token` in the settings file")]
    MissingToken,
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
