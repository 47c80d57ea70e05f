use std::error::Error;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serenity::all::RoleId;

pub const INTRODUCTION_BUTTON: &str = "intro:open";
pub const INTRODUCTION_MODAL: &str = "intro:submit";
pub const INTRODUCTION_BIO: &str = "intro:bio";
pub const INTRODUCTION_LINK: &str = "intro:link";

/// What a component's custom id asks the bot to do. Buttons outlive restarts, so all the
/// state a click needs is encoded in the id.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ComponentAction {
    ToggleRole { panel: String, role: RoleId },
    OpenIntroduction,
    SubmitIntroduction,
}

#[derive(Debug, Clone)]
pub struct ComponentParseError(pub String);

impl fmt::Display for ComponentParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "could not parse the custom id `{}`", self.0)
    }
}

impl Error for ComponentParseError {}

lazy_static! {
    static ref ROLE_BUTTON_REGEX: Regex = Regex::new(r"^role:([a-z_]+):([1-9][0-9]*)$").expect("role button pattern is valid");
}

impl FromStr for ComponentAction {
    type Err = ComponentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            INTRODUCTION_BUTTON => Ok(ComponentAction::OpenIntroduction),
            INTRODUCTION_MODAL => Ok(ComponentAction::SubmitIntroduction),
            _ => {
                let captures = ROLE_BUTTON_REGEX.captures(s).ok_or_else(|| ComponentParseError(s.to_string()))?;
                let role = captures[2].parse::<u64>().map_err(|_| ComponentParseError(s.to_string()))?;
                Ok(ComponentAction::ToggleRole { panel: captures[1].to_string(), role: RoleId::new(role) })
            }
        }
    }
}

impl fmt::Display for ComponentAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComponentAction::ToggleRole { panel, role } => write!(f, "role:{}:{}", panel, role.get()),
            ComponentAction::OpenIntroduction => write!(f, "{}", INTRODUCTION_BUTTON),
            ComponentAction::SubmitIntroduction => write!(f, "{}", INTRODUCTION_MODAL),
        }
    }
}
