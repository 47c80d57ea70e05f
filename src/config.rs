use std::collections::HashSet;
use std::env;
use std::fs::File;
use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serenity::all::{ChannelId, GuildId, RoleId};
use tracing_subscriber::filter::LevelFilter;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";
pub const DEFAULT_ROOM_GRACE_SECS: u64 = 3;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub guild_id: GuildId,
    #[serde(default)]
    pub server_icon_url: Option<String>,
    pub channels: ChannelSettings,
    pub default_role: RoleId,
    #[serde(default)]
    pub role_panels: Vec<RolePanel>,
    #[serde(default = "default_room_grace")]
    pub room_grace_secs: u64,
    #[serde(default)]
    pub disabled_commands: Vec<String>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChannelSettings {
    pub welcome: ChannelId,
    pub goodbye: ChannelId,
    #[serde(default)]
    pub error_log: Option<ChannelId>,
    pub role_assignment: ChannelId,
    pub self_description: ChannelId,
    pub main_chat: ChannelId,
    pub voice_generator: ChannelId,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RolePanel {
    pub key: String,
    pub title: String,
    pub description: String,
    /// Every other role of the panel competes with the clicked one.
    #[serde(default)]
    pub exclusive: bool,
    pub buttons: Vec<RoleButton>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RoleButton {
    pub label: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub role: RoleId,
    #[serde(default)]
    pub competing: Vec<RoleId>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingSettings {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings { directory: default_log_directory(), level: default_log_level() }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_room_grace() -> u64 {
    DEFAULT_ROOM_GRACE_SECS
}

fn default_log_directory() -> String {
    "logs/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RolePanel {
    pub fn button_for(&self, role: RoleId) -> Option<&RoleButton> {
        self.buttons.iter().find(|button| button.role == role)
    }

    /// Roles that get evicted when `role` is granted from this panel.
    pub fn competing_roles(&self, role: RoleId) -> Vec<RoleId> {
        let Some(button) = self.button_for(role) else {
            return vec![];
        };

        if !button.competing.is_empty() {
            return button.competing.iter().copied().filter(|competing| *competing != role).collect();
        }

        if self.exclusive {
            self.buttons.iter().map(|other| other.role).filter(|other| *other != role).collect()
        } else {
            vec![]
        }
    }
}

impl LoggingSettings {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level.parse().map_err(|_| ConfigError::Invalid { field: "logging.level", reason: format!("unknown level `{}`", self.level) })
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Settings, ConfigError> {
        let mut file = File::open(path).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;

        let mut settings = Settings::from_yaml(&contents)?;
        if let Ok(token) = env::var("DISCORD_TOKEN") {
            settings.token = token;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml(contents: &str) -> Result<Settings, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "prefix", reason: "must not be empty".to_string() });
        }

        let mut keys = HashSet::new();
        for panel in &self.role_panels {
            if !keys.insert(panel.key.as_str()) {
                return Err(ConfigError::Invalid { field: "role_panels", reason: format!("duplicate panel key `{}`", panel.key) });
            }
            if !panel.key.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
                return Err(ConfigError::Invalid { field: "role_panels", reason: format!("panel key `{}` must be lowercase letters or `_`", panel.key) });
            }
            // Discord allows 5 rows of 5 buttons per message.
            if panel.buttons.len() > 25 {
                return Err(ConfigError::Invalid { field: "role_panels", reason: format!("panel `{}` has more than 25 buttons", panel.key) });
            }
        }
        self.logging.level_filter()?;
        Ok(())
    }

    pub fn room_grace(&self) -> Duration {
        Duration::from_secs(self.room_grace_secs)
    }

    pub fn panel(&self, key: &str) -> Option<&RolePanel> {
        self.role_panels.iter().find(|panel| panel.key == key)
    }

    pub fn is_command_disabled(&self, name: &str) -> bool {
        self.disabled_commands.iter().any(|disabled| disabled == name)
    }
}

/// Settings resolved against the guild once the bot is ready.
#[derive(Clone, Debug)]
pub struct BotConfig {
    pub settings: Settings,
    pub generator_category: Option<ChannelId>,
}

impl BotConfig {
    pub fn new(settings: Settings, generator_category: Option<ChannelId>) -> Self {
        BotConfig { settings, generator_category }
    }

    pub fn generator(&self) -> ChannelId {
        self.settings.channels.voice_generator
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
token: "abc"
guild_id: 10
server_icon_url: "https://example.com/icon.png"
channels:
  welcome: 11
  goodbye: 12
  error_log: 13
  role_assignment: 14
  self_description: 15
  main_chat: 16
  voice_generator: 17
default_role: 20
role_panels:
  - key: interest
    title: "Interests"
    description: "Pick what you work on."
    buttons:
      - { label: "FE", emoji: "🧑‍💻", role: 101 }
      - { label: "BE", role: 102, competing: [101] }
  - key: language
    title: "Languages"
    description: "Pick your main language."
    exclusive: true
    buttons:
      - { label: "Rust", role: 201 }
      - { label: "Go", role: 202 }
      - { label: "Java", role: 203 }
"#;

    pub(crate) fn sample_settings() -> Settings {
        Settings::from_yaml(SAMPLE).unwrap()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let settings = sample_settings();
        assert_eq!(settings.prefix, "!");
        assert_eq!(settings.room_grace(), Duration::from_secs(3));
        assert_eq!(settings.logging.directory, "logs/");
        assert!(settings.disabled_commands.is_empty());
        assert_eq!(settings.channels.error_log, Some(ChannelId::new(13)));
        settings.validate().unwrap();
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut settings = sample_settings();
        settings.token = " ".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn duplicate_panel_keys_are_rejected() {
        let mut settings = sample_settings();
        let copy = settings.role_panels[0].clone();
        settings.role_panels.push(copy);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { field: "role_panels", .. })));
    }

    #[test]
    fn competing_roles_follow_button_then_panel() {
        let settings = sample_settings();
        let interest = settings.panel("interest").unwrap();
        assert!(interest.competing_roles(RoleId::new(101)).is_empty());
        assert_eq!(interest.competing_roles(RoleId::new(102)), vec![RoleId::new(101)]);

        let language = settings.panel("language").unwrap();
        assert_eq!(language.competing_roles(RoleId::new(202)), vec![RoleId::new(201), RoleId::new(203)]);
        assert!(language.competing_roles(RoleId::new(999)).is_empty());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut settings = sample_settings();
        settings.logging.level = "chatty".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { field: "logging.level", .. })));

        settings.logging.level = "DEBUG".to_string();
        assert_eq!(settings.logging.level_filter().unwrap(), LevelFilter::DEBUG);
    }
}
