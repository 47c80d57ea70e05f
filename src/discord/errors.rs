use std::time::Duration;

use chrono::{DateTime, Utc};
use poise::{CreateReply, FrameworkError};
use serenity::all::{CreateInteractionResponse, CreateInteractionResponseMessage, Interaction, MemberParseError, Permissions, UserParseError};

use crate::config::BotConfig;
use crate::discord::commands::{Context, Data};
use crate::discord::gateway::GuildGateway;
use crate::discord::notice::{Notice, Tone};
use crate::error::{BotError, BotResult};

pub const DEFAULT_ERROR_MESSAGE: &str = "🕳️ There is an error.";

/// Where an error surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    Event,
    PrefixCommand,
    SlashCommand,
    Component,
    Modal,
}

impl Surface {
    pub fn label(self) -> &'static str {
        match self {
            Surface::Event => "event_error",
            Surface::PrefixCommand => "command_error",
            Surface::SlashCommand => "app_command_error",
            Surface::Component => "view_error",
            Surface::Modal => "modal_error",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorCategory {
    Conversion(String),
    MissingArgument { usage: String },
    MemberNotFound(String),
    BadArgument(String),
    CommandNotFound(String),
    PrivateMessageOnly,
    GuildOnly,
    NotOwner,
    MissingPermissions(Permissions),
    BotMissingPermissions(Permissions),
    CheckFailed(String),
    NsfwChannelRequired,
    DisabledCommand,
    CommandInvoke { kind: Option<&'static str>, detail: String },
    Cooldown { wait: Duration },
    MaxConcurrency { number: usize, per: &'static str },
    AlreadyResponded,
    Forbidden,
    StructureMismatch,
    Unclassified,
}

fn permission_list(permissions: Permissions) -> String {
    permissions.get_permission_names().join("` `")
}

impl ErrorCategory {
    pub fn kind(&self) -> &'static str {
        match self {
            ErrorCategory::Conversion(_) => "ConversionError",
            ErrorCategory::MissingArgument { .. } => "MissingRequiredArgument",
            ErrorCategory::MemberNotFound(_) => "MemberNotFound",
            ErrorCategory::BadArgument(_) => "BadArgument",
            ErrorCategory::CommandNotFound(_) => "CommandNotFound",
            ErrorCategory::PrivateMessageOnly => "PrivateMessageOnly",
            ErrorCategory::GuildOnly => "NoPrivateMessage",
            ErrorCategory::NotOwner => "NotOwner",
            ErrorCategory::MissingPermissions(_) => "MissingPermissions",
            ErrorCategory::BotMissingPermissions(_) => "BotMissingPermissions",
            ErrorCategory::CheckFailed(_) => "CheckFailure",
            ErrorCategory::NsfwChannelRequired => "NSFWChannelRequired",
            ErrorCategory::DisabledCommand => "DisabledCommand",
            ErrorCategory::CommandInvoke { .. } => "CommandInvokeError",
            ErrorCategory::Cooldown { .. } => "CommandOnCooldown",
            ErrorCategory::MaxConcurrency { .. } => "MaxConcurrencyReached",
            ErrorCategory::AlreadyResponded => "InteractionResponded",
            ErrorCategory::Forbidden => "Forbidden",
            ErrorCategory::StructureMismatch => "CommandSignatureMismatch",
            ErrorCategory::Unclassified => "Unclassified",
        }
    }

    /// Text shown to the user, `None` when the failure is not theirs to act on.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            ErrorCategory::Conversion(detail) | ErrorCategory::BadArgument(detail) | ErrorCategory::CheckFailed(detail) => format!("🕳️ {detail}"),
            ErrorCategory::MissingArgument { usage } => format!("🕳️ Something is missing. `{usage}`"),
            ErrorCategory::MemberNotFound(input) => format!("🕳️ Member `{input}` not found ! Don't hesitate to ping the requested member."),
            ErrorCategory::CommandNotFound(name) => format!("🕳️ Command `{name}` not found !"),
            ErrorCategory::PrivateMessageOnly => "🕳️ This command can't be used in a guild, try in direct message.".to_string(),
            ErrorCategory::GuildOnly => "🕳️ This command can't be used in direct messages.".to_string(),
            ErrorCategory::NotOwner => "🕳️ You must own this bot to run this command.".to_string(),
            ErrorCategory::MissingPermissions(missing) => format!("🕳️ Your account require the following permissions: `{}`.", permission_list(*missing)),
            ErrorCategory::BotMissingPermissions(missing) => {
                // Without SEND_MESSAGES the reply could not be delivered anyway.
                if missing.contains(Permissions::SEND_MESSAGES) {
                    return None;
                }
                format!("🕳️ The bot require the following permissions: `{}`.", permission_list(*missing))
            }
            ErrorCategory::NsfwChannelRequired => "🕳️ This command require an NSFW channel.".to_string(),
            ErrorCategory::DisabledCommand => "🕳️ Sorry this command is disabled.".to_string(),
            ErrorCategory::CommandInvoke { kind: Some(kind), detail } => format!("🕳️ `{kind}` : {detail}"),
            ErrorCategory::CommandInvoke { kind: None, detail } => format!("🕳️ {detail}"),
            ErrorCategory::Cooldown { wait } => format!("🕳️ Command is on cooldown, wait `{:.2}s` !", wait.as_secs_f64()),
            ErrorCategory::MaxConcurrency { number, per } => format!("🕳️ Max concurrency reached. Maximum number of concurrent invokers allowed: `{number}`, per `{per}`."),
            ErrorCategory::StructureMismatch => {
                "🕳️ Command was not found.. Seems to be a discord bug, probably due to desynchronization.\nMaybe there is multiple commands with the same name, you should try the other one.".to_string()
            }
            ErrorCategory::AlreadyResponded | ErrorCategory::Forbidden | ErrorCategory::Unclassified => return None,
        };
        Some(message)
    }
}

pub fn error_kind(error: &BotError) -> &'static str {
    match error {
        BotError::Serenity(serenity::Error::Http(_)) => "HttpError",
        BotError::Serenity(_) => "SerenityError",
        BotError::Config(_) => "ConfigError",
        BotError::ChannelGone(_) => "ChannelGone",
        BotError::AuditUnavailable(_) => "AuditUnavailable",
        BotError::CommandDisabled(_) => "CommandDisabled",
        BotError::MaxConcurrency { .. } => "MaxConcurrency",
        BotError::NotRoomOwner => "NotRoomOwner",
        BotError::InvalidInput(_) => "InvalidInput",
        BotError::UnknownComponent(_) => "UnknownComponent",
        BotError::MissingField(_) => "MissingField",
    }
}

/// Classifies an error the bot itself returned.
pub fn classify_bot_error(surface: Surface, error: &BotError) -> ErrorCategory {
    if error.is_forbidden() {
        return ErrorCategory::Forbidden;
    }
    if error.is_already_responded() {
        return ErrorCategory::AlreadyResponded;
    }

    match error {
        BotError::CommandDisabled(_) => ErrorCategory::DisabledCommand,
        BotError::MaxConcurrency { number, per } => ErrorCategory::MaxConcurrency { number: *number, per: *per },
        BotError::NotRoomOwner => ErrorCategory::CheckFailed(error.to_string()),
        BotError::InvalidInput(_) | BotError::MissingField(_) => ErrorCategory::BadArgument(error.to_string()),
        _ => match surface {
            Surface::PrefixCommand => ErrorCategory::CommandInvoke { kind: None, detail: error.to_string() },
            Surface::SlashCommand => ErrorCategory::CommandInvoke { kind: Some(error_kind(error)), detail: error.to_string() },
            Surface::Event | Surface::Component | Surface::Modal => ErrorCategory::Unclassified,
        },
    }
}

pub fn usage(prefix: &str, command: &str, parameters: &[String]) -> String {
    if parameters.is_empty() {
        format!("{prefix}{command}")
    } else {
        format!("{prefix}{command} <{}>", parameters.join("> <"))
    }
}

fn surface_of(ctx: Context<'_>) -> Surface {
    match ctx {
        poise::Context::Application(_) => Surface::SlashCommand,
        poise::Context::Prefix(_) => Surface::PrefixCommand,
    }
}

fn command_usage(ctx: Context<'_>) -> String {
    let command = ctx.command();
    let parameters: Vec<String> = command.parameters.iter().map(|parameter| parameter.name.clone()).collect();
    usage(ctx.prefix(), &command.qualified_name, &parameters)
}

fn subcommand_usage(ctx: Context<'_>) -> String {
    let command = ctx.command();
    let names: Vec<String> = command.subcommands.iter().map(|subcommand| subcommand.name.clone()).collect();
    usage(ctx.prefix(), &command.qualified_name, &[names.join("|")])
}

/// Classifies a framework error that carries a command context.
pub fn classify_command(ctx: Context<'_>, error: &FrameworkError<'_, Data, BotError>) -> ErrorCategory {
    let surface = surface_of(ctx);
    match error {
        FrameworkError::Command { error, .. } => classify_bot_error(surface, error),
        FrameworkError::ArgumentParse { error, input, .. } => {
            if error.is::<poise::TooFewArguments>() {
                ErrorCategory::MissingArgument { usage: command_usage(ctx) }
            } else if error.is::<MemberParseError>() || error.is::<UserParseError>() {
                ErrorCategory::MemberNotFound(input.clone().unwrap_or_default())
            } else {
                match input {
                    Some(input) => ErrorCategory::Conversion(format!("Could not understand `{input}`: {error}")),
                    None => ErrorCategory::MissingArgument { usage: command_usage(ctx) },
                }
            }
        }
        FrameworkError::SubcommandRequired { .. } => ErrorCategory::MissingArgument { usage: subcommand_usage(ctx) },
        FrameworkError::CommandStructureMismatch { .. } => ErrorCategory::StructureMismatch,
        FrameworkError::CooldownHit { remaining_cooldown, .. } => ErrorCategory::Cooldown { wait: *remaining_cooldown },
        FrameworkError::MissingBotPermissions { missing_permissions, .. } => ErrorCategory::BotMissingPermissions(*missing_permissions),
        FrameworkError::MissingUserPermissions { missing_permissions: Some(missing), .. } => ErrorCategory::MissingPermissions(*missing),
        FrameworkError::MissingUserPermissions { missing_permissions: None, .. } => ErrorCategory::CheckFailed("Your permissions could not be checked, try again later.".to_string()),
        FrameworkError::NotAnOwner { .. } => ErrorCategory::NotOwner,
        FrameworkError::GuildOnly { .. } => ErrorCategory::GuildOnly,
        FrameworkError::DmOnly { .. } => ErrorCategory::PrivateMessageOnly,
        FrameworkError::NsfwOnly { .. } => ErrorCategory::NsfwChannelRequired,
        FrameworkError::CommandCheckFailed { error: Some(error), .. } => match classify_bot_error(surface, error) {
            ErrorCategory::CommandInvoke { detail, .. } => ErrorCategory::CheckFailed(detail),
            category => category,
        },
        FrameworkError::CommandCheckFailed { error: None, .. } => ErrorCategory::CheckFailed("You can't use this command here.".to_string()),
        FrameworkError::CommandPanic { .. } => ErrorCategory::CommandInvoke { kind: Some("Panic"), detail: "the command crashed".to_string() },
        _ => ErrorCategory::Unclassified,
    }
}

/// One failure, as written to the audit channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorRecord {
    pub surface: Surface,
    pub kind: &'static str,
    pub detail: String,
    pub origin: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(surface: Surface, kind: &'static str, detail: impl Into<String>, origin: impl Into<String>) -> Self {
        ErrorRecord { surface, kind, detail: detail.into(), origin: origin.into(), occurred_at: Utc::now() }
    }

    pub fn to_notice(&self) -> Notice {
        let description = format!("message : `{}`\nerror : `{}`\nlevel : `{}`\norigin : `{}`", self.kind, self.detail, self.surface.label(), self.origin);
        let mut notice = Notice::new(Tone::Failure).title("Error").description(description);
        notice.timestamp = Some(self.occurred_at);
        notice
    }
}

/// Writes the record to the error log channel. Without one the failure is escalated instead of dropped.
pub async fn trace_error(config: &BotConfig, gateway: &dyn GuildGateway, record: &ErrorRecord) -> BotResult<()> {
    tracing::error!("[{}] {} in {}: {}", record.surface.label(), record.kind, record.origin, record.detail);
    let Some(channel) = config.settings.channels.error_log else {
        return Err(BotError::AuditUnavailable(format!("{}: {}", record.kind, record.detail)));
    };
    gateway.send_notice(channel, record.to_notice()).await
}

/// Returns false when the audit path itself failed and handling should stop.
async fn audit(data: &Data, record: &ErrorRecord) -> bool {
    match trace_error(&data.config, data.gateway.as_ref(), record).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Audit sink failed, giving up on {:?}: {}", record, e);
            false
        }
    }
}

pub async fn on_event_error(data: &Data, event: &str, error: BotError) {
    let record = ErrorRecord::new(Surface::Event, error_kind(&error), error.to_string(), event);
    audit(data, &record).await;
}

pub async fn on_interaction_error(ctx: &serenity::all::Context, data: &Data, surface: Surface, interaction: &Interaction, error: BotError) {
    let origin = match interaction {
        Interaction::Component(component) => format!("component `{}`", component.data.custom_id),
        Interaction::Modal(modal) => format!("modal `{}`", modal.data.custom_id),
        _ => "interaction".to_string(),
    };
    let category = classify_bot_error(surface, &error);
    let record = ErrorRecord::new(surface, error_kind(&error), error.to_string(), origin);
    if !audit(data, &record).await {
        return;
    }
    if matches!(category, ErrorCategory::Forbidden | ErrorCategory::AlreadyResponded) {
        return;
    }

    let text = category.user_message().unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
    let response = CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(text).ephemeral(true));
    let result = match interaction {
        Interaction::Component(component) => component.create_response(&ctx.http, response).await,
        Interaction::Modal(modal) => modal.create_response(&ctx.http, response).await,
        _ => Ok(()),
    };
    if let Err(e) = result {
        // Usually the interaction was acknowledged before the failure.
        tracing::debug!("Could not report the failure to the user: {}", e);
    }
}

async fn respond(ctx: Context<'_>, category: &ErrorCategory) {
    let message = category.user_message();
    match ctx {
        poise::Context::Application(_) => {
            let handle = match ctx.send(CreateReply::default().content(DEFAULT_ERROR_MESSAGE).ephemeral(true)).await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::debug!("Could not acknowledge the failed command: {}", e);
                    return;
                }
            };
            if let Some(message) = message {
                if let Err(e) = handle.edit(ctx, CreateReply::default().content(message)).await {
                    tracing::debug!("Could not edit the error reply: {}", e);
                }
            }
        }
        poise::Context::Prefix(_) => {
            let Some(message) = message else { return };
            if let Err(e) = ctx.say(message).await {
                tracing::debug!("Could not send the error reply: {}", e);
            }
        }
    }
}

async fn on_command_error(ctx: Context<'_>, error: FrameworkError<'_, Data, BotError>) {
    let surface = surface_of(ctx);
    let category = classify_command(ctx, &error);
    let detail = match &error {
        FrameworkError::Command { error, .. } => error.to_string(),
        FrameworkError::ArgumentParse { error, .. } => error.to_string(),
        FrameworkError::CommandCheckFailed { error: Some(error), .. } => error.to_string(),
        _ => category.user_message().unwrap_or_else(|| category.kind().to_string()),
    };
    let record = ErrorRecord::new(surface, category.kind(), detail, format!("command `{}`", ctx.command().qualified_name));
    if !audit(ctx.data(), &record).await {
        return;
    }
    if matches!(category, ErrorCategory::Forbidden | ErrorCategory::AlreadyResponded) {
        return;
    }
    respond(ctx, &category).await;
}

pub async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Setup { error, .. } => tracing::error!("Failed to start the bot: {}", error),
        FrameworkError::EventHandler { error, framework, .. } => on_event_error(framework.user_data, "event_handler", error).await,
        FrameworkError::UnknownCommand { ctx, msg, msg_content, framework, .. } => {
            let name = msg_content.split_whitespace().next().unwrap_or_default().to_string();
            let category = ErrorCategory::CommandNotFound(name.clone());
            let record = ErrorRecord::new(Surface::PrefixCommand, category.kind(), format!("Command \"{name}\" is not found"), format!("message {}", msg.id));
            if !audit(framework.user_data, &record).await {
                return;
            }
            if let Some(message) = category.user_message() {
                if let Err(e) = msg.channel_id.say(&ctx.http, message).await {
                    tracing::debug!("Could not send the error reply: {}", e);
                }
            }
        }
        error => match error.ctx() {
            Some(ctx) => on_command_error(ctx, error).await,
            None => tracing::warn!("Unhandled framework error without a command context"),
        },
    }
}

#[cfg(test)]
mod tests {
    use serenity::all::ChannelId;

    use super::*;
    use crate::config::tests::sample_settings;
    use crate::discord::gateway::tests::{Call, RecordingGateway};

    #[test]
    fn missing_argument_lists_every_parameter() {
        let usage = usage("!", "room limit", &["limit".to_string(), "reason".to_string()]);
        let message = ErrorCategory::MissingArgument { usage }.user_message().unwrap();
        assert_eq!(message, "🕳️ Something is missing. `!room limit <limit> <reason>`");
    }

    #[test]
    fn usage_without_parameters_is_just_the_command() {
        assert_eq!(usage("/", "panels", &[]), "/panels");
    }

    #[test]
    fn cooldown_message_carries_the_wait() {
        let message = ErrorCategory::Cooldown { wait: Duration::from_millis(3520) }.user_message().unwrap();
        assert_eq!(message, "🕳️ Command is on cooldown, wait `3.52s` !");
    }

    #[test]
    fn permission_messages_name_the_permissions() {
        let message = ErrorCategory::MissingPermissions(Permissions::MANAGE_GUILD).user_message().unwrap();
        assert!(message.contains("Manage Guild") || message.contains("Manage Server"), "{message}");

        let bot = ErrorCategory::BotMissingPermissions(Permissions::MANAGE_MESSAGES).user_message().unwrap();
        assert!(bot.starts_with("🕳️ The bot require"));
    }

    #[test]
    fn bot_without_send_messages_stays_quiet() {
        assert_eq!(ErrorCategory::BotMissingPermissions(Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES).user_message(), None);
    }

    #[test]
    fn delivery_and_unknown_failures_are_silent() {
        for category in [ErrorCategory::Forbidden, ErrorCategory::AlreadyResponded, ErrorCategory::Unclassified] {
            assert_eq!(category.user_message(), None);
        }
    }

    #[test]
    fn bot_errors_map_onto_categories() {
        assert_eq!(classify_bot_error(Surface::PrefixCommand, &BotError::CommandDisabled("panels".to_string())), ErrorCategory::DisabledCommand);
        assert_eq!(
            classify_bot_error(Surface::SlashCommand, &BotError::MaxConcurrency { number: 1, per: "guild" }),
            ErrorCategory::MaxConcurrency { number: 1, per: "guild" }
        );
        assert!(matches!(classify_bot_error(Surface::Modal, &BotError::MissingField("bio")), ErrorCategory::BadArgument(_)));
        assert_eq!(classify_bot_error(Surface::Component, &BotError::ChannelGone(ChannelId::new(1))), ErrorCategory::Unclassified);
    }

    #[test]
    fn invoke_errors_name_the_kind_only_for_slash_commands() {
        let error = BotError::ChannelGone(ChannelId::new(9));
        assert_eq!(classify_bot_error(Surface::PrefixCommand, &error).user_message().unwrap(), "🕳️ Channel 9 no longer exists");
        assert_eq!(classify_bot_error(Surface::SlashCommand, &error).user_message().unwrap(), "🕳️ `ChannelGone` : Channel 9 no longer exists");
    }

    #[tokio::test]
    async fn audit_posts_to_the_error_log() {
        let config = BotConfig::new(sample_settings(), None);
        let gateway = RecordingGateway::default();
        let record = ErrorRecord::new(Surface::Component, "MissingField", "Interaction is missing the `bio` field", "modal `intro:submit`");

        trace_error(&config, &gateway, &record).await.unwrap();

        let calls = gateway.calls();
        let Call::Notice(channel, notice) = &calls[0] else { panic!("expected a notice") };
        assert_eq!(*channel, ChannelId::new(13));
        assert_eq!(notice.tone, Tone::Failure);
        assert!(notice.description.as_deref().unwrap().contains("level : `view_error`"));
    }

    #[tokio::test]
    async fn missing_audit_channel_escalates() {
        let mut settings = sample_settings();
        settings.channels.error_log = None;
        let config = BotConfig::new(settings, None);
        let gateway = RecordingGateway::default();
        let record = ErrorRecord::new(Surface::Event, "HttpError", "boom", "voice_state_update");

        let result = trace_error(&config, &gateway, &record).await;

        assert!(matches!(result, Err(BotError::AuditUnavailable(_))));
        assert!(gateway.calls().is_empty());
    }
}
