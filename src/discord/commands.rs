use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tokio::sync::Semaphore;

use crate::config::BotConfig;
use crate::discord::gateway::GuildGateway;
use crate::discord::notice::mention;
use crate::discord::view::{post_introduction_panel, post_role_panels};
use crate::discord::voice::rooms::Rooms;
use crate::error::BotError;

/// How many `panels` runs may overlap in the guild.
pub const PANEL_RUNS: usize = 1;
const MAX_ROOM_LIMIT: u32 = 99;
const MAX_ROOM_NAME: usize = 100;

/// State shared by every handler for the lifetime of the process.
pub struct Data {
    pub config: Arc<BotConfig>,
    pub gateway: Arc<dyn GuildGateway>,
    pub rooms: Rooms,
    pub panel_runs: Semaphore,
}

impl Data {
    pub fn new(config: BotConfig, gateway: Arc<dyn GuildGateway>) -> Self {
        let rooms = Rooms::new(config.settings.room_grace());
        Data { config: Arc::new(config), gateway, rooms, panel_runs: Semaphore::new(PANEL_RUNS) }
    }
}

pub type Error = BotError;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![help(), panels(), room()]
}

/// Rejects commands listed under `disabled_commands`.
pub async fn check_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    let command = ctx.command();
    let root = command.qualified_name.split_whitespace().next().unwrap_or(&command.name);
    if ctx.data().config.settings.is_command_disabled(root) || ctx.data().config.settings.is_command_disabled(&command.qualified_name) {
        return Err(BotError::CommandDisabled(command.qualified_name.clone()));
    }
    Ok(true)
}

/// Show this menu
#[poise::command(prefix_command, slash_command, track_edits)]
pub async fn help(ctx: Context<'_>, #[description = "Specific command to show help about"] command: Option<String>) -> Result<(), Error> {
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: "Voice rooms are created by joining the generator channel.",
        ephemeral: true,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}

/// Wipe and re-post the role and introduction panels.
#[poise::command(prefix_command, slash_command, guild_only, required_permissions = "MANAGE_GUILD", required_bot_permissions = "MANAGE_MESSAGES | SEND_MESSAGES")]
pub async fn panels(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let _permit = data.panel_runs.try_acquire().map_err(|_| BotError::MaxConcurrency { number: PANEL_RUNS, per: "guild" })?;

    ctx.defer_ephemeral().await?;
    let http = &ctx.serenity_context().http;
    post_role_panels(http, &data.config).await?;
    post_introduction_panel(http, &data.config).await?;
    ctx.say("Panels refreshed.").await?;
    Ok(())
}

/// Manage the voice room you own.
#[poise::command(prefix_command, slash_command, guild_only, subcommands("rename", "limit", "transfer"), subcommand_required)]
pub async fn room(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

fn voice_channel_of(ctx: Context<'_>, member: serenity::UserId) -> Option<serenity::ChannelId> {
    ctx.guild().and_then(|guild| guild.voice_states.get(&member).and_then(|state| state.channel_id))
}

async fn owned_room(ctx: Context<'_>) -> Result<serenity::ChannelId, Error> {
    let author = ctx.author().id;
    ctx.data().rooms.owned_by(author, voice_channel_of(ctx, author)).await
}

pub fn validate_room_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_ROOM_NAME {
        return Err(BotError::InvalidInput(format!("A room name has between 1 and {MAX_ROOM_NAME} characters.")));
    }
    Ok(name.to_string())
}

pub fn validate_room_limit(limit: u32) -> Result<u32, Error> {
    if limit > MAX_ROOM_LIMIT {
        return Err(BotError::InvalidInput(format!("The member limit goes from 0 (no limit) to {MAX_ROOM_LIMIT}.")));
    }
    Ok(limit)
}

/// Rename your voice room.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 10)]
pub async fn rename(ctx: Context<'_>, #[description = "New name of the room"] #[rest] name: String) -> Result<(), Error> {
    let name = validate_room_name(&name)?;
    let room = owned_room(ctx).await?;
    ctx.data().gateway.rename_channel(room, name.clone()).await?;
    ctx.say(format!("Your room is now called `{name}`.")).await?;
    Ok(())
}

/// Cap how many members can join your voice room.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 10)]
pub async fn limit(ctx: Context<'_>, #[description = "Maximum members, 0 removes the limit"] #[max = 99] limit: u32) -> Result<(), Error> {
    let limit = validate_room_limit(limit)?;
    let room = owned_room(ctx).await?;
    ctx.data().gateway.limit_channel(room, limit).await?;
    let message = if limit == 0 { "Your room no longer has a member limit.".to_string() } else { format!("Your room now holds at most {limit} members.") };
    ctx.say(message).await?;
    Ok(())
}

/// Hand your voice room over to another member inside it.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 10)]
pub async fn transfer(ctx: Context<'_>, #[description = "Member taking over the room"] member: serenity::Member) -> Result<(), Error> {
    let room = owned_room(ctx).await?;
    let new_owner = member.user.id;
    if member.user.bot || new_owner == ctx.author().id {
        return Err(BotError::InvalidInput("Pick another member to take over the room.".to_string()));
    }
    if voice_channel_of(ctx, new_owner) != Some(room) {
        return Err(BotError::InvalidInput(format!("{} has to be inside your room.", mention(new_owner))));
    }
    if ctx.data().rooms.room_of(new_owner).await.is_some() {
        return Err(BotError::InvalidInput(format!("{} already owns a room.", mention(new_owner))));
    }

    let data = ctx.data();
    data.gateway.grant_owner(room, new_owner).await?;
    data.gateway.revoke_owner(room, ctx.author().id).await?;
    data.rooms.transfer(room, new_owner).await;
    tracing::info!("Room {} handed from {} to {}", room, ctx.author().id, new_owner);
    ctx.say(format!("{} now owns this room.", mention(new_owner))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_are_trimmed_and_bounded() {
        assert_eq!(validate_room_name("  chill  ").unwrap(), "chill");
        assert!(matches!(validate_room_name("   "), Err(BotError::InvalidInput(_))));
        assert!(validate_room_name(&"a".repeat(101)).is_err());
        assert!(validate_room_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn room_limit_stays_within_discord_bounds() {
        assert_eq!(validate_room_limit(0).unwrap(), 0);
        assert_eq!(validate_room_limit(99).unwrap(), 99);
        assert!(matches!(validate_room_limit(100), Err(BotError::InvalidInput(_))));
    }

    #[test]
    fn every_command_is_registered() {
        let names: Vec<String> = all_commands().into_iter().map(|command| command.name).collect();
        assert_eq!(names, vec!["help", "panels", "room"]);
    }

    #[test]
    fn room_subcommands_share_a_cooldown() {
        let room = room();
        let subcommands: Vec<&str> = room.subcommands.iter().map(|command| command.name.as_str()).collect();
        assert_eq!(subcommands, vec!["rename", "limit", "transfer"]);
        assert!(room.subcommand_required);
    }
}
