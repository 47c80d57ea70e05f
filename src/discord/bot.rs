use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, Client, Context, FullEvent, GatewayIntents, GuildId, VoiceState};
use tokio::sync::Mutex;

use crate::config::{BotConfig, Settings};
use crate::discord::commands::{all_commands, check_enabled, Data, Error};
use crate::discord::errors::{on_error, on_event_error, trace_error, ErrorRecord, Surface};
use crate::discord::gateway::SerenityGateway;
use crate::discord::interactions;
use crate::discord::membership::{member_joined, member_left};
use crate::discord::view::{post_introduction_panel, post_role_panels};
use crate::discord::voice::{activity, lifecycle, transition_from_cache, VoiceLayout};
use crate::error::BotResult;

const EDIT_TRACKING_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct DiscordBot {
    guild_id: GuildId,
    client: Arc<Mutex<Client>>,
}

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_VOICE_STATES | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

async fn generator_category(ctx: &Context, generator: ChannelId) -> BotResult<Option<ChannelId>> {
    let channel = generator.to_channel(ctx).await?;
    Ok(channel.guild().and_then(|channel| channel.parent_id))
}

async fn setup(ctx: &Context, framework: &poise::Framework<Data, Error>, settings: Settings) -> BotResult<Data> {
    let guild_id = settings.guild_id;
    let category = generator_category(ctx, settings.channels.voice_generator).await?;
    if category.is_none() {
        tracing::warn!("Voice generator {} has no category, rooms will not be cleaned up", settings.channels.voice_generator);
    }

    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await?;

    let gateway = Arc::new(SerenityGateway::new(ctx.http.clone(), guild_id));
    let data = Data::new(BotConfig::new(settings, category), gateway);

    // A panel failure must not keep the bot offline.
    let posted = match post_role_panels(&ctx.http, &data.config).await {
        Ok(()) => post_introduction_panel(&ctx.http, &data.config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = posted {
        let record = ErrorRecord::new(Surface::Event, "PanelSetup", e.to_string(), "setup");
        if let Err(audit) = trace_error(&data.config, data.gateway.as_ref(), &record).await {
            tracing::error!("Could not report the panel failure: {}", audit);
        }
    }

    tracing::info!("Ready in guild {}", guild_id);
    Ok(data)
}

async fn on_voice_state_update(ctx: &Context, data: &Data, old: Option<&VoiceState>, new: &VoiceState) -> BotResult<()> {
    if new.guild_id != Some(data.config.settings.guild_id) {
        return Ok(());
    }
    let Some(transition) = transition_from_cache(ctx, old, new) else {
        return Ok(());
    };
    let layout = VoiceLayout::from_config(&data.config);
    let actions = lifecycle::plan(&layout, &transition);
    let (_, outcome) = tokio::join!(activity::announce(&layout, &transition, data.gateway.clone()), lifecycle::apply(actions, &data.rooms, data.gateway.clone()));
    outcome
}

async fn event_handler(ctx: &Context, event: &FullEvent, _framework: poise::FrameworkContext<'_, Data, Error>, data: &Data) -> Result<(), Error> {
    let guild_id = data.config.settings.guild_id;
    let (name, outcome) = match event {
        FullEvent::GuildMemberAddition { new_member } if new_member.guild_id == guild_id => ("guild_member_addition", member_joined(&data.config, data.gateway.as_ref(), new_member.user.id).await),
        FullEvent::GuildMemberRemoval { guild_id: left, user, .. } if *left == guild_id => ("guild_member_removal", member_left(&data.config, data.gateway.as_ref(), user.id).await),
        FullEvent::VoiceStateUpdate { old, new } => ("voice_state_update", on_voice_state_update(ctx, data, old.as_ref(), new).await),
        FullEvent::InteractionCreate { interaction } => {
            interactions::dispatch(ctx, data, interaction).await;
            return Ok(());
        }
        FullEvent::Ratelimit { data: info } => {
            tracing::warn!("Rate limited: {:?}", info);
            return Ok(());
        }
        _ => return Ok(()),
    };
    if let Err(e) = outcome {
        on_event_error(data, name, e).await;
    }
    Ok(())
}

impl DiscordBot {
    pub async fn new(settings: Settings) -> BotResult<Self> {
        let token = settings.token.clone();
        let guild_id = settings.guild_id;
        let prefix = settings.prefix.clone();

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: all_commands(),
                prefix_options: poise::PrefixFrameworkOptions {
                    prefix: Some(prefix),
                    edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(EDIT_TRACKING_WINDOW))),
                    ..Default::default()
                },
                on_error: |error| Box::pin(on_error(error)),
                command_check: Some(|ctx| Box::pin(check_enabled(ctx))),
                event_handler: |ctx, event, framework, data| Box::pin(event_handler(ctx, event, framework, data)),
                ..Default::default()
            })
            .setup(move |ctx, _ready, framework| Box::pin(setup(ctx, framework, settings)))
            .build();

        let client = Client::builder(&token, intents()).framework(framework).await?;
        Ok(DiscordBot { guild_id, client: Arc::new(Mutex::new(client)) })
    }

    pub async fn run_bot(&mut self) -> BotResult<()> {
        tracing::info!("Running discord bot for guild {}", self.guild_id);
        let client = Arc::clone(&self.client);
        let mut client_guard = client.lock().await;
        client_guard.start().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_cover_every_subscription() {
        let intents = intents();
        for needed in [GatewayIntents::GUILD_MEMBERS, GatewayIntents::GUILD_VOICE_STATES, GatewayIntents::GUILDS, GatewayIntents::MESSAGE_CONTENT] {
            assert!(intents.contains(needed));
        }
    }
}
