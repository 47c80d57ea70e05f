use std::sync::Arc;

use serenity::all::{ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateMessage, GetMessages, Http, ReactionType};

use crate::config::{BotConfig, RolePanel};
use crate::discord::notice::{Notice, Tone};
use crate::discord::state::ComponentAction;
use crate::error::BotResult;

const BUTTONS_PER_ROW: usize = 5;

pub fn role_panel_buttons(panel: &RolePanel) -> Vec<CreateActionRow> {
    panel
        .buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            let buttons = row
                .iter()
                .map(|button| {
                    let custom_id = ComponentAction::ToggleRole { panel: panel.key.clone(), role: button.role }.to_string();
                    let mut created = CreateButton::new(custom_id).label(&button.label).style(ButtonStyle::Primary);
                    if let Some(emoji) = &button.emoji {
                        created = created.emoji(ReactionType::Unicode(emoji.clone()));
                    }
                    created
                })
                .collect();
            CreateActionRow::Buttons(buttons)
        })
        .collect()
}

pub fn role_panel_message(panel: &RolePanel) -> CreateMessage {
    let notice = Notice::new(Tone::Neutral).title(&panel.title).description(&panel.description);
    CreateMessage::new().embed(notice.to_embed()).components(role_panel_buttons(panel))
}

pub fn introduction_panel_message(config: &BotConfig) -> CreateMessage {
    let notice = Notice::new(Tone::Neutral)
        .title("Introductions")
        .description("Introduce yourself to get access to the rest of the server.")
        .footer("modoco", config.settings.server_icon_url.clone());
    let button = CreateButton::new(ComponentAction::OpenIntroduction.to_string()).label("Introduce yourself").style(ButtonStyle::Primary);
    CreateMessage::new().embed(notice.to_embed()).components(vec![CreateActionRow::Buttons(vec![button])])
}

/// Deletes every message left in the channel, 100 at a time.
pub async fn clear_all_messages(http: &Arc<Http>, channel_id: ChannelId) -> BotResult<()> {
    loop {
        let previous_messages = channel_id.messages(http, GetMessages::new().limit(100)).await?;
        if previous_messages.is_empty() {
            return Ok(());
        }
        for message in previous_messages {
            http.delete_message(channel_id, message.id, None).await?;
        }
    }
}

pub async fn post_role_panels(http: &Arc<Http>, config: &BotConfig) -> BotResult<()> {
    let channel_id = config.settings.channels.role_assignment;
    clear_all_messages(http, channel_id).await?;
    for panel in &config.settings.role_panels {
        channel_id.send_message(http, role_panel_message(panel)).await?;
    }
    tracing::info!("Posted {} role panels to {}", config.settings.role_panels.len(), channel_id);
    Ok(())
}

pub async fn post_introduction_panel(http: &Arc<Http>, config: &BotConfig) -> BotResult<()> {
    let channel_id = config.settings.channels.self_description;
    clear_all_messages(http, channel_id).await?;
    channel_id.send_message(http, introduction_panel_message(config)).await?;
    tracing::info!("Posted the introduction panel to {}", channel_id);
    Ok(())
}
