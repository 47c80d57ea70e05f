use std::sync::Arc;

use serenity::all::{ChannelId, UserId};

use crate::discord::gateway::{GuildGateway, RoomRequest};
use crate::discord::voice::rooms::Rooms;
use crate::discord::voice::{VoiceLayout, VoiceTransition};
use crate::error::{BotError, BotResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
    OpenRoom { owner: UserId, name: String, category: Option<ChannelId> },
    CancelDeletion(ChannelId),
    ScheduleDeletion(ChannelId),
}

pub fn room_name(display_name: &str) -> String {
    format!("{display_name}'s room")
}

/// Deletion of the vacated room is planned first, so reusing that same room cancels it again.
pub fn plan(layout: &VoiceLayout, transition: &VoiceTransition) -> Vec<LifecycleAction> {
    let mut actions = vec![];

    if let Some(before) = &transition.before {
        if !transition.is_same_channel() && !layout.is_generator(before) && layout.is_ephemeral_area(before) && before.occupants == 0 {
            actions.push(LifecycleAction::ScheduleDeletion(before.id));
        }
    }

    if let Some(after) = &transition.after {
        if layout.is_generator(after) {
            actions.push(LifecycleAction::OpenRoom { owner: transition.member, name: room_name(&transition.display_name), category: layout.category });
        } else if layout.is_ephemeral_area(after) {
            actions.push(LifecycleAction::CancelDeletion(after.id));
        }
    }

    actions
}

pub async fn apply(actions: Vec<LifecycleAction>, rooms: &Rooms, gateway: Arc<dyn GuildGateway>) -> BotResult<()> {
    for action in actions {
        match action {
            LifecycleAction::OpenRoom { owner, name, category } => open_room(owner, name, category, rooms, gateway.clone()).await?,
            LifecycleAction::CancelDeletion(channel) => {
                rooms.cancel_deletion(channel).await;
            }
            LifecycleAction::ScheduleDeletion(channel) => rooms.schedule_deletion(channel, gateway.clone()).await,
        }
    }
    Ok(())
}

async fn open_room(owner: UserId, name: String, category: Option<ChannelId>, rooms: &Rooms, gateway: Arc<dyn GuildGateway>) -> BotResult<()> {
    // A member keeps a single room, send them back to it if it still exists.
    if let Some(existing) = rooms.room_of(owner).await {
        match gateway.move_member(owner, existing).await {
            Ok(()) => {
                rooms.cancel_deletion(existing).await;
                return Ok(());
            }
            Err(BotError::ChannelGone(_)) => rooms.forget(existing).await,
            Err(e) => return Err(e),
        }
    }

    let room = gateway.create_room(RoomRequest { owner, name, category }).await?;
    rooms.register(owner, room).await;
    tracing::info!("Opened room {} for {}", room, owner);

    if let Err(e) = gateway.move_member(owner, room).await {
        // The member left before the move landed, the new room would never empty on its own.
        rooms.schedule_deletion(room, gateway).await;
        return Err(e);
    }
    Ok(())
}
