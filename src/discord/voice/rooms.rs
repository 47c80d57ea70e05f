use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, UserId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::discord::gateway::GuildGateway;
use crate::error::BotError;

/// Ephemeral rooms the bot opened, and the deletions waiting on them.
#[derive(Clone)]
pub struct Rooms {
    grace: Duration,
    inner: Arc<Mutex<RoomsInner>>,
}

#[derive(Default)]
struct RoomsInner {
    owners: HashMap<UserId, ChannelId>,
    pending: HashMap<ChannelId, PendingDeletion>,
    generation: u64,
}

struct PendingDeletion {
    generation: u64,
    task: JoinHandle<()>,
}

impl Rooms {
    pub fn new(grace: Duration) -> Self {
        Rooms { grace, inner: Arc::new(Mutex::new(RoomsInner::default())) }
    }

    pub async fn room_of(&self, owner: UserId) -> Option<ChannelId> {
        self.inner.lock().await.owners.get(&owner).copied()
    }

    #[cfg(test)]
    pub async fn owner_of(&self, channel: ChannelId) -> Option<UserId> {
        let inner = self.inner.lock().await;
        inner.owners.iter().find(|(_, room)| **room == channel).map(|(owner, _)| *owner)
    }

    /// The room `member` is sitting in, provided they own it.
    pub async fn owned_by(&self, member: UserId, current: Option<ChannelId>) -> Result<ChannelId, BotError> {
        match (current, self.room_of(member).await) {
            (Some(current), Some(room)) if current == room => Ok(room),
            _ => Err(BotError::NotRoomOwner),
        }
    }

    pub async fn register(&self, owner: UserId, channel: ChannelId) {
        self.inner.lock().await.owners.insert(owner, channel);
    }

    pub async fn forget(&self, channel: ChannelId) {
        self.inner.lock().await.owners.retain(|_, room| *room != channel);
    }

    pub async fn transfer(&self, channel: ChannelId, new_owner: UserId) {
        let mut inner = self.inner.lock().await;
        inner.owners.retain(|_, room| *room != channel);
        inner.owners.insert(new_owner, channel);
    }

    #[cfg(test)]
    pub async fn is_pending(&self, channel: ChannelId) -> bool {
        self.inner.lock().await.pending.contains_key(&channel)
    }

    /// Deletes `channel` once the grace period passes, replacing any timer already armed for it.
    pub async fn schedule_deletion(&self, channel: ChannelId, gateway: Arc<dyn GuildGateway>) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let generation = inner.generation;

        let rooms = self.clone();
        let grace = self.grace;
        let task = tokio::spawn(async move {
            sleep(grace).await;
            rooms.expire(channel, generation, gateway).await;
        });

        if let Some(previous) = inner.pending.insert(channel, PendingDeletion { generation, task }) {
            previous.task.abort();
        }
        tracing::debug!("Room {} will be deleted in {:?}", channel, grace);
    }

    /// Returns true when a pending deletion was aborted.
    pub async fn cancel_deletion(&self, channel: ChannelId) -> bool {
        match self.inner.lock().await.pending.remove(&channel) {
            Some(pending) => {
                pending.task.abort();
                tracing::debug!("Room {} was rejoined, deletion cancelled", channel);
                true
            }
            None => false,
        }
    }

    async fn expire(&self, channel: ChannelId, generation: u64, gateway: Arc<dyn GuildGateway>) {
        {
            let mut inner = self.inner.lock().await;
            match inner.pending.get(&channel) {
                Some(pending) if pending.generation == generation => {
                    inner.pending.remove(&channel);
                }
                _ => return,
            }
        }

        match gateway.delete_channel(channel).await {
            Ok(()) => tracing::info!("Deleted empty room {}", channel),
            Err(BotError::ChannelGone(_)) => tracing::debug!("Room {} was already deleted", channel),
            Err(e) => tracing::warn!("Failed to delete empty room {}: {}", channel, e),
        }
        self.forget(channel).await;
    }
}
