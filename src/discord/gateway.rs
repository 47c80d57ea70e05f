use std::sync::Arc;

use serenity::all::{
    ChannelId, ChannelType, CreateChannel, CreateMessage, EditChannel, GuildId, Http, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use serenity::async_trait;

use crate::discord::notice::Notice;
use crate::error::{discord_code, BotError, BotResult};

const UNKNOWN_CHANNEL: isize = 10003;

/// Request for a member's personal voice room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomRequest {
    pub owner: UserId,
    pub name: String,
    pub category: Option<ChannelId>,
}

/// Access the owner of a room gets: manage it and connect, but no moderation over others.
pub fn owner_overwrite(owner: UserId) -> PermissionOverwrite {
    PermissionOverwrite {
        allow: Permissions::MANAGE_CHANNELS | Permissions::CONNECT,
        deny: Permissions::MUTE_MEMBERS | Permissions::DEAFEN_MEMBERS | Permissions::MOVE_MEMBERS,
        kind: PermissionOverwriteType::Member(owner),
    }
}

/// Every call the handlers make into the guild.
#[async_trait]
pub trait GuildGateway: Send + Sync {
    async fn send_notice(&self, channel: ChannelId, notice: Notice) -> BotResult<()>;
    async fn create_room(&self, request: RoomRequest) -> BotResult<ChannelId>;
    async fn move_member(&self, member: UserId, channel: ChannelId) -> BotResult<()>;
    async fn delete_channel(&self, channel: ChannelId) -> BotResult<()>;
    async fn rename_channel(&self, channel: ChannelId, name: String) -> BotResult<()>;
    async fn limit_channel(&self, channel: ChannelId, user_limit: u32) -> BotResult<()>;
    async fn grant_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()>;
    async fn revoke_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()>;
    async fn add_role(&self, member: UserId, role: RoleId) -> BotResult<()>;
    async fn remove_role(&self, member: UserId, role: RoleId) -> BotResult<()>;
}

pub struct SerenityGateway {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        SerenityGateway { http, guild_id }
    }
}

/// Maps "Unknown Channel" responses onto [`BotError::ChannelGone`].
fn on_channel(channel: ChannelId, error: serenity::Error) -> BotError {
    let error = BotError::from(error);
    if discord_code(&error) == Some(UNKNOWN_CHANNEL) {
        BotError::ChannelGone(channel)
    } else {
        error
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn send_notice(&self, channel: ChannelId, notice: Notice) -> BotResult<()> {
        let mut message = CreateMessage::new().embed(notice.to_embed());
        if let Some(content) = &notice.content {
            message = message.content(content);
        }
        channel.send_message(&self.http, message).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn create_room(&self, request: RoomRequest) -> BotResult<ChannelId> {
        let mut builder = CreateChannel::new(request.name).kind(ChannelType::Voice).permissions(vec![owner_overwrite(request.owner)]);
        if let Some(category) = request.category {
            builder = builder.category(category);
        }
        let channel = self.guild_id.create_channel(&self.http, builder).await?;
        Ok(channel.id)
    }

    async fn move_member(&self, member: UserId, channel: ChannelId) -> BotResult<()> {
        self.guild_id.move_member(&self.http, member, channel).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> BotResult<()> {
        channel.delete(&self.http).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: String) -> BotResult<()> {
        channel.edit(&self.http, EditChannel::new().name(name)).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn limit_channel(&self, channel: ChannelId, user_limit: u32) -> BotResult<()> {
        channel.edit(&self.http, EditChannel::new().user_limit(user_limit)).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn grant_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()> {
        channel.create_permission(&self.http, owner_overwrite(owner)).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn revoke_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()> {
        channel.delete_permission(&self.http, PermissionOverwriteType::Member(owner)).await.map_err(|e| on_channel(channel, e))?;
        Ok(())
    }

    async fn add_role(&self, member: UserId, role: RoleId) -> BotResult<()> {
        self.http.add_member_role(self.guild_id, member, role, Some("self-service role")).await?;
        Ok(())
    }

    async fn remove_role(&self, member: UserId, role: RoleId) -> BotResult<()> {
        self.http.remove_member_role(self.guild_id, member, role, Some("self-service role")).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Notice(ChannelId, Notice),
        Create(RoomRequest),
        Move(UserId, ChannelId),
        Delete(ChannelId),
        Rename(ChannelId, String),
        Limit(ChannelId, u32),
        GrantOwner(ChannelId, UserId),
        RevokeOwner(ChannelId, UserId),
        AddRole(UserId, RoleId),
        RemoveRole(UserId, RoleId),
    }

    /// In-memory guild that records every call.
    #[derive(Default)]
    pub(crate) struct RecordingGateway {
        pub(crate) calls: Mutex<Vec<Call>>,
        pub(crate) roles: Mutex<HashMap<UserId, HashSet<RoleId>>>,
        pub(crate) gone: Mutex<HashSet<ChannelId>>,
        next_channel: Mutex<u64>,
    }

    impl RecordingGateway {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn mark_gone(&self, channel: ChannelId) {
            self.gone.lock().unwrap().insert(channel);
        }

        pub(crate) fn held_roles(&self, member: UserId) -> HashSet<RoleId> {
            self.roles.lock().unwrap().get(&member).cloned().unwrap_or_default()
        }

        pub(crate) fn give_roles(&self, member: UserId, roles: &[RoleId]) {
            self.roles.lock().unwrap().entry(member).or_default().extend(roles.iter().copied());
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn check(&self, channel: ChannelId) -> BotResult<()> {
            if self.gone.lock().unwrap().contains(&channel) {
                Err(BotError::ChannelGone(channel))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GuildGateway for RecordingGateway {
        async fn send_notice(&self, channel: ChannelId, notice: Notice) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::Notice(channel, notice));
            Ok(())
        }

        async fn create_room(&self, request: RoomRequest) -> BotResult<ChannelId> {
            self.record(Call::Create(request));
            let mut next = self.next_channel.lock().unwrap();
            *next += 1;
            Ok(ChannelId::new(9000 + *next))
        }

        async fn move_member(&self, member: UserId, channel: ChannelId) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::Move(member, channel));
            Ok(())
        }

        async fn delete_channel(&self, channel: ChannelId) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::Delete(channel));
            self.mark_gone(channel);
            Ok(())
        }

        async fn rename_channel(&self, channel: ChannelId, name: String) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::Rename(channel, name));
            Ok(())
        }

        async fn limit_channel(&self, channel: ChannelId, user_limit: u32) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::Limit(channel, user_limit));
            Ok(())
        }

        async fn grant_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::GrantOwner(channel, owner));
            Ok(())
        }

        async fn revoke_owner(&self, channel: ChannelId, owner: UserId) -> BotResult<()> {
            self.check(channel)?;
            self.record(Call::RevokeOwner(channel, owner));
            Ok(())
        }

        async fn add_role(&self, member: UserId, role: RoleId) -> BotResult<()> {
            self.record(Call::AddRole(member, role));
            self.roles.lock().unwrap().entry(member).or_default().insert(role);
            Ok(())
        }

        async fn remove_role(&self, member: UserId, role: RoleId) -> BotResult<()> {
            self.record(Call::RemoveRole(member, role));
            self.roles.lock().unwrap().entry(member).or_default().remove(&role);
            Ok(())
        }
    }

    #[test]
    fn owner_overwrite_grants_management_without_moderation() {
        let overwrite = owner_overwrite(UserId::new(7));
        assert!(overwrite.allow.contains(Permissions::MANAGE_CHANNELS | Permissions::CONNECT));
        assert!(!overwrite.allow.intersects(Permissions::MUTE_MEMBERS | Permissions::DEAFEN_MEMBERS | Permissions::MOVE_MEMBERS));
        assert!(overwrite.deny.contains(Permissions::MUTE_MEMBERS | Permissions::DEAFEN_MEMBERS | Permissions::MOVE_MEMBERS));
        assert_eq!(overwrite.kind, PermissionOverwriteType::Member(UserId::new(7)));
    }
}
