pub(crate) mod activity;
pub(crate) mod lifecycle;
pub(crate) mod rooms;

use serenity::all::{ChannelId, Context, GuildId, UserId, VoiceState};

use crate::config::BotConfig;

/// Where the generator slot lives; every room under its category is ephemeral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceLayout {
    pub generator: ChannelId,
    pub category: Option<ChannelId>,
}

impl VoiceLayout {
    pub fn from_config(config: &BotConfig) -> Self {
        VoiceLayout { generator: config.generator(), category: config.generator_category }
    }

    pub fn is_generator(&self, channel: &ChannelSnapshot) -> bool {
        channel.id == self.generator
    }

    /// Rooms share the generator's category; without a category nothing counts.
    pub fn is_ephemeral_area(&self, channel: &ChannelSnapshot) -> bool {
        self.category.is_some() && channel.category == self.category
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub category: Option<ChannelId>,
    /// Members connected after the event was applied.
    pub occupants: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceTransition {
    pub member: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub before: Option<ChannelSnapshot>,
    pub after: Option<ChannelSnapshot>,
}

impl VoiceTransition {
    pub fn is_same_channel(&self) -> bool {
        matches!((&self.before, &self.after), (Some(before), Some(after)) if before.id == after.id)
    }
}

fn snapshot(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelSnapshot> {
    let guild = ctx.cache.guild(guild_id)?;
    let category = guild.channels.get(&channel_id).and_then(|channel| channel.parent_id);
    let occupants = guild.voice_states.values().filter(|state| state.channel_id == Some(channel_id)).count();
    Some(ChannelSnapshot { id: channel_id, category, occupants })
}

/// Builds a transition from the cache, which serenity updates before handlers run.
pub fn transition_from_cache(ctx: &Context, old: Option<&VoiceState>, new: &VoiceState) -> Option<VoiceTransition> {
    let guild_id = new.guild_id?;

    let (display_name, avatar_url) = match &new.member {
        Some(member) => (member.display_name().to_string(), Some(member.face())),
        None => (new.user_id.to_string(), None),
    };

    let before = old.and_then(|state| state.channel_id).and_then(|channel| snapshot(ctx, guild_id, channel));
    let after = new.channel_id.and_then(|channel| snapshot(ctx, guild_id, channel));

    Some(VoiceTransition { member: new.user_id, display_name, avatar_url, before, after })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const GENERATOR: u64 = 17;
    pub(crate) const CATEGORY: u64 = 40;
    pub(crate) const OTHER_CATEGORY: u64 = 41;

    pub(crate) fn layout() -> VoiceLayout {
        VoiceLayout { generator: ChannelId::new(GENERATOR), category: Some(ChannelId::new(CATEGORY)) }
    }

    pub(crate) fn channel(id: u64, category: u64, occupants: usize) -> Option<ChannelSnapshot> {
        Some(ChannelSnapshot { id: ChannelId::new(id), category: Some(ChannelId::new(category)), occupants })
    }

    pub(crate) fn transition(before: Option<ChannelSnapshot>, after: Option<ChannelSnapshot>) -> VoiceTransition {
        VoiceTransition { member: UserId::new(1), display_name: "Alice".to_string(), avatar_url: None, before, after }
    }

    #[test]
    fn missing_category_means_no_ephemeral_area() {
        let layout = VoiceLayout { generator: ChannelId::new(GENERATOR), category: None };
        let orphan = ChannelSnapshot { id: ChannelId::new(5), category: None, occupants: 0 };
        assert!(!layout.is_ephemeral_area(&orphan));
    }

    #[test]
    fn same_channel_needs_both_sides() {
        assert!(transition(channel(5, CATEGORY, 1), channel(5, CATEGORY, 1)).is_same_channel());
        assert!(!transition(None, channel(5, CATEGORY, 1)).is_same_channel());
        assert!(!transition(channel(5, CATEGORY, 1), channel(6, CATEGORY, 1)).is_same_channel());
    }
}
