use std::sync::Arc;

use serenity::all::{ChannelId, Mention};

use crate::discord::gateway::GuildGateway;
use crate::discord::notice::{Notice, Tone};
use crate::discord::voice::{VoiceLayout, VoiceTransition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityNotice {
    Joined(ChannelId),
    Left(ChannelId),
}

pub fn plan_notices(layout: &VoiceLayout, transition: &VoiceTransition) -> Vec<ActivityNotice> {
    if transition.is_same_channel() {
        return vec![];
    }
    if transition.after.as_ref().is_some_and(|after| layout.is_generator(after)) {
        return vec![];
    }

    let mut notices = vec![];
    if let Some(after) = &transition.after {
        if layout.is_ephemeral_area(after) {
            notices.push(ActivityNotice::Joined(after.id));
        }
    }
    if let Some(before) = &transition.before {
        if !layout.is_generator(before) && layout.is_ephemeral_area(before) {
            notices.push(ActivityNotice::Left(before.id));
        }
    }
    notices
}

pub fn render(notice: ActivityNotice, transition: &VoiceTransition) -> Notice {
    let member = Mention::User(transition.member);
    let base = match notice {
        ActivityNotice::Joined(channel) => Notice::new(Tone::Positive).title("Joined").description(format!("{member} joined {}", Mention::Channel(channel))),
        ActivityNotice::Left(channel) => Notice::new(Tone::Negative).title("Left").description(format!("{member} left {}", Mention::Channel(channel))),
    };
    base.author(transition.display_name.clone(), transition.avatar_url.clone()).stamped_now()
}

/// Posts every notice, dropping failures: a leave notice often races the room's deletion.
pub async fn announce(layout: &VoiceLayout, transition: &VoiceTransition, gateway: Arc<dyn GuildGateway>) {
    for notice in plan_notices(layout, transition) {
        let channel = match notice {
            ActivityNotice::Joined(channel) | ActivityNotice::Left(channel) => channel,
        };
        if let Err(e) = gateway.send_notice(channel, render(notice, transition)).await {
            tracing::debug!("Dropped voice activity notice for {}: {}", channel, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::gateway::tests::{Call, RecordingGateway};
    use crate::discord::voice::tests::{channel, layout, transition, CATEGORY, GENERATOR, OTHER_CATEGORY};

    #[test]
    fn generator_transitions_are_silent() {
        assert!(plan_notices(&layout(), &transition(None, channel(GENERATOR, CATEGORY, 1))).is_empty());
        assert!(plan_notices(&layout(), &transition(channel(50, CATEGORY, 0), channel(GENERATOR, CATEGORY, 1))).is_empty());
    }

    #[test]
    fn leaving_the_generator_only_announces_the_room() {
        let notices = plan_notices(&layout(), &transition(channel(GENERATOR, CATEGORY, 0), channel(50, CATEGORY, 1)));
        assert_eq!(notices, vec![ActivityNotice::Joined(ChannelId::new(50))]);
    }

    #[test]
    fn moving_between_rooms_announces_both() {
        let notices = plan_notices(&layout(), &transition(channel(50, CATEGORY, 0), channel(51, CATEGORY, 2)));
        assert_eq!(notices, vec![ActivityNotice::Joined(ChannelId::new(51)), ActivityNotice::Left(ChannelId::new(50))]);
    }

    #[test]
    fn same_channel_and_foreign_channels_are_ignored() {
        assert!(plan_notices(&layout(), &transition(channel(50, CATEGORY, 1), channel(50, CATEGORY, 1))).is_empty());
        assert!(plan_notices(&layout(), &transition(channel(60, OTHER_CATEGORY, 0), None)).is_empty());
    }

    #[test]
    fn notices_mention_member_and_channel() {
        let notice = render(ActivityNotice::Left(ChannelId::new(50)), &transition(channel(50, CATEGORY, 0), None));
        assert_eq!(notice.tone, Tone::Negative);
        assert_eq!(notice.description.as_deref(), Some("<@1> left <#50>"));
        assert_eq!(notice.author, Some(("Alice".to_string(), None)));
    }

    #[tokio::test]
    async fn leave_notice_to_a_deleted_room_is_dropped() {
        let gateway = Arc::new(RecordingGateway::default());
        gateway.mark_gone(ChannelId::new(50));

        announce(&layout(), &transition(channel(50, CATEGORY, 0), channel(51, CATEGORY, 1)), gateway.clone()).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Notice(channel, _) if *channel == ChannelId::new(51)));
    }
}
