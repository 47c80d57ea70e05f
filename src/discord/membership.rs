use serenity::all::UserId;

use crate::config::BotConfig;
use crate::discord::gateway::GuildGateway;
use crate::discord::notice::{mention, Notice, Tone};
use crate::error::BotResult;

pub fn welcome_notice(member: UserId) -> Notice {
    Notice::new(Tone::Positive).description(format!("{} joined the server.", mention(member))).stamped_now()
}

pub fn goodbye_notice(member: UserId) -> Notice {
    Notice::new(Tone::Positive).description(format!("{} left the server.", mention(member))).stamped_now()
}

pub async fn member_joined(config: &BotConfig, gateway: &dyn GuildGateway, member: UserId) -> BotResult<()> {
    tracing::info!("Member {} joined", member);
    gateway.send_notice(config.settings.channels.welcome, welcome_notice(member)).await
}

pub async fn member_left(config: &BotConfig, gateway: &dyn GuildGateway, member: UserId) -> BotResult<()> {
    tracing::info!("Member {} left", member);
    gateway.send_notice(config.settings.channels.goodbye, goodbye_notice(member)).await
}

#[cfg(test)]
mod tests {
    use serenity::all::ChannelId;

    use super::*;
    use crate::config::tests::sample_settings;
    use crate::discord::gateway::tests::{Call, RecordingGateway};

    #[tokio::test]
    async fn join_posts_one_welcome_embed() {
        let config = BotConfig::new(sample_settings(), None);
        let gateway = RecordingGateway::default();

        member_joined(&config, &gateway, UserId::new(42)).await.unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        let Call::Notice(channel, notice) = &calls[0] else { panic!("expected a notice") };
        assert_eq!(*channel, ChannelId::new(11));
        assert!(notice.description.as_deref().unwrap().contains("<@42>"));
        assert_eq!(notice.tone, Tone::Positive);
    }

    #[tokio::test]
    async fn leave_goes_to_the_goodbye_channel() {
        let config = BotConfig::new(sample_settings(), None);
        let gateway = RecordingGateway::default();

        member_left(&config, &gateway, UserId::new(42)).await.unwrap();

        let calls = gateway.calls();
        let Call::Notice(channel, notice) = &calls[0] else { panic!("expected a notice") };
        assert_eq!(*channel, ChannelId::new(12));
        assert_eq!(notice.tone, Tone::Positive);
    }

    #[tokio::test]
    async fn delivery_failures_propagate() {
        let config = BotConfig::new(sample_settings(), None);
        let gateway = RecordingGateway::default();
        gateway.mark_gone(ChannelId::new(11));

        assert!(member_joined(&config, &gateway, UserId::new(42)).await.is_err());
    }
}
