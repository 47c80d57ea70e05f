use serenity::all::{ActionRowComponent, CreateActionRow, CreateInputText, CreateModal, InputTextStyle, ModalInteractionData, UserId};

use crate::config::BotConfig;
use crate::discord::gateway::GuildGateway;
use crate::discord::notice::{mention, Notice, Tone};
use crate::discord::state::{INTRODUCTION_BIO, INTRODUCTION_LINK, INTRODUCTION_MODAL};
use crate::error::{BotError, BotResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Introduction {
    pub bio: String,
    pub link: Option<String>,
}

pub fn introduction_modal() -> CreateModal {
    let bio = CreateInputText::new(InputTextStyle::Short, "One-line introduction", INTRODUCTION_BIO).placeholder("Tell us about yourself in one line.").required(true);
    let link = CreateInputText::new(InputTextStyle::Short, "GitHub link", INTRODUCTION_LINK).placeholder("Leave empty if you don't have one.").required(false);
    CreateModal::new(INTRODUCTION_MODAL, "Introduce yourself").components(vec![CreateActionRow::InputText(bio), CreateActionRow::InputText(link)])
}

/// Pulls the two fields out of whatever rows the form came back with.
pub fn parse_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> BotResult<Introduction> {
    let mut bio = None;
    let mut link = None;
    for (custom_id, value) in fields {
        let value = value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string);
        match custom_id {
            INTRODUCTION_BIO => bio = value,
            INTRODUCTION_LINK => link = value,
            _ => {}
        }
    }
    Ok(Introduction { bio: bio.ok_or(BotError::MissingField("bio"))?, link })
}

pub fn parse_submission(data: &ModalInteractionData) -> BotResult<Introduction> {
    let fields = data.components.iter().flat_map(|row| row.components.iter()).filter_map(|component| match component {
        ActionRowComponent::InputText(input) => Some((input.custom_id.as_str(), input.value.as_deref())),
        _ => None,
    });
    parse_fields(fields)
}

pub fn announcement(member: UserId, name: &str, avatar_url: Option<String>, introduction: &Introduction) -> Notice {
    let mut notice = Notice::new(Tone::Neutral)
        .content(mention(member))
        .title("A new member joined us!")
        .field("One-line introduction", introduction.bio.clone())
        .author(name, avatar_url)
        .stamped_now();
    if let Some(link) = &introduction.link {
        notice = notice.field("GitHub link", link.clone());
    }
    notice
}

/// Grants the default role and announces the member in the main channel.
pub async fn welcome_introduction(config: &BotConfig, gateway: &dyn GuildGateway, member: UserId, name: &str, avatar_url: Option<String>, introduction: &Introduction) -> BotResult<()> {
    gateway.add_role(member, config.settings.default_role).await?;
    gateway.send_notice(config.settings.channels.main_chat, announcement(member, name, avatar_url, introduction)).await?;
    tracing::info!("{} introduced themselves", member);
    Ok(())
}

pub fn acknowledgement(member: UserId) -> String {
    format!("{} your introduction is posted.", mention(member))
}
