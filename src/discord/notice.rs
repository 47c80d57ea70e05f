use chrono::{DateTime, Utc};
use serenity::all::{Colour, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, Mention, UserId};

/// An announcement the bot posts, kept free of serenity builders so handlers can be tested.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tone: Tone,
    pub author: Option<(String, Option<String>)>,
    pub footer: Option<(String, Option<String>)>,
    pub fields: Vec<(String, String)>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
    Failure,
}

impl Tone {
    fn colour(self) -> Colour {
        match self {
            Tone::Positive => Colour::DARK_GREEN,
            Tone::Negative => Colour::RED,
            Tone::Neutral => Colour::BLUE,
            Tone::Failure => Colour::DARK_RED,
        }
    }
}

impl Notice {
    pub fn new(tone: Tone) -> Self {
        Notice { content: None, title: None, description: None, tone, author: None, footer: None, fields: vec![], timestamp: None }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some((name.into(), icon_url));
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some((text.into(), icon_url));
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn stamped_now(mut self) -> Self {
        self.timestamp = Some(Utc::now());
        self
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new().colour(self.tone.colour());
        if let Some(title) = &self.title {
            embed = embed.title(title);
        }
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        if let Some((name, icon_url)) = &self.author {
            let mut author = CreateEmbedAuthor::new(name);
            if let Some(icon_url) = icon_url {
                author = author.icon_url(icon_url);
            }
            embed = embed.author(author);
        }
        if let Some((text, icon_url)) = &self.footer {
            let mut footer = CreateEmbedFooter::new(text);
            if let Some(icon_url) = icon_url {
                footer = footer.icon_url(icon_url);
            }
            embed = embed.footer(footer);
        }
        for (name, value) in &self.fields {
            embed = embed.field(name, value, false);
        }
        if let Some(timestamp) = self.timestamp {
            embed = embed.timestamp(timestamp);
        }
        embed
    }
}

pub fn mention(user: UserId) -> String {
    Mention::User(user).to_string()
}
