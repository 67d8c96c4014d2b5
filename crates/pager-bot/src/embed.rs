//! Embed construction from a flat description.

use chrono::{DateTime, Utc};
use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use serenity::model::Timestamp;

/// Colour of error reports.
pub const RED: u32 = 0xE74C3C;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedTime {
    Now,
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Everything an embed can carry; unset parts are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub colour: Option<u32>,
    pub url: Option<String>,
    pub timestamp: Option<EmbedTime>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub footer: Option<String>,
    pub footer_icon_url: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub author_icon_url: Option<String>,
    pub fields: Vec<EmbedField>,
}

impl EmbedSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn timestamp(mut self, timestamp: EmbedTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Only shown when a footer text is set.
    pub fn footer_icon_url(mut self, url: impl Into<String>) -> Self {
        self.footer_icon_url = Some(url.into());
        self
    }

    pub fn author(mut self, name: impl Into<String>) -> Self {
        self.author = Some(name.into());
        self
    }

    /// Only shown when an author name is set.
    pub fn author_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = Some(url.into());
        self
    }

    /// Only shown when an author name is set.
    pub fn author_icon_url(mut self, url: impl Into<String>) -> Self {
        self.author_icon_url = Some(url.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Build a serenity embed from `spec`.
pub fn embed(spec: &EmbedSpec) -> CreateEmbed {
    let mut embed = CreateEmbed::new();

    if let Some(title) = &spec.title {
        embed = embed.title(title);
    }
    if let Some(description) = &spec.description {
        embed = embed.description(description);
    }
    if let Some(colour) = spec.colour {
        embed = embed.colour(colour);
    }
    if let Some(url) = &spec.url {
        embed = embed.url(url);
    }

    match &spec.timestamp {
        Some(EmbedTime::Now) => embed = embed.timestamp(Timestamp::now()),
        Some(EmbedTime::At(at)) => {
            if let Ok(ts) = Timestamp::from_unix_timestamp(at.timestamp()) {
                embed = embed.timestamp(ts);
            }
        }
        None => {}
    }

    if let Some(thumbnail) = &spec.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(image) = &spec.image {
        embed = embed.image(image);
    }

    if let Some(text) = &spec.footer {
        let mut footer = CreateEmbedFooter::new(text);
        if let Some(icon) = &spec.footer_icon_url {
            footer = footer.icon_url(icon);
        }
        embed = embed.footer(footer);
    }

    if let Some(name) = &spec.author {
        let mut author = CreateEmbedAuthor::new(name);
        if let Some(url) = &spec.author_url {
            author = author.url(url);
        }
        if let Some(icon) = &spec.author_icon_url {
            author = author.icon_url(icon);
        }
        embed = embed.author(author);
    }

    for field in &spec.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }

    embed
}
