//! # Replies
//!
//! Transport-neutral description of the single message a command produces.
//! The gateway and HTTP transports each translate a [`Reply`] into their own
//! wire format.

/// Maximum length of an embed field value.
pub const EMBED_FIELD_LIMIT: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<Attachment>,
    /// Only visible to the invoking user
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Reply {
            content: Some(content.into()),
            ephemeral: true,
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Reply {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub fn attachment(attachment: Attachment) -> Self {
        Reply {
            attachments: vec![attachment],
            ..Default::default()
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub title: Option<String>,
    pub url: Option<String>,
    pub colour: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub image_url: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Adds a field, trimming its value to the embed field limit.
    pub fn field(mut self, name: impl Into<String>, value: &str) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: trim(value, EMBED_FIELD_LIMIT),
            inline: false,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A file the transport uploads alongside the reply, fetched from `url`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
pub fn trim(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut trimmed: String = text.chars().take(max.saturating_sub(3)).collect();
    trimmed.push_str("...");
    trimmed
}
