/// Reaction used when no command matched.
pub const REACTION_LOOKING: &str = "🔎";
/// Reaction used when a precondition rejected the invocation.
pub const REACTION_NO_ENTRY: &str = "⛔";
/// Reaction used when a handler failed.
pub const REACTION_RAGE: &str = "😡";

/// Platform-neutral rich message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub author: Option<EmbedAuthor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }
}
