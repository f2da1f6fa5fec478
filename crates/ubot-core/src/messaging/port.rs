use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRef, UserId, UserProfile},
    messaging::types::Embed,
    Result,
};

/// Gateway port used by the dispatcher and command handlers.
///
/// Text is passed as a minimal markdown subset (`**bold**`); adapters render it
/// in whatever markup their platform understands.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, channel: ChannelId, markdown: &str) -> Result<MessageRef>;
    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageRef>;
    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Look up a user as seen from `channel`. `Ok(None)` means the user is not
    /// (or no longer) visible there.
    async fn resolve_user(&self, channel: ChannelId, user: UserId) -> Result<Option<UserProfile>>;
}
