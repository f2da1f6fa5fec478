//! Telegram adapter (teloxide).
//!
//! Implements the `ubot-core` MessagingPort over the Telegram Bot API. A chat
//! plays the role of both guild and channel; see [`router`] for how updates
//! become inbound messages.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ParseMode},
    ApiError, RequestError,
};

use tokio::time::sleep;
use tracing::debug;

pub mod router;

use ubot_core::{
    domain::{ChannelId, MessageId, MessageRef, RoleId, UserId, UserProfile},
    errors::Error,
    formatting::{embed_to_html, markdown_to_html},
    messaging::{port::MessagingPort, types::Embed},
    Result,
};

/// Role ids synthesized from a user's chat member status. Owners hold all
/// three, administrators the last two.
pub const ROLE_OWNER: RoleId = RoleId(1);
pub const ROLE_ADMINISTRATOR: RoleId = RoleId(2);
pub const ROLE_MEMBER: RoleId = RoleId(3);

pub fn roles_for(kind: &ChatMemberKind) -> Vec<RoleId> {
    match kind {
        ChatMemberKind::Owner(_) => vec![ROLE_OWNER, ROLE_ADMINISTRATOR, ROLE_MEMBER],
        ChatMemberKind::Administrator(_) => vec![ROLE_ADMINISTRATOR, ROLE_MEMBER],
        ChatMemberKind::Member | ChatMemberKind::Restricted(_) => vec![ROLE_MEMBER],
        ChatMemberKind::Left | ChatMemberKind::Banned(_) => Vec::new(),
    }
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(channel: ChannelId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(channel.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }

    async fn send_html(&self, channel: ChannelId, html: String) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(channel), html.clone())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef {
            channel_id: channel,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, channel: ChannelId, markdown: &str) -> Result<MessageRef> {
        self.send_html(channel, markdown_to_html(markdown)).await
    }

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageRef> {
        self.send_html(channel, embed_to_html(embed)).await
    }

    /// The Bot API version teloxide 0.12 targets has no reactions, so the
    /// emoji is sent as a reply to the message.
    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(msg.channel_id), emoji.to_string())
                .reply_to_message_id(Self::tg_msg_id(msg.message_id))
                .allow_sending_without_reply(true)
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot.delete_message(
                Self::tg_chat(msg.channel_id),
                Self::tg_msg_id(msg.message_id),
            )
        })
        .await?;
        Ok(())
    }

    async fn resolve_user(&self, channel: ChannelId, user: UserId) -> Result<Option<UserProfile>> {
        let Ok(raw) = u64::try_from(user.0) else {
            return Ok(None);
        };

        let member = match self
            .bot
            .get_chat_member(Self::tg_chat(channel), teloxide::types::UserId(raw))
            .await
        {
            Ok(member) => member,
            Err(RequestError::Api(e @ (ApiError::UserNotFound | ApiError::Unknown(_)))) => {
                debug!(%channel, %user, "user not resolvable: {e}");
                return Ok(None);
            }
            Err(e) => return Err(Self::map_err(e)),
        };

        if roles_for(&member.kind).is_empty() {
            return Ok(None);
        }

        Ok(Some(UserProfile {
            id: user,
            name: member.user.full_name(),
            avatar_url: None,
        }))
    }
}
