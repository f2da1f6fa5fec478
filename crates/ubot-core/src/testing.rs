//! Shared fakes for unit tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    config::Config,
    domain::{
        Actor, ChannelId, GuildId, InboundMessage, MessageId, MessageRef, RoleId, UserId,
        UserProfile,
    },
    errors::Error,
    messaging::{port::MessagingPort, types::Embed},
    permissions::RoleWhitelist,
    Result,
};

pub const GUILD: GuildId = GuildId(-1001);
pub const CHANNEL: ChannelId = ChannelId(-1001);
pub const OTHER_CHANNEL: ChannelId = ChannelId(-2002);
pub const ADMIN_ROLE: RoleId = RoleId(2);
pub const BOT: UserId = UserId(999);

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    pub texts: Mutex<Vec<(ChannelId, String)>>,
    pub embeds: Mutex<Vec<(ChannelId, Embed)>>,
    pub reactions: Mutex<Vec<(MessageRef, String)>>,
    pub deletes: Mutex<Vec<MessageRef>>,
    pub users: Mutex<HashMap<UserId, UserProfile>>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1000),
            ..Default::default()
        }
    }

    pub fn with_user(self, id: UserId, name: &str) -> Self {
        self.users.lock().unwrap().insert(
            id,
            UserProfile {
                id,
                name: name.to_string(),
                avatar_url: None,
            },
        );
        self
    }

    fn alloc(&self, channel_id: ChannelId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            channel_id,
            message_id: MessageId(*guard),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn embeds(&self) -> Vec<Embed> {
        self.embeds.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn is_silent(&self) -> bool {
        self.texts.lock().unwrap().is_empty()
            && self.embeds.lock().unwrap().is_empty()
            && self.reactions.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, channel: ChannelId, markdown: &str) -> Result<MessageRef> {
        self.texts
            .lock()
            .unwrap()
            .push((channel, markdown.to_string()));
        Ok(self.alloc(channel))
    }

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageRef> {
        self.embeds.lock().unwrap().push((channel, embed.clone()));
        Ok(self.alloc(channel))
    }

    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((msg, emoji.to_string()));
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        if msg.message_id.0 % 2 == 0 {
            // Pretend even ids are too old to delete.
            return Err(Error::External("message can't be deleted".to_string()));
        }
        self.deletes.lock().unwrap().push(msg);
        Ok(())
    }

    async fn resolve_user(&self, _channel: ChannelId, user: UserId) -> Result<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&user).cloned())
    }
}

pub fn config() -> Config {
    let mut guild_roles = RoleWhitelist::default();
    guild_roles.insert(GUILD, [ADMIN_ROLE]);
    Config {
        bot_token: "test".to_string(),
        command_prefixes: vec!["!".to_string(), "?".to_string()],
        channel_whitelist: vec![CHANNEL],
        guild_roles,
        ..Config::default()
    }
}

pub fn member(id: i64) -> Actor {
    Actor::new(UserId(id), format!("user{id}"))
}

pub fn admin(id: i64) -> Actor {
    member(id).with_roles([ADMIN_ROLE])
}

pub fn message(author: Actor, text: &str) -> InboundMessage {
    message_in(CHANNEL, author, text)
}

pub fn message_in(channel: ChannelId, author: Actor, text: &str) -> InboundMessage {
    InboundMessage {
        message: MessageRef {
            channel_id: channel,
            message_id: MessageId(50),
        },
        author,
        guild_id: Some(GUILD),
        text: Some(text.to_string()),
    }
}
