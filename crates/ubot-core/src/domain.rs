use std::collections::HashSet;
use std::fmt;

/// Chat community id (a Telegram group, a Discord guild, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuildId(pub i64);

/// Channel id; the unit the channel whitelist and janitor limits apply to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub i64);

/// User id (numeric).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Role id within a guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub i64);

/// Message id (numeric, per channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

macro_rules! display_id {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_id!(GuildId, ChannelId, UserId, RoleId, MessageId);

/// The sender of a message together with the roles it holds in the guild the
/// message was sent from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
    pub roles: HashSet<RoleId>,
    pub is_bot: bool,
}

impl Actor {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            roles: HashSet::new(),
            is_bot: false,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }
}

/// Inbound message event as delivered by the gateway adapter.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub message: MessageRef,
    pub author: Actor,
    pub guild_id: Option<GuildId>,
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }
}

/// How the bot itself is addressed on the platform.
#[derive(Clone, Debug, Default)]
pub struct BotIdentity {
    pub user_id: UserId,
    /// Mention forms that count as "addressed to the bot" (`@name`, `<@id>`, ...).
    pub mentions: Vec<String>,
}

/// Display data for a resolved user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}
