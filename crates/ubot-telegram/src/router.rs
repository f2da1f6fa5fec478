use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{debug, info};

use ubot_core::{
    app::assemble,
    config::Config,
    dispatcher::Dispatcher as CommandDispatcher,
    domain::{Actor, BotIdentity, ChannelId, GuildId, InboundMessage, MessageId, MessageRef, UserId},
    messaging::port::MessagingPort,
    tags::TagStore,
};

use crate::{roles_for, TelegramMessenger};

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn TagStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let me = bot.get_me().await?;
    let identity = BotIdentity {
        user_id: UserId(me.user.id.0 as i64),
        mentions: me
            .user
            .username
            .iter()
            .map(|name| format!("@{name}"))
            .collect(),
    };

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let commands = Arc::new(assemble(cfg.clone(), messenger, store, identity).await?);
    info!(
        bot = %me.username(),
        channels = cfg.channel_whitelist.len(),
        "telegram polling started"
    );

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![commands])
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Turns the update into an inbound message and dispatches it on its own task,
/// so a slow command never holds up the chat's update queue.
async fn handle_message(
    bot: Bot,
    msg: Message,
    commands: Arc<CommandDispatcher>,
) -> ResponseResult<()> {
    if let Some(inbound) = to_inbound(&bot, &msg, &commands).await {
        tokio::spawn(async move { commands.on_message(inbound).await });
    }
    Ok(())
}

async fn to_inbound(
    bot: &Bot,
    msg: &Message,
    commands: &CommandDispatcher,
) -> Option<InboundMessage> {
    let from = msg.from()?;
    let text = match msg.text() {
        Some(raw) => Some(strip_bot_suffix(raw, bot_username(commands.identity()))?),
        None => None,
    };

    let chat = msg.chat.id.0;
    let guild_id = (!msg.chat.is_private()).then_some(GuildId(chat));

    let mut author = Actor::new(UserId(from.id.0 as i64), from.full_name());
    author.is_bot = from.is_bot;

    // Member status is only needed for messages that may hit a precondition.
    let attempt = text
        .as_deref()
        .is_some_and(|t| commands.is_command_attempt(t));
    if guild_id.is_some() && attempt {
        match bot.get_chat_member(msg.chat.id, from.id).await {
            Ok(member) => author = author.with_roles(roles_for(&member.kind)),
            Err(e) => debug!(chat, user = from.id.0, "chat member lookup failed: {e}"),
        }
    }

    Some(InboundMessage {
        message: MessageRef {
            channel_id: ChannelId(chat),
            message_id: MessageId(msg.id.0),
        },
        author,
        guild_id,
        text,
    })
}

fn bot_username(identity: &BotIdentity) -> Option<&str> {
    identity
        .mentions
        .first()
        .map(|m| m.trim_start_matches('@'))
}

/// `/cmd@this_bot args` becomes `/cmd args`. Returns `None` when the command
/// is addressed to a different bot.
fn strip_bot_suffix(text: &str, username: Option<&str>) -> Option<String> {
    if !text.starts_with('/') {
        return Some(text.to_string());
    }

    let (head, rest) = text.split_at(text.find(char::is_whitespace).unwrap_or(text.len()));
    let Some((command, target)) = head.split_once('@') else {
        return Some(text.to_string());
    };

    match username {
        Some(name) if target.eq_ignore_ascii_case(name) => Some(format!("{command}{rest}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_bot_suffix("!greet", Some("ubot")).as_deref(), Some("!greet"));
        assert_eq!(strip_bot_suffix("/tag add x", Some("ubot")).as_deref(), Some("/tag add x"));
    }

    #[test]
    fn own_suffix_is_removed() {
        assert_eq!(
            strip_bot_suffix("/tag@UBot info greet", Some("ubot")).as_deref(),
            Some("/tag info greet")
        );
        assert_eq!(strip_bot_suffix("/help@ubot", Some("ubot")).as_deref(), Some("/help"));
    }

    #[test]
    fn other_bots_commands_are_dropped() {
        assert_eq!(strip_bot_suffix("/start@otherbot", Some("ubot")), None);
        assert_eq!(strip_bot_suffix("/start@otherbot", None), None);
    }

    #[test]
    fn username_comes_from_first_mention() {
        let identity = BotIdentity {
            user_id: UserId(1),
            mentions: vec!["@ubot".to_string()],
        };
        assert_eq!(bot_username(&identity), Some("ubot"));
        assert_eq!(bot_username(&BotIdentity::default()), None);
    }
}
