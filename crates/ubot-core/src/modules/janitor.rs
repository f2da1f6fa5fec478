//! Channel cleanup. Large counts and limits require a whitelisted role.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    commands::{
        Arguments, CommandContext, CommandDescriptor, CommandHandler, CommandRegistry, Parameter,
    },
    domain::{ChannelId, MessageId, MessageRef},
    permissions::RequireElevatedAbove,
    Result,
};

/// Most messages one `clean` may remove, whatever the channel limit says.
pub const MAX_CLEAN_LIMIT: i64 = 100;

/// Per-channel cap on how many messages one `clean` may remove.
#[derive(Debug)]
pub struct JanitorLimits {
    default: i64,
    per_channel: Mutex<HashMap<ChannelId, i64>>,
}

impl JanitorLimits {
    pub fn new(default: i64) -> Self {
        Self {
            default,
            per_channel: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self, channel: ChannelId) -> i64 {
        self.per_channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .copied()
            .unwrap_or(self.default)
    }

    pub fn set_limit(&self, channel: ChannelId, limit: i64) {
        self.per_channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, limit);
    }
}

pub fn register(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(
        CommandDescriptor::new("clean", Clean)
            .alias("purge")
            .summary("Delete recent messages in this channel.")
            .param(Parameter::int("count").precondition(RequireElevatedAbove)),
    )?;
    registry.register(
        CommandDescriptor::new("setlimit", SetLimit)
            .summary("Set the most messages one clean may delete here.")
            .param(Parameter::int("limit").precondition(RequireElevatedAbove)),
    )?;
    Ok(())
}

struct Clean;

#[async_trait]
impl CommandHandler for Clean {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let count = args.int("count")?;
        if count < 1 {
            ctx.reply("Count must be at least 1.").await?;
            return Ok(());
        }

        let channel = ctx.channel_id();
        let n = count
            .min(ctx.state.janitor.limit(channel))
            .min(MAX_CLEAN_LIMIT);
        let origin = i64::from(ctx.message.message_id.0);

        let mut removed = 0;
        for id in ((origin - n).max(1)..origin).rev() {
            let msg = MessageRef {
                channel_id: channel,
                message_id: MessageId(id as i32),
            };
            match ctx.state.messenger.delete_message(msg).await {
                Ok(()) => removed += 1,
                Err(e) => debug!(message = id, "clean: skipping message: {e}"),
            }
        }

        ctx.reply(&format!("Removed {removed} message(s).")).await?;
        Ok(())
    }
}

struct SetLimit;

#[async_trait]
impl CommandHandler for SetLimit {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let limit = args.int("limit")?;
        if !(1..=MAX_CLEAN_LIMIT).contains(&limit) {
            ctx.reply(&format!("Limit must be between 1 and {MAX_CLEAN_LIMIT}."))
                .await?;
            return Ok(());
        }

        ctx.state.janitor.set_limit(ctx.channel_id(), limit);
        ctx.reply(&format!("Clean limit for this channel is now {limit}."))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_per_channel() {
        let limits = JanitorLimits::new(100);
        assert_eq!(limits.limit(ChannelId(1)), 100);
        limits.set_limit(ChannelId(1), 5);
        assert_eq!(limits.limit(ChannelId(1)), 5);
        assert_eq!(limits.limit(ChannelId(2)), 100);
    }
}
