//! Tag administration commands.

use async_trait::async_trait;

use crate::{
    commands::{
        Arguments, CommandContext, CommandDescriptor, CommandHandler, CommandRegistry, Parameter,
    },
    errors::Error,
    permissions::RequireElevatedUser,
    tags::NewTag,
    Result,
};

pub fn register(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(
        CommandDescriptor::new("tag add", AddTag)
            .alias("tag create")
            .summary("Create a tag.")
            .precondition(RequireElevatedUser)
            .param(Parameter::word("name"))
            .param(Parameter::remainder("content")),
    )?;
    registry.register(
        CommandDescriptor::new("tag remove", RemoveTag)
            .alias("tag delete")
            .summary("Delete a tag and its aliases.")
            .precondition(RequireElevatedUser)
            .param(Parameter::word("name")),
    )?;
    registry.register(
        CommandDescriptor::new("tag alias", AliasTag)
            .summary("Add another trigger for a tag.")
            .precondition(RequireElevatedUser)
            .param(Parameter::word("name"))
            .param(Parameter::word("alias")),
    )?;
    registry.register(
        CommandDescriptor::new("tag info", TagInfo)
            .summary("Show who owns a tag and how often it was used.")
            .param(Parameter::word("name")),
    )?;
    registry.register(CommandDescriptor::new("tags", ListTags).summary("List all tags."))?;
    Ok(())
}

/// Errors the invoking user can fix get a reply; everything else propagates.
fn user_facing(e: &Error) -> Option<String> {
    match e {
        Error::TagExists(_) | Error::TagNotFound(_) | Error::InvalidTagName { .. } => {
            Some(format!("**Tag Error:** {e}"))
        }
        _ => None,
    }
}

async fn reply_or_fail(ctx: &CommandContext, result: Result<String>) -> anyhow::Result<()> {
    let text = match result {
        Ok(text) => text,
        Err(e) => match user_facing(&e) {
            Some(text) => text,
            None => return Err(e.into()),
        },
    };
    ctx.reply(&text).await?;
    Ok(())
}

struct AddTag;

#[async_trait]
impl CommandHandler for AddTag {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let tag = NewTag::new(args.text("name")?, args.text("content")?, ctx.actor.id);
        let result = ctx
            .state
            .tags
            .add_tag(tag)
            .await
            .map(|t| format!("Tag **{}** created.", t.name));
        reply_or_fail(ctx, result).await
    }
}

struct RemoveTag;

#[async_trait]
impl CommandHandler for RemoveTag {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let result = ctx
            .state
            .tags
            .remove_tag(args.text("name")?)
            .await
            .map(|t| format!("Tag **{}** removed.", t.name));
        reply_or_fail(ctx, result).await
    }
}

struct AliasTag;

#[async_trait]
impl CommandHandler for AliasTag {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let result = ctx
            .state
            .tags
            .add_alias(args.text("name")?, args.text("alias")?)
            .await
            .map(|t| format!("Tag **{}** now answers to: {}", t.name, t.aliases.join(", ")));
        reply_or_fail(ctx, result).await
    }
}

struct TagInfo;

#[async_trait]
impl CommandHandler for TagInfo {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()> {
        let name = args.text("name")?;
        let Some(tag) = ctx.state.tags.find(name).await? else {
            return reply_or_fail(ctx, Err(Error::TagNotFound(name.to_string()))).await;
        };

        let owner = match ctx
            .state
            .messenger
            .resolve_user(ctx.channel_id(), tag.owner_id)
            .await
        {
            Ok(Some(profile)) => profile.name,
            _ => format!("user {}", tag.owner_id),
        };
        let aliases = if tag.aliases.is_empty() {
            "none".to_string()
        } else {
            tag.aliases.join(", ")
        };

        let text = format!(
            "**{}**\nOwner: {owner}\nUses: {}\nAliases: {aliases}\nCreated: {}",
            tag.name,
            tag.uses,
            tag.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
        ctx.reply(&text).await?;
        Ok(())
    }
}

struct ListTags;

#[async_trait]
impl CommandHandler for ListTags {
    async fn execute(&self, ctx: &CommandContext, _args: &Arguments) -> anyhow::Result<()> {
        let mut names: Vec<String> = ctx
            .state
            .tags
            .list()
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();
        names.sort();

        let text = if names.is_empty() {
            "No tags yet.".to_string()
        } else {
            format!("**Tags ({}):** {}", names.len(), names.join(", "))
        };
        ctx.reply(&text).await?;
        Ok(())
    }
}
