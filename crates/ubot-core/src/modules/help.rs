use async_trait::async_trait;

use crate::{
    commands::{Arguments, CommandContext, CommandDescriptor, CommandHandler, CommandRegistry},
    Result,
};

pub fn register(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(
        CommandDescriptor::new("help", Help)
            .alias("commands")
            .summary("List the built-in commands."),
    )
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, ctx: &CommandContext, _args: &Arguments) -> anyhow::Result<()> {
        let prefix = ctx
            .state
            .cfg
            .command_prefixes
            .first()
            .cloned()
            .unwrap_or_default();

        let mut out = String::from("**Commands**\n");
        for cmd in ctx.state.registry.commands() {
            out.push_str(&format!("{prefix}{}", cmd.usage()));
            if !cmd.summary.is_empty() {
                out.push_str(&format!(" - {}", cmd.summary));
            }
            out.push('\n');
        }

        let tags = ctx.state.tags.list().await?.len();
        out.push_str(&format!("\n{tags} tag(s) available; see {prefix}tags."));

        ctx.reply(&out).await?;
        Ok(())
    }
}
