//! Command descriptors, invocation context and the command registry.

pub mod args;
pub mod registry;

use std::{fmt, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{
    app::AppState,
    domain::{Actor, ChannelId, GuildId, MessageRef},
    messaging::types::Embed,
    permissions::{ParameterPrecondition, Precondition},
    Result,
};

pub use args::{parse_arguments, ArgError};
pub use registry::{CommandRegistry, DynamicSet, Invocable, Resolved};

/// Everything a handler needs to know about the invocation it serves.
#[derive(Clone)]
pub struct CommandContext {
    pub state: Arc<AppState>,
    pub message: MessageRef,
    pub actor: Actor,
    pub guild_id: Option<GuildId>,
    /// The command name or alias as written by the user.
    pub invoked_as: String,
    /// Text after the command name.
    pub remainder: String,
}

impl CommandContext {
    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }

    pub async fn reply(&self, markdown: &str) -> Result<MessageRef> {
        self.state
            .messenger
            .send_text(self.channel_id(), markdown)
            .await
    }

    pub async fn send_embed(&self, embed: &Embed) -> Result<MessageRef> {
        self.state
            .messenger
            .send_embed(self.channel_id(), embed)
            .await
    }
}

/// A command body. Errors (and panics) surface as an unknown failure at the
/// dispatcher.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext, args: &Arguments) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Signed integer token.
    Int,
    /// Single token (quotes allowed).
    Word,
    /// The rest of the input, verbatim. Only valid as the last parameter.
    Remainder,
}

#[derive(Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub preconditions: Vec<Arc<dyn ParameterPrecondition>>,
}

impl Parameter {
    fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            preconditions: Vec::new(),
        }
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, ParamKind::Int)
    }

    pub fn word(name: &str) -> Self {
        Self::new(name, ParamKind::Word)
    }

    pub fn remainder(name: &str) -> Self {
        Self::new(name, ParamKind::Remainder)
    }

    pub fn precondition(mut self, p: impl ParameterPrecondition + 'static) -> Self {
        self.preconditions.push(Arc::new(p));
        self
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("preconditions", &self.preconditions.len())
            .finish()
    }
}

/// A statically registered command.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub summary: String,
    pub params: Vec<Parameter>,
    pub preconditions: Vec<Arc<dyn Precondition>>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            summary: String::new(),
            params: Vec::new(),
            preconditions: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn precondition(mut self, p: impl Precondition + 'static) -> Self {
        self.preconditions.push(Arc::new(p));
        self
    }

    /// Name followed by aliases.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }

    /// `name <param> <rest...>`
    pub fn usage(&self) -> String {
        let mut out = self.name.clone();
        for p in &self.params {
            match p.kind {
                ParamKind::Remainder => out.push_str(&format!(" <{}...>", p.name)),
                _ => out.push_str(&format!(" <{}>", p.name)),
            }
        }
        out
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("params", &self.params)
            .field("preconditions", &self.preconditions.len())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Text(String),
}

/// Parsed arguments, in parameter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    values: Vec<(String, ArgValue)>,
}

impl Arguments {
    pub fn push(&mut self, name: &str, value: ArgValue) {
        self.values.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        match self.get(name) {
            Some(ArgValue::Int(v)) => Ok(*v),
            _ => Err(anyhow!("missing integer argument `{name}`")),
        }
    }

    pub fn text(&self, name: &str) -> anyhow::Result<&str> {
        match self.get(name) {
            Some(ArgValue::Text(v)) => Ok(v),
            _ => Err(anyhow!("missing text argument `{name}`")),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
