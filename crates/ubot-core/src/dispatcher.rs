//! Message ingestion: trigger detection, channel gate, command pipeline and
//! outcome feedback.

use std::{future::Future, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    app::AppState,
    commands::{
        parse_arguments, ArgError, Arguments, CommandContext, CommandDescriptor, Invocable,
        Resolved,
    },
    domain::{BotIdentity, InboundMessage},
    messaging::types::{REACTION_LOOKING, REACTION_NO_ENTRY, REACTION_RAGE},
    permissions::PreconditionOutcome,
};

/// Terminal result of one command attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success,
    SearchFailure,
    PreconditionFailure(String),
    ParseFailure(String),
    TypeFailure(String),
    UnknownFailure(String),
}

/// What the user sees for an outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feedback {
    React(&'static str),
    Say(String),
}

impl DispatchOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SearchFailure => "search_failure",
            Self::PreconditionFailure(_) => "precondition_failure",
            Self::ParseFailure(_) => "parse_failure",
            Self::TypeFailure(_) => "type_failure",
            Self::UnknownFailure(_) => "unknown_failure",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success | Self::SearchFailure => None,
            Self::PreconditionFailure(r)
            | Self::ParseFailure(r)
            | Self::TypeFailure(r)
            | Self::UnknownFailure(r) => Some(r),
        }
    }

    pub fn feedback(&self) -> Option<Feedback> {
        match self {
            Self::Success => None,
            Self::SearchFailure => Some(Feedback::React(REACTION_LOOKING)),
            Self::PreconditionFailure(_) => Some(Feedback::React(REACTION_NO_ENTRY)),
            Self::ParseFailure(r) => Some(Feedback::Say(format!("**Parse Error:** {r}"))),
            Self::TypeFailure(r) => Some(Feedback::Say(format!("**Read Error:** {r}"))),
            Self::UnknownFailure(_) => Some(Feedback::React(REACTION_RAGE)),
        }
    }
}

pub struct Dispatcher {
    state: Arc<AppState>,
    identity: BotIdentity,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>, identity: BotIdentity) -> Self {
        Self { state, identity }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Gateway entry point. All effects happen on the channel.
    pub async fn on_message(&self, msg: InboundMessage) {
        let _ = self.handle_message(msg).await;
    }

    /// Like [`Dispatcher::on_message`], but reports the outcome. `None` means
    /// the message was not a command attempt (or was filtered out).
    pub async fn handle_message(&self, msg: InboundMessage) -> Option<DispatchOutcome> {
        if msg.author.id == self.identity.user_id {
            return None;
        }
        let text = msg.text.as_deref()?;
        let rest = self.strip_trigger(text)?;
        if !self.state.cfg.is_channel_whitelisted(msg.channel_id()) {
            return None;
        }

        let (command, outcome) = match self.state.registry.resolve(rest) {
            None => (None, DispatchOutcome::SearchFailure),
            Some(resolved) => {
                let name = resolved.invoked_as.clone();
                (Some(name), self.run(&msg, resolved).await)
            }
        };

        self.emit_feedback(&msg, &outcome).await;
        log_outcome(&msg, command.as_deref(), &outcome);
        Some(outcome)
    }

    /// Whether `text` would be treated as a command attempt (before the
    /// channel gate). Adapters use this to skip expensive lookups.
    pub fn is_command_attempt(&self, text: &str) -> bool {
        self.strip_trigger(text).is_some()
    }

    /// Strip the escape check, mention or command prefix; `None` if the text is
    /// not addressed to the bot.
    fn strip_trigger<'a>(&self, text: &'a str) -> Option<&'a str> {
        if text.trim().is_empty() || text.starts_with(&self.state.cfg.escape_marker) {
            return None;
        }

        for mention in self.identity.mentions.iter().filter(|m| !m.is_empty()) {
            let Some(head) = text.get(..mention.len()) else {
                continue;
            };
            let rest = &text[mention.len()..];
            if head.eq_ignore_ascii_case(mention)
                && rest.chars().next().map_or(true, char::is_whitespace)
            {
                return Some(rest.trim_start());
            }
        }

        self.state
            .cfg
            .command_prefixes
            .iter()
            .find(|p| text.starts_with(p.as_str()))
            .map(|p| &text[p.len()..])
    }

    async fn run(&self, msg: &InboundMessage, resolved: Resolved) -> DispatchOutcome {
        let ctx = CommandContext {
            state: self.state.clone(),
            message: msg.message,
            actor: msg.author.clone(),
            guild_id: msg.guild_id,
            invoked_as: resolved.invoked_as,
            remainder: resolved.remainder,
        };

        match resolved.target {
            Invocable::Command(cmd) => {
                let args = match parse_arguments(&cmd.params, &ctx.remainder) {
                    Ok(args) => args,
                    Err(e) => return arg_failure(e),
                };
                let gate = check_preconditions(&cmd, &ctx, &args);
                if let PreconditionOutcome::Failure(reason) = gate {
                    return DispatchOutcome::PreconditionFailure(reason);
                }

                let handler = cmd.handler.clone();
                run_isolated(async move { handler.execute(&ctx, &args).await }).await
            }
            Invocable::Tag(tag) => {
                if let Err(e) = parse_arguments(&[], &ctx.remainder) {
                    return arg_failure(e);
                }

                let tags = self.state.tags.clone();
                run_isolated(async move {
                    tags.invoke(&ctx, &tag).await.map_err(anyhow::Error::from)
                })
                .await
            }
        }
    }

    async fn emit_feedback(&self, msg: &InboundMessage, outcome: &DispatchOutcome) {
        let messenger = &self.state.messenger;
        let result = match outcome.feedback() {
            None => return,
            Some(Feedback::React(emoji)) => messenger.add_reaction(msg.message, emoji).await,
            Some(Feedback::Say(text)) => messenger
                .send_text(msg.channel_id(), &text)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            warn!(
                channel = %msg.channel_id(),
                outcome = outcome.kind(),
                "failed to deliver feedback: {e}"
            );
        }
    }
}

/// Command-level preconditions in order, then each parameter's, stopping at
/// the first failure.
fn check_preconditions(
    cmd: &CommandDescriptor,
    ctx: &CommandContext,
    args: &Arguments,
) -> PreconditionOutcome {
    for pre in &cmd.preconditions {
        let outcome = pre.check(ctx);
        if !outcome.is_success() {
            return outcome;
        }
    }

    for param in &cmd.params {
        let Some(value) = args.get(&param.name) else {
            continue;
        };
        for pre in &param.preconditions {
            let outcome = pre.check(ctx, value);
            if !outcome.is_success() {
                return outcome;
            }
        }
    }
    PreconditionOutcome::Success
}

fn arg_failure(e: ArgError) -> DispatchOutcome {
    match e {
        ArgError::Parse(reason) => DispatchOutcome::ParseFailure(reason),
        ArgError::Read(reason) => DispatchOutcome::TypeFailure(reason),
    }
}

/// Run a handler on its own task so an error or panic becomes an outcome
/// instead of tearing down message processing.
async fn run_isolated<F>(fut: F) -> DispatchOutcome
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(Ok(())) => DispatchOutcome::Success,
        Ok(Err(e)) => DispatchOutcome::UnknownFailure(format!("{e:#}")),
        Err(e) if e.is_panic() => DispatchOutcome::UnknownFailure("handler panicked".to_string()),
        Err(e) => DispatchOutcome::UnknownFailure(format!("handler task failed: {e}")),
    }
}

fn log_outcome(msg: &InboundMessage, command: Option<&str>, outcome: &DispatchOutcome) {
    let actor = msg.author.id;
    let channel = msg.channel_id();
    let guild = msg.guild_id.map(|g| g.0);
    let reason = outcome.reason().unwrap_or("");

    match outcome {
        DispatchOutcome::Success => debug!(
            %actor, %channel, ?guild, ?command, outcome = outcome.kind(),
            "command invoked"
        ),
        DispatchOutcome::UnknownFailure(_) => warn!(
            %actor, %channel, ?guild, ?command, outcome = outcome.kind(), reason,
            "command invoked"
        ),
        _ => info!(
            %actor, %channel, ?guild, ?command, outcome = outcome.kind(), reason,
            "command invoked"
        ),
    }
}
