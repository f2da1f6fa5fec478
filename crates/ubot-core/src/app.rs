//! Wiring: builds the registry, synchronizer and dispatcher around the ports.

use std::sync::Arc;

use tracing::info;

use crate::{
    commands::CommandRegistry,
    config::Config,
    dispatcher::Dispatcher,
    domain::BotIdentity,
    messaging::port::MessagingPort,
    modules::{self, janitor::JanitorLimits},
    tags::{TagStore, TagSynchronizer},
    Result,
};

/// Shared state handed to every command invocation.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub registry: Arc<CommandRegistry>,
    pub tags: Arc<TagSynchronizer>,
    pub janitor: Arc<JanitorLimits>,
}

/// Register the built-in commands, load tags once, and return a dispatcher
/// ready to receive messages.
pub async fn assemble(
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    store: Arc<dyn TagStore>,
    identity: BotIdentity,
) -> Result<Dispatcher> {
    let mut registry = CommandRegistry::new();
    modules::register_all(&mut registry)?;
    let registry = Arc::new(registry);

    let tags = Arc::new(TagSynchronizer::new(store, registry.clone()));
    let tag_count = tags.rebuild().await?;
    info!(
        commands = registry.commands().len(),
        tags = tag_count,
        "command registry ready"
    );

    let state = Arc::new(AppState {
        janitor: Arc::new(JanitorLimits::new(cfg.default_clean_limit)),
        cfg,
        messenger,
        registry,
        tags,
    });

    Ok(Dispatcher::new(state, identity))
}
