use std::sync::Arc;

use tracing::info;

use ubot_core::{config::Config, tags::SqliteTagStore};

#[tokio::main]
async fn main() -> Result<(), ubot_core::Error> {
    ubot_core::logging::init("ubot")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        prefixes = ?cfg.command_prefixes,
        database = %cfg.database_path.display(),
        "configuration loaded"
    );

    let store = Arc::new(SqliteTagStore::open(&cfg.database_path)?);

    ubot_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| ubot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
