/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// and tag administration commands can report failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command registration failed: `{0}` is already registered")]
    DuplicateCommand(String),

    #[error("a tag or command named `{0}` already exists")]
    TagExists(String),

    #[error("no tag named `{0}`")]
    TagNotFound(String),

    #[error("invalid tag name `{name}`: {reason}")]
    InvalidTagName { name: String, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
