use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    domain::ChannelId,
    errors::Error,
    permissions::RoleWhitelist,
    Result,
};

/// Typed configuration, loaded once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    // Gateway
    pub bot_token: String,

    // Triggers
    pub command_prefixes: Vec<String>,
    pub escape_marker: String,
    pub channel_whitelist: Vec<ChannelId>,

    // Permissions
    pub guild_roles: RoleWhitelist,
    pub elevated_threshold: i64,

    // Storage
    pub database_path: PathBuf,

    // Janitor
    pub default_clean_limit: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            command_prefixes: vec!["!".to_string()],
            escape_marker: "##".to_string(),
            channel_whitelist: Vec::new(),
            guild_roles: RoleWhitelist::default(),
            elevated_threshold: 10,
            database_path: PathBuf::from("utilitybot.db"),
            default_clean_limit: 100,
        }
    }
}

/// Optional JSON config file (`CONFIG_FILE`). Environment variables win over it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    token: Option<String>,
    command_strings: Option<Vec<String>>,
    escape_marker: Option<String>,
    channel_whitelist: Option<Vec<i64>>,
    guild_role_map: Option<HashMap<String, Vec<i64>>>,
    elevated_threshold: Option<i64>,
    database_path: Option<PathBuf>,
    default_clean_limit: Option<i64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let file = match env_path("CONFIG_FILE") {
            Some(path) => read_config_file(&path)?,
            None => FileConfig::default(),
        };

        let cfg = Self::from_sources(file, |key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_sources(file: FileConfig, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let bot_token = var("BOT_TOKEN")
            .and_then(non_empty)
            .or(file.token)
            .unwrap_or_default();

        let command_prefixes = var("COMMAND_PREFIXES")
            .map(|v| parse_csv(&v))
            .filter(|v| !v.is_empty())
            .or(file.command_strings)
            .unwrap_or(defaults.command_prefixes);

        let escape_marker = var("ESCAPE_MARKER")
            .and_then(non_empty)
            .or(file.escape_marker)
            .unwrap_or(defaults.escape_marker);

        let channel_whitelist = match var("CHANNEL_WHITELIST") {
            Some(v) => parse_csv_i64(&v)?,
            None => file.channel_whitelist.unwrap_or_default(),
        }
        .into_iter()
        .map(ChannelId)
        .collect();

        let guild_roles = match var("GUILD_ROLE_MAP").and_then(non_empty) {
            Some(raw) => RoleWhitelist::from_json(&raw)?,
            None => match file.guild_role_map {
                Some(map) => RoleWhitelist::from_map(map)?,
                None => RoleWhitelist::default(),
            },
        };

        let elevated_threshold = match var("ELEVATED_THRESHOLD") {
            Some(v) => parse_i64("ELEVATED_THRESHOLD", &v)?,
            None => file
                .elevated_threshold
                .unwrap_or(defaults.elevated_threshold),
        };

        let database_path = var("DATABASE_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .or(file.database_path)
            .unwrap_or(defaults.database_path);

        let default_clean_limit = match var("DEFAULT_CLEAN_LIMIT") {
            Some(v) => parse_i64("DEFAULT_CLEAN_LIMIT", &v)?,
            None => file
                .default_clean_limit
                .unwrap_or(defaults.default_clean_limit),
        };

        Ok(Self {
            bot_token,
            command_prefixes,
            escape_marker,
            channel_whitelist,
            guild_roles,
            elevated_threshold,
            database_path,
            default_clean_limit,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if self.channel_whitelist.is_empty() {
            return Err(Error::Config(
                "CHANNEL_WHITELIST must list at least one channel".to_string(),
            ));
        }
        if self.command_prefixes.is_empty() {
            return Err(Error::Config(
                "at least one command prefix is required".to_string(),
            ));
        }
        if self.command_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::Config("command prefixes must not be blank".to_string()));
        }
        if self.escape_marker.trim().is_empty() {
            return Err(Error::Config("escape marker must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn is_channel_whitelisted(&self, channel: ChannelId) -> bool {
        self.channel_whitelist.contains(&channel)
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    let quoted = val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')));
    if quoted {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn parse_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_csv_i64(v: &str) -> Result<Vec<i64>> {
    parse_csv(v)
        .iter()
        .map(|s| parse_i64("id list", s))
        .collect()
}

fn parse_i64(what: &str, v: &str) -> Result<i64> {
    v.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{what}: `{v}` is not an integer")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
