use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub help_system: HelpSystemConfig,
    pub moderation: ModerationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpSystemConfig {
    /// Regex a forum name must fully match to be managed as a help forum.
    pub forum_pattern: String,
    /// Category label names, most specific first.
    pub categories: Vec<String>,
    pub category_role_suffix: String,
    pub max_tags_per_thread: usize,
    pub activity_history_limit: usize,
    pub activity_high_threshold: usize,
    pub activity_update_interval_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationConfig {
    pub muted_role_pattern: String,
    pub quarantined_role_pattern: String,
    pub max_reason_length: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bot_token: Option<String>,
    pub forum_pattern: Option<String>,
    pub categories: Option<Vec<String>>,
    pub max_tags_per_thread: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://helpline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            chat: ChatConfig { bot_token: String::new().into() },
            help_system: HelpSystemConfig::default(),
            moderation: ModerationConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for HelpSystemConfig {
    fn default() -> Self {
        Self {
            forum_pattern: "questions".to_string(),
            categories: [
                "Database",
                "Android",
                "C++",
                "Frameworks",
                "Java",
                "Other Languages",
                "Algorithms",
                "Build Tools",
                "Other",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            category_role_suffix: " - Helper".to_string(),
            max_tags_per_thread: 5,
            activity_history_limit: 50,
            activity_high_threshold: 10,
            activity_update_interval_secs: 3_600,
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            muted_role_pattern: "Muted".to_string(),
            quarantined_role_pattern: "Quarantined".to_string(),
            max_reason_length: 512,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Compiles `pattern` so that it has to match a whole name, not a substring of it.
pub fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("helpline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(bot_token) = chat.bot_token {
                self.chat.bot_token = bot_token.into();
            }
        }

        if let Some(help) = patch.help_system {
            if let Some(forum_pattern) = help.forum_pattern {
                self.help_system.forum_pattern = forum_pattern;
            }
            if let Some(categories) = help.categories {
                self.help_system.categories = categories;
            }
            if let Some(suffix) = help.category_role_suffix {
                self.help_system.category_role_suffix = suffix;
            }
            if let Some(max_tags) = help.max_tags_per_thread {
                self.help_system.max_tags_per_thread = max_tags;
            }
            if let Some(limit) = help.activity_history_limit {
                self.help_system.activity_history_limit = limit;
            }
            if let Some(threshold) = help.activity_high_threshold {
                self.help_system.activity_high_threshold = threshold;
            }
            if let Some(interval) = help.activity_update_interval_secs {
                self.help_system.activity_update_interval_secs = interval;
            }
        }

        if let Some(moderation) = patch.moderation {
            if let Some(pattern) = moderation.muted_role_pattern {
                self.moderation.muted_role_pattern = pattern;
            }
            if let Some(pattern) = moderation.quarantined_role_pattern {
                self.moderation.quarantined_role_pattern = pattern;
            }
            if let Some(max_reason_length) = moderation.max_reason_length {
                self.moderation.max_reason_length = max_reason_length;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HELPLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("HELPLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("HELPLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("HELPLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_number("HELPLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HELPLINE_CHAT_BOT_TOKEN") {
            self.chat.bot_token = value.into();
        }

        if let Some(value) = read_env("HELPLINE_HELP_FORUM_PATTERN") {
            self.help_system.forum_pattern = value;
        }
        if let Some(value) = read_env("HELPLINE_HELP_CATEGORIES") {
            self.help_system.categories = split_list(&value);
        }
        if let Some(value) = read_env("HELPLINE_HELP_ROLE_SUFFIX") {
            self.help_system.category_role_suffix = value;
        }
        if let Some(value) = read_env("HELPLINE_HELP_MAX_TAGS") {
            self.help_system.max_tags_per_thread = parse_number("HELPLINE_HELP_MAX_TAGS", &value)?;
        }
        if let Some(value) = read_env("HELPLINE_HELP_ACTIVITY_INTERVAL_SECS") {
            self.help_system.activity_update_interval_secs =
                parse_number("HELPLINE_HELP_ACTIVITY_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("HELPLINE_MODERATION_MUTED_ROLE_PATTERN") {
            self.moderation.muted_role_pattern = value;
        }
        if let Some(value) = read_env("HELPLINE_MODERATION_QUARANTINED_ROLE_PATTERN") {
            self.moderation.quarantined_role_pattern = value;
        }

        if let Some(value) = read_env("HELPLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HELPLINE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_number("HELPLINE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("HELPLINE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_number("HELPLINE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("HELPLINE_LOGGING_LEVEL").or_else(|| read_env("HELPLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HELPLINE_LOGGING_FORMAT").or_else(|| read_env("HELPLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.chat.bot_token = bot_token.into();
        }
        if let Some(forum_pattern) = overrides.forum_pattern {
            self.help_system.forum_pattern = forum_pattern;
        }
        if let Some(categories) = overrides.categories {
            self.help_system.categories = categories;
        }
        if let Some(max_tags) = overrides.max_tags_per_thread {
            self.help_system.max_tags_per_thread = max_tags;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_chat(&self.chat)?;
        validate_help_system(&self.help_system)?;
        validate_moderation(&self.moderation)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("helpline.toml"), PathBuf::from("config/helpline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required (set HELPLINE_CHAT_BOT_TOKEN or [chat].bot_token)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_help_system(help: &HelpSystemConfig) -> Result<(), ConfigError> {
    validate_pattern("help_system.forum_pattern", &help.forum_pattern)?;

    if help.categories.is_empty() {
        return Err(ConfigError::Validation(
            "help_system.categories must list at least one category".to_string(),
        ));
    }
    for (index, category) in help.categories.iter().enumerate() {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "help_system.categories[{index}] must not be blank"
            )));
        }
        if help.categories[..index].contains(category) {
            return Err(ConfigError::Validation(format!(
                "help_system.categories lists `{category}` more than once"
            )));
        }
    }

    if help.max_tags_per_thread == 0 {
        return Err(ConfigError::Validation(
            "help_system.max_tags_per_thread must be greater than zero".to_string(),
        ));
    }
    if help.activity_history_limit == 0 || help.activity_high_threshold == 0 {
        return Err(ConfigError::Validation(
            "help_system.activity_history_limit and activity_high_threshold must be greater than zero"
                .to_string(),
        ));
    }
    if help.activity_update_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "help_system.activity_update_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_moderation(moderation: &ModerationConfig) -> Result<(), ConfigError> {
    validate_pattern("moderation.muted_role_pattern", &moderation.muted_role_pattern)?;
    validate_pattern("moderation.quarantined_role_pattern", &moderation.quarantined_role_pattern)?;

    if moderation.max_reason_length == 0 {
        return Err(ConfigError::Validation(
            "moderation.max_reason_length must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_pattern(key: &str, pattern: &str) -> Result<(), ConfigError> {
    full_match_regex(pattern)
        .map(|_| ())
        .map_err(|error| ConfigError::Validation(format!("{key} is not a valid regex: {error}")))
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    chat: Option<ChatPatch>,
    help_system: Option<HelpSystemPatch>,
    moderation: Option<ModerationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HelpSystemPatch {
    forum_pattern: Option<String>,
    categories: Option<Vec<String>>,
    category_role_suffix: Option<String>,
    max_tags_per_thread: Option<usize>,
    activity_history_limit: Option<usize>,
    activity_high_threshold: Option<usize>,
    activity_update_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ModerationPatch {
    muted_role_pattern: Option<String>,
    quarantined_role_pattern: Option<String>,
    max_reason_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
