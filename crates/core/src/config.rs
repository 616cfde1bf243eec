use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub crm: CrmConfig,
    pub conversation: ConversationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub poll_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    /// The generative fallback is gated purely on credential presence.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub whisper_binary: Option<String>,
    pub whisper_model: String,
    pub hugging_face_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub context_ttl_minutes: u64,
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
    pub telegram_bot_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub crm_base_url: Option<String>,
    pub context_ttl_minutes: Option<u64>,
    pub log_level: Option<String>,
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
            telegram: TelegramConfig { bot_token: String::new().into(), poll_timeout_secs: 30 },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_tokens: 300,
                temperature: 0.3,
            },
            speech: SpeechConfig {
                whisper_binary: None,
                whisper_model: "base".to_string(),
                hugging_face_token: None,
                timeout_secs: 30,
            },
            crm: CrmConfig { base_url: "http://localhost:8000".to_string(), timeout_secs: 10 },
            conversation: ConversationConfig { context_ttl_minutes: 120 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadvox.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(speech) = patch.speech {
            if let Some(whisper_binary) = speech.whisper_binary {
                self.speech.whisper_binary = Some(whisper_binary);
            }
            if let Some(whisper_model) = speech.whisper_model {
                self.speech.whisper_model = whisper_model;
            }
            if let Some(hugging_face_token_value) = speech.hugging_face_token {
                self.speech.hugging_face_token = Some(secret_value(hugging_face_token_value));
            }
            if let Some(timeout_secs) = speech.timeout_secs {
                self.speech.timeout_secs = timeout_secs;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(base_url) = crm.base_url {
                self.crm.base_url = base_url;
            }
            if let Some(timeout_secs) = crm.timeout_secs {
                self.crm.timeout_secs = timeout_secs;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(context_ttl_minutes) = conversation.context_ttl_minutes {
                self.conversation.context_ttl_minutes = context_ttl_minutes;
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
        if let Some(value) = read_env("LEADVOX_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("LEADVOX_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("LEADVOX_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADVOX_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADVOX_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("LEADVOX_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LEADVOX_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LEADVOX_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADVOX_SPEECH_WHISPER_BINARY") {
            self.speech.whisper_binary = Some(value);
        }
        if let Some(value) = read_env("LEADVOX_SPEECH_WHISPER_MODEL") {
            self.speech.whisper_model = value;
        }
        if let Some(value) = read_env("LEADVOX_SPEECH_HUGGING_FACE_TOKEN") {
            self.speech.hugging_face_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADVOX_SPEECH_TIMEOUT_SECS") {
            self.speech.timeout_secs = parse_u64("LEADVOX_SPEECH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADVOX_CRM_BASE_URL") {
            self.crm.base_url = value;
        }
        if let Some(value) = read_env("LEADVOX_CRM_TIMEOUT_SECS") {
            self.crm.timeout_secs = parse_u64("LEADVOX_CRM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADVOX_CONVERSATION_CONTEXT_TTL_MINUTES") {
            self.conversation.context_ttl_minutes =
                parse_u64("LEADVOX_CONVERSATION_CONTEXT_TTL_MINUTES", &value)?;
        }

        if let Some(value) = read_env("LEADVOX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LEADVOX_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("LEADVOX_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("LEADVOX_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LEADVOX_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("LEADVOX_LOGGING_LEVEL").or_else(|| read_env("LEADVOX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADVOX_LOGGING_FORMAT").or_else(|| read_env("LEADVOX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(base_url) = overrides.crm_base_url {
            self.crm.base_url = base_url;
        }
        if let Some(ttl) = overrides.context_ttl_minutes {
            self.conversation.context_ttl_minutes = ttl;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_llm(&self.llm)?;
        validate_speech(&self.speech)?;
        validate_crm(&self.crm)?;
        validate_conversation(&self.conversation)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leadvox.toml"), PathBuf::from("config/leadvox.toml")]
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

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get it from @BotFather".to_string(),
        ));
    }
    if !bot_token.contains(':') {
        return Err(ConfigError::Validation(
            "telegram.bot_token must have the `<bot-id>:<secret>` shape issued by @BotFather"
                .to_string(),
        ));
    }

    if telegram.poll_timeout_secs == 0 || telegram.poll_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation("llm.max_tokens must be greater than zero".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_speech(speech: &SpeechConfig) -> Result<(), ConfigError> {
    if speech.timeout_secs == 0 || speech.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "speech.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if speech.whisper_model.trim().is_empty() {
        return Err(ConfigError::Validation("speech.whisper_model must not be empty".to_string()));
    }

    Ok(())
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if !crm.base_url.starts_with("http://") && !crm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "crm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if crm.timeout_secs == 0 || crm.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "crm.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.context_ttl_minutes == 0 {
        return Err(ConfigError::Validation(
            "conversation.context_ttl_minutes must be greater than zero".to_string(),
        ));
    }

    Ok(())
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    speech: Option<SpeechPatch>,
    crm: Option<CrmPatch>,
    conversation: Option<ConversationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechPatch {
    whisper_binary: Option<String>,
    whisper_model: Option<String>,
    hugging_face_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    context_ttl_minutes: Option<u64>,
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
