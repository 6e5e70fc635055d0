use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Model used for every conversation completion.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// System preamble sent ahead of every completion request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Free calls a user gets before a subscription is required.
pub const DEFAULT_MAX_FREE_CALLS: u32 = 5;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub common: core_config::Config,
    pub openai: OpenAiConfig,
    pub auth: AuthConfig,
    pub usage: UsageConfig,
    /// `None` selects the in-memory stores (dev and tests only).
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Optional by contract: a missing key is reported per request, not at
    /// start-up.
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout_secs: u64,
    /// Append the caller's messages after the system preamble.
    pub forward_messages: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the session issuer.
    pub jwt_secret: Secret<String>,
    pub jwt_issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UsageConfig {
    pub max_free_calls: u32,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl ConversationConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let mongodb = match lookup("MONGODB_URI") {
            Some(uri) => Some(MongoConfig {
                uri,
                database: get("MONGODB_DATABASE", Some("conversation_db"))?,
            }),
            None if is_prod => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "MONGODB_URI is required in production but not set"
                )));
            }
            None => None,
        };

        let timeout_secs: u64 = parse_number(
            "OPENAI_TIMEOUT_SECS",
            &get(
                "OPENAI_TIMEOUT_SECS",
                Some(&DEFAULT_OPENAI_TIMEOUT_SECS.to_string()),
            )?,
        )?;
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OPENAI_TIMEOUT_SECS must be greater than zero"
            )));
        }

        Ok(ConversationConfig {
            common,
            openai: OpenAiConfig {
                api_key: lookup("OPENAI_API_KEY").map(Secret::new),
                base_url: get("OPENAI_BASE_URL", Some(DEFAULT_OPENAI_BASE_URL))?,
                model: get("CONVERSATION_MODEL", Some(DEFAULT_MODEL))?,
                system_prompt: get("CONVERSATION_SYSTEM_PROMPT", Some(DEFAULT_SYSTEM_PROMPT))?,
                timeout_secs,
                forward_messages: parse_flag(&get("CONVERSATION_FORWARD_MESSAGES", Some("false"))?),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(get("AUTH_JWT_SECRET", None)?),
                jwt_issuer: lookup("AUTH_JWT_ISSUER"),
            },
            usage: UsageConfig {
                max_free_calls: parse_number(
                    "FREE_TIER_MAX_CALLS",
                    &get("FREE_TIER_MAX_CALLS", Some(&DEFAULT_MAX_FREE_CALLS.to_string()))?,
                )?,
            },
            mongodb,
        })
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} is not a valid number ({}): {}", key, value, e))
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
