use std::time::Duration;

use crate::gemini::Credentials;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub model: String,
    pub credentials: Credentials,
    pub port: u16,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let seconds = |key: &str, default: u64| {
            Duration::from_secs(lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };

        Self {
            api_base: non_empty("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            credentials: Credentials {
                free: non_empty("GEMINI_API_KEY_FREE").or_else(|| non_empty("GEMINI_API_KEY")),
                premium: non_empty("GEMINI_API_KEY_PREMIUM"),
            },
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            request_timeout: seconds("REQUEST_TIMEOUT_SECS", 60),
            cache_ttl: seconds("CACHE_TTL_SECS", 600),
        }
    }
}
