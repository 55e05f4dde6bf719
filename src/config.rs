use std::time::Duration;

use crate::errors::ConfigError;

/// Every address handed to the channel carries this prefix.
pub const CHANNEL_PREFIX: &str = "whatsapp:";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "approval_relay=debug,tower_http=debug";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub account_sid: String,
    pub auth_token: String,
    /// Provider-assigned sender, always prefixed with [`CHANNEL_PREFIX`].
    pub sender: String,
    /// Approver address, always prefixed with [`CHANNEL_PREFIX`].
    pub recipient: String,
    pub api_base: String,
    pub send_timeout: Duration,
    /// Origins allowed to call the API from a browser.
    pub cors_origins: Vec<String>,
    /// URLs that receive an `approval_received` event for every reply.
    pub webhook_urls: Vec<String>,
    pub webhook_secret: Option<String>,
}

/// Logging settings, read before anything else so startup errors are logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// `EnvFilter` directive from `RUST_LOG`.
    pub filter: String,
    /// `RELAY_LOG_FORMAT=json` switches to JSON lines.
    pub json: bool,
}

impl LogSettings {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            filter: lookup("RUST_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
            json: lookup("RELAY_LOG_FORMAT").is_some_and(|v| v.trim().eq_ignore_ascii_case("json")),
        }
    }
}

/// Merge `.env` (if present) into the process environment. Existing variables win.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Logging settings from the process environment. Call after [`load_dotenv`].
pub fn log_settings() -> LogSettings {
    LogSettings::from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from the process environment (and `.env`, if present).
pub fn load() -> anyhow::Result<Config> {
    load_dotenv();
    let cfg = Config::from_lookup(|key| std::env::var(key).ok())?;
    Ok(cfg)
}

impl Config {
    /// Build and validate configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let account_sid = get("TWILIO_ACCOUNT_SID").ok_or(ConfigError::Missing("TWILIO_ACCOUNT_SID"))?;
        if !account_sid.starts_with("AC") {
            return Err(ConfigError::Invalid {
                key: "TWILIO_ACCOUNT_SID",
                reason: "account SIDs start with 'AC'".into(),
            });
        }

        let auth_token = get("TWILIO_AUTH_TOKEN").ok_or(ConfigError::Missing("TWILIO_AUTH_TOKEN"))?;

        let sender = get("TWILIO_WHATSAPP_NUMBER")
            .ok_or(ConfigError::Missing("TWILIO_WHATSAPP_NUMBER"))
            .and_then(|v| channel_address("TWILIO_WHATSAPP_NUMBER", &v))?;
        let recipient = get("MY_PHONE")
            .ok_or(ConfigError::Missing("MY_PHONE"))
            .and_then(|v| channel_address("MY_PHONE", &v))?;

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                reason: format!("'{}' is not a port number", raw),
            })?,
            None => DEFAULT_PORT,
        };

        let api_base = get("TWILIO_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.into())
            .trim_end_matches('/')
            .to_string();
        if url::Url::parse(&api_base).is_err() {
            return Err(ConfigError::Invalid {
                key: "TWILIO_API_BASE",
                reason: format!("'{}' is not a URL", api_base),
            });
        }

        let send_timeout_secs = match get("RELAY_SEND_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "RELAY_SEND_TIMEOUT_SECS",
                        reason: format!("'{}' is not a positive number of seconds", raw),
                    })
                }
            },
            None => DEFAULT_SEND_TIMEOUT_SECS,
        };

        let mut cors_origins = split_list(get("CORS_ORIGINS").as_deref());
        if cors_origins.is_empty() {
            cors_origins.push(DEFAULT_CORS_ORIGIN.to_string());
        }
        for origin in &cors_origins {
            check_origin(origin)?;
        }

        let webhook_urls = split_list(get("RELAY_WEBHOOK_URLS").as_deref());
        for target in &webhook_urls {
            check_http_url("RELAY_WEBHOOK_URLS", target)?;
        }

        Ok(Config {
            port,
            account_sid,
            auth_token,
            sender,
            recipient,
            api_base,
            send_timeout: Duration::from_secs(send_timeout_secs),
            cors_origins,
            webhook_urls,
            webhook_secret: get("RELAY_WEBHOOK_SECRET"),
        })
    }
}

/// Normalize a configured number to `whatsapp:+<digits>`.
fn channel_address(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let number = raw.strip_prefix(CHANNEL_PREFIX).unwrap_or(raw).trim();
    let digits = number.strip_prefix('+').ok_or_else(|| ConfigError::Invalid {
        key,
        reason: format!("'{}' must be in E.164 format (+<country><number>)", number),
    })?;
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("'{}' must be '+' followed by 8 to 15 digits", number),
        });
    }
    Ok(format!("{}{}", CHANNEL_PREFIX, number))
}

/// Origins are matched exactly, so `*` and paths are rejected.
fn check_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "CORS_ORIGINS",
        reason,
    };
    if origin == "*" {
        return Err(invalid(
            "wildcard origin cannot be combined with credentials".into(),
        ));
    }
    let parsed = check_http_url("CORS_ORIGINS", origin)?;
    if parsed.origin().ascii_serialization() != origin {
        return Err(invalid(format!(
            "'{}' must be a bare origin (scheme://host[:port])",
            origin
        )));
    }
    if axum::http::HeaderValue::from_str(origin).is_err() {
        return Err(invalid(format!("'{}' is not a valid header value", origin)));
    }
    Ok(())
}

fn check_http_url(key: &'static str, raw: &str) -> Result<url::Url, ConfigError> {
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("'{}' is not an http(s) URL", raw),
        }),
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
