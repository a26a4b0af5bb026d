// Runtime configuration, read once at startup from the environment.
//
// Values are looked up through a closure so tests can feed a plain map
// instead of mutating the process environment.

use chrono_tz::Tz;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where the service-account key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// `GOOGLE_SERVICE_ACCOUNT_KEY`: path to the JSON key file.
    KeyFile(PathBuf),
    /// `GOOGLE_SERVICE_ACCOUNT_JSON` or its base64 variant, already decoded.
    InlineJson(String),
}

// The inline variant holds a private key; keep it out of logs.
impl fmt::Debug for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsSource::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            CredentialsSource::InlineJson(_) => f.write_str("InlineJson(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: CredentialsSource,
    pub spreadsheet_id: String,
    pub host: IpAddr,
    pub port: u16,
    pub allow_until_midnight: bool,
    pub timezone: Tz,
    pub request_timeout: Duration,
    pub debug_endpoints: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = if let Some(path) = get("GOOGLE_SERVICE_ACCOUNT_KEY") {
            CredentialsSource::KeyFile(PathBuf::from(path.trim()))
        } else if let Some(json) = get("GOOGLE_SERVICE_ACCOUNT_JSON") {
            CredentialsSource::InlineJson(json)
        } else if let Some(encoded) = get("GOOGLE_SERVICE_ACCOUNT_JSON_B64") {
            CredentialsSource::InlineJson(decode_base64_json(&encoded)?)
        } else {
            return Err(ConfigError::Missing("GOOGLE_SERVICE_ACCOUNT_KEY"));
        };

        let spreadsheet_id = get("SPREADSHEET_ID")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing("SPREADSHEET_ID"))?;

        let port = get("PORT")
            .ok_or(ConfigError::Missing("PORT"))?
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?;

        let host = get("HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "HOST",
                reason: e.to_string(),
            })?;

        let timezone = match get("LIBRARY_TIMEZONE") {
            Some(name) => name.trim().parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "LIBRARY_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => Tz::UTC,
        };

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "REQUEST_TIMEOUT_SECS",
                    reason: format!("expected a positive number of seconds, got {raw:?}"),
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials,
            spreadsheet_id,
            host,
            port,
            allow_until_midnight: get("ALLOW_UNTIL_MIDNIGHT").is_some_and(|v| is_truthy(&v)),
            timezone,
            request_timeout: Duration::from_secs(timeout_secs),
            debug_endpoints: get("ENABLE_DEBUG_ENDPOINTS").is_some_and(|v| is_truthy(&v)),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn decode_base64_json(encoded: &str) -> Result<String, ConfigError> {
    use base64::Engine;

    let invalid = |reason: String| ConfigError::Invalid {
        name: "GOOGLE_SERVICE_ACCOUNT_JSON_B64",
        reason,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| invalid(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
}
