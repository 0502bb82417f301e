//! Real-time client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::ws::ReconnectConfig;

pub const ENV_URL: &str = "CASEPULSE_WS_URL";
pub const ENV_TOKEN_PARAM: &str = "CASEPULSE_WS_TOKEN_PARAM";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CASEPULSE_WS_CONNECT_TIMEOUT_MS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "CASEPULSE_WS_MAX_RECONNECT_ATTEMPTS";

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/api/ws";
pub const DEFAULT_TOKEN_PARAM: &str = "token";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to open the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, without the token.
    pub endpoint: Url,
    /// Query parameter that carries the auth token.
    pub token_param: String,
    /// Upper bound on the opening handshake.
    pub connect_timeout: Duration,
    /// Backoff and retry budget.
    pub reconnect: ReconnectConfig,
}

impl RealtimeConfig {
    /// Configuration for `endpoint` with default settings.
    ///
    /// `http`/`https` endpoints are rewritten to `ws`/`wss`.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(ENV_URL, endpoint)?,
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        })
    }

    /// Read configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CASEPULSE_WS_URL`: endpoint (default: "ws://localhost:8080/api/ws")
    /// - `CASEPULSE_WS_TOKEN_PARAM`: token query parameter (default: "token")
    /// - `CASEPULSE_WS_CONNECT_TIMEOUT_MS`: handshake timeout (default: 10000)
    /// - `CASEPULSE_WS_MAX_RECONNECT_ATTEMPTS`: retry budget, 0 for unlimited (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`RealtimeConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup(ENV_URL).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let mut config = Self::new(&endpoint)?;

        if let Some(param) = lookup(ENV_TOKEN_PARAM) {
            let param = param.trim();
            if param.is_empty() {
                return Err(ConfigError::Empty(ENV_TOKEN_PARAM));
            }
            config.token_param = param.to_string();
        }

        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            let ms = parse_number(ENV_CONNECT_TIMEOUT_MS, &value)?;
            config.connect_timeout = Duration::from_millis(ms);
        }

        if let Some(value) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            let attempts = parse_number(ENV_MAX_RECONNECT_ATTEMPTS, &value)?;
            let attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidNumber {
                var: ENV_MAX_RECONNECT_ATTEMPTS,
                value: value.clone(),
            })?;
            config.reconnect = config.reconnect.max_attempts(attempts);
        }

        Ok(config)
    }

    pub fn token_param(mut self, param: impl Into<String>) -> Self {
        self.token_param = param.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Endpoint with `token` attached. The authentication context of a
    /// socket is fixed by this URL at open time.
    pub fn connect_url(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(&self.token_param, token);
        url
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn parse_endpoint(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })?;

    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;
    Ok(url)
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = RealtimeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, RealtimeConfig::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn reads_overrides() {
        let config = RealtimeConfig::from_lookup(lookup_from(&[
            (ENV_URL, "wss://api.example.com/realtime"),
            (ENV_TOKEN_PARAM, "access_token"),
            (ENV_CONNECT_TIMEOUT_MS, "2500"),
            (ENV_MAX_RECONNECT_ATTEMPTS, "8"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint.as_str(), "wss://api.example.com/realtime");
        assert_eq!(config.token_param, "access_token");
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.reconnect.max_attempts, 8);
    }

    #[test]
    fn http_endpoints_become_websocket_endpoints() {
        let config = RealtimeConfig::new("https://api.example.com/ws").unwrap();
        assert_eq!(config.endpoint.scheme(), "wss");
        let config = RealtimeConfig::new("http://localhost:3000/ws").unwrap();
        assert_eq!(config.endpoint.as_str(), "ws://localhost:3000/ws");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            RealtimeConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RealtimeConfig::new("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            RealtimeConfig::from_lookup(lookup_from(&[(ENV_CONNECT_TIMEOUT_MS, "soon")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            RealtimeConfig::from_lookup(lookup_from(&[(ENV_TOKEN_PARAM, " ")])),
            Err(ConfigError::Empty(_))
        ));
    }

    #[test]
    fn token_is_appended_to_query() {
        let config = RealtimeConfig::new("ws://localhost:8080/api/ws?v=2").unwrap();
        let url = config.connect_url("a b&c");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("v".to_string(), "2".to_string()),
                ("token".to_string(), "a b&c".to_string())
            ]
        );
        // The stored endpoint is untouched.
        assert_eq!(config.endpoint.query(), Some("v=2"));
    }
}
