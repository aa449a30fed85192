use std::str::FromStr;
use std::time::Duration;

use onair_client::client::ws_url_from_api_url;
use onair_client::folder_compat::DEFAULT_LEGACY_FOLDER_IDS;
use onair_client::reconnect::ReconnectConfig;
use onair_core::types::DbId;

/// Session configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend on the local machine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend base URL, without the `/api/radio` prefix.
    pub api_url: String,
    /// Push-channel endpoint.
    pub ws_url: String,
    /// Bearer token attached to every REST request, if set.
    pub api_token: Option<String>,
    /// Deadline for each HTTP request.
    pub request_timeout: Duration,
    /// Deadline for each WebSocket handshake.
    pub connect_timeout: Duration,
    /// How often playback is invalidated as a fallback to push updates.
    /// Zero disables polling.
    pub playback_poll_interval: Duration,
    /// Reconnect the push channel after it drops.
    pub reconnect: bool,
    /// Backoff between reconnect attempts. Not read from the environment.
    pub reconnect_backoff: ReconnectConfig,
    /// Folders whose track lookup needs the filter fallback.
    pub legacy_folder_ids: Vec<DbId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let api_url = "http://localhost:5000".to_string();
        Self {
            ws_url: ws_url_from_api_url(&api_url),
            api_url,
            api_token: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            playback_poll_interval: Duration::from_millis(5000),
            reconnect: true,
            reconnect_backoff: ReconnectConfig::default(),
            legacy_folder_ids: DEFAULT_LEGACY_FOLDER_IDS.to_vec(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                   |
    /// |-----------------------------|---------------------------|
    /// | `ONAIR_API_URL`             | `http://localhost:5000`   |
    /// | `ONAIR_WS_URL`              | derived from the API URL  |
    /// | `ONAIR_API_TOKEN`           | unset                     |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                      |
    /// | `WS_CONNECT_TIMEOUT_SECS`   | `10`                      |
    /// | `PLAYBACK_POLL_INTERVAL_MS` | `5000` (`0` disables)     |
    /// | `WS_RECONNECT`              | `true`                    |
    /// | `LEGACY_FOLDER_IDS`         | `1,2`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = lookup("ONAIR_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let ws_url = lookup("ONAIR_WS_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| ws_url_from_api_url(&api_url));

        let api_token = lookup("ONAIR_API_TOKEN").filter(|token| !token.trim().is_empty());

        let request_timeout_secs: u64 = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let connect_timeout_secs: u64 = parse_var(&lookup, "WS_CONNECT_TIMEOUT_SECS", 10)?;
        let poll_interval_ms: u64 = parse_var(&lookup, "PLAYBACK_POLL_INTERVAL_MS", 5000)?;
        let reconnect: bool = parse_var(&lookup, "WS_RECONNECT", true)?;

        let legacy_folder_ids = match lookup("LEGACY_FOLDER_IDS") {
            None => defaults.legacy_folder_ids,
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<DbId>().map_err(|_| ConfigError::Invalid {
                        var: "LEGACY_FOLDER_IDS",
                        value: raw.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            api_url,
            ws_url,
            api_token,
            request_timeout: Duration::from_secs(request_timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            playback_poll_interval: Duration::from_millis(poll_interval_ms),
            reconnect,
            reconnect_backoff: defaults.reconnect_backoff,
            legacy_folder_ids,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SessionConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SessionConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.ws_url, "ws://localhost:5000/ws");
        assert_eq!(config.api_token, None);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.playback_poll_interval, Duration::from_secs(5));
        assert!(config.reconnect);
        assert_eq!(config.legacy_folder_ids, vec![1, 2]);
    }

    #[test]
    fn ws_url_follows_api_url() {
        let config = load(&[("ONAIR_API_URL", "https://studio.example/")]).unwrap();
        assert_eq!(config.api_url, "https://studio.example");
        assert_eq!(config.ws_url, "wss://studio.example/ws");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[
            ("ONAIR_WS_URL", "ws://push:9000/live"),
            ("ONAIR_API_TOKEN", "secret"),
            ("PLAYBACK_POLL_INTERVAL_MS", "0"),
            ("WS_RECONNECT", "false"),
            ("LEGACY_FOLDER_IDS", "3, 4"),
        ])
        .unwrap();
        assert_eq!(config.ws_url, "ws://push:9000/live");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert!(config.playback_poll_interval.is_zero());
        assert!(!config.reconnect);
        assert_eq!(config.legacy_folder_ids, vec![3, 4]);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = load(&[("REQUEST_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "REQUEST_TIMEOUT_SECS", .. });
    }

    #[test]
    fn invalid_folder_id_is_rejected() {
        let err = load(&[("LEGACY_FOLDER_IDS", "1,music")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "LEGACY_FOLDER_IDS", .. });
    }
}
