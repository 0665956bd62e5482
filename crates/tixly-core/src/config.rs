// ── Runtime connection configuration ──
//
// Describes *where* the ticketing service lives and how patiently to
// talk to it. The embedding application constructs a `SyncConfig` and
// hands it in -- core never reads config files.

use std::time::Duration;

use url::Url;

use tixly_api::{ChannelConfig, Error, NotificationChannel, RestClient, TransportConfig};

/// Configuration for one ticketing service connection.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST gateway base URL (e.g. `http://localhost:8080/api`).
    pub api_url: Url,
    /// Notification channel URL (e.g. `ws://localhost:8080/ws`).
    pub channel_url: Url,
    /// Per-request timeout for gateway calls.
    pub timeout: Duration,
    /// Fixed delay between channel reconnection attempts.
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api"
                .parse()
                .expect("default api url should parse"),
            channel_url: "ws://localhost:8080/ws"
                .parse()
                .expect("default channel url should parse"),
            timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Build the REST gateway client described by this config.
    pub fn rest_client(&self) -> Result<RestClient, Error> {
        RestClient::new(
            self.api_url.as_str(),
            &TransportConfig {
                timeout: self.timeout,
            },
        )
    }

    /// Build the notification channel described by this config.
    ///
    /// The channel is process-wide shared state with an explicit
    /// lifecycle: the application calls `connect()` once at startup and
    /// `disconnect()` at teardown.
    pub fn notification_channel(&self) -> NotificationChannel {
        NotificationChannel::with_config(
            self.channel_url.clone(),
            ChannelConfig {
                reconnect_delay: self.reconnect_delay,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_localhost() {
        let config = SyncConfig::default();
        assert_eq!(config.api_url.scheme(), "http");
        assert_eq!(config.channel_url.scheme(), "ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }
}
