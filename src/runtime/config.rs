use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_FLASH_DEBOUNCE_MS: u64 = 200;
const DEFAULT_FULL_DEBOUNCE_MS: u64 = 400;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the live block reconciler.
///
/// All instances must be constructed via [`ReconcilerConfig::builder`] so
/// invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    ws_url: String,
    rpc_url: String,
    flash_debounce: Duration,
    full_debounce: Duration,
    poll_interval: Duration,
    rpc_timeout: Duration,
    metrics_interval: Duration,
}

impl ReconcilerConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> ReconcilerConfigBuilder {
        ReconcilerConfigBuilder::default()
    }

    /// Websocket URL of the flash-stream endpoint.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// HTTP URL of the JSON-RPC full-block endpoint.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Debounce window applied to the flash stream.
    pub fn flash_debounce(&self) -> Duration {
        self.flash_debounce
    }

    /// Debounce window applied to the full-block source.
    pub fn full_debounce(&self) -> Duration {
        self.full_debounce
    }

    /// Interval between full-block polls. The first poll fires immediately.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Per-request timeout applied to the JSON-RPC client.
    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// Interval used by the metrics reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        let ws_url = self.ws_url.trim();
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            bail!("ws_url must start with ws:// or wss://");
        }

        let rpc_url = self.rpc_url.trim();
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            bail!("rpc_url must start with http:// or https://");
        }

        if self.flash_debounce.is_zero() {
            bail!("flash_debounce must be greater than 0");
        }

        if self.full_debounce.is_zero() {
            bail!("full_debounce must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than 0");
        }

        if self.rpc_timeout.is_zero() {
            bail!("rpc_timeout must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ReconcilerConfigBuilder {
    ws_url: Option<String>,
    rpc_url: Option<String>,
    flash_debounce: Option<Duration>,
    full_debounce: Option<Duration>,
    poll_interval: Option<Duration>,
    rpc_timeout: Option<Duration>,
    metrics_interval: Option<Duration>,
}

impl ReconcilerConfigBuilder {
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn flash_debounce(mut self, window: Duration) -> Self {
        self.flash_debounce = Some(window);
        self
    }

    pub fn full_debounce(mut self, window: Duration) -> Self {
        self.full_debounce = Some(window);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = Some(timeout);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<ReconcilerConfig> {
        let config = ReconcilerConfig {
            ws_url: self.ws_url.context("ws_url is required")?.trim().to_owned(),
            rpc_url: self
                .rpc_url
                .context("rpc_url is required")?
                .trim()
                .to_owned(),
            flash_debounce: self
                .flash_debounce
                .unwrap_or(Duration::from_millis(DEFAULT_FLASH_DEBOUNCE_MS)),
            full_debounce: self
                .full_debounce
                .unwrap_or(Duration::from_millis(DEFAULT_FULL_DEBOUNCE_MS)),
            poll_interval: self
                .poll_interval
                .unwrap_or(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
            rpc_timeout: self
                .rpc_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS)),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ReconcilerConfigBuilder {
        ReconcilerConfig::builder()
            .ws_url("wss://sepolia.flashblocks.base.org/ws")
            .rpc_url("https://sepolia-preconf.base.org")
    }

    #[test]
    fn builder_produces_valid_config_with_defaults() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.flash_debounce(), Duration::from_millis(200));
        assert_eq!(config.full_debounce(), Duration::from_millis(400));
        assert_eq!(config.poll_interval(), Duration::from_millis(2000));
        assert_eq!(
            config.rpc_timeout(),
            Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS)
        );
        assert_eq!(
            config.metrics_interval(),
            telemetry::DEFAULT_METRICS_INTERVAL
        );
    }

    #[test]
    fn windows_can_be_overridden() {
        let config = base_builder()
            .flash_debounce(Duration::from_millis(50))
            .full_debounce(Duration::from_millis(100))
            .poll_interval(Duration::from_millis(500))
            .build()
            .expect("config should build");
        assert_eq!(config.flash_debounce(), Duration::from_millis(50));
        assert_eq!(config.full_debounce(), Duration::from_millis(100));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn missing_required_fields_error() {
        let err = ReconcilerConfig::builder()
            .rpc_url("https://sepolia-preconf.base.org")
            .build()
            .unwrap_err();
        assert!(
            format!("{err}").contains("ws_url"),
            "error should mention missing ws_url"
        );

        let err = ReconcilerConfig::builder()
            .ws_url("wss://sepolia.flashblocks.base.org/ws")
            .build()
            .unwrap_err();
        assert!(
            format!("{err}").contains("rpc_url"),
            "error should mention missing rpc_url"
        );
    }

    #[test]
    fn validation_catches_invalid_values() {
        let err = base_builder().ws_url("http://not-a-socket").build().unwrap_err();
        assert!(
            format!("{err}").contains("ws:// or wss://"),
            "error should mention websocket scheme"
        );

        let err = base_builder().rpc_url("ftp://invalid").build().unwrap_err();
        assert!(
            format!("{err}").contains("http:// or https://"),
            "error should mention URL scheme"
        );

        let err = base_builder()
            .flash_debounce(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(
            format!("{err}").contains("flash_debounce"),
            "error should mention flash_debounce"
        );

        let err = base_builder()
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(
            format!("{err}").contains("poll_interval"),
            "error should mention poll_interval"
        );
    }
}
