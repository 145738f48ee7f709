use crate::config::RegistryConfig;
use crate::error::{ChainError, Result};

/// Parsed form of `"{identity}:{epoch_seconds}:{suffix}"`.
///
/// The embedded timestamp is the only freshness anchor; nothing is recorded when a
/// message is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipMessage {
    pub identity: String,
    pub timestamp: i64,
}

impl OwnershipMessage {
    pub fn new(identity: impl Into<String>, timestamp: i64) -> Self {
        Self {
            identity: identity.into(),
            timestamp,
        }
    }

    pub fn render(&self, suffix: &str) -> String {
        format!("{}:{}:{}", self.identity, self.timestamp, suffix)
    }

    pub fn parse(message: &str, suffix: &str) -> Result<Self> {
        let parts: Vec<&str> = message.split(':').collect();
        let [identity, timestamp, found_suffix] = parts.as_slice() else {
            return Err(ChainError::MalformedMessage(format!(
                "expected 3 ':'-separated fields, got {}",
                parts.len()
            )));
        };

        if identity.is_empty() {
            return Err(ChainError::MalformedMessage("identity is empty".to_string()));
        }
        if *found_suffix != suffix {
            return Err(ChainError::MalformedMessage(format!(
                "expected suffix '{}', got '{}'",
                suffix, found_suffix
            )));
        }
        let timestamp = timestamp
            .parse::<i64>()
            .map_err(|_| ChainError::MalformedMessage(format!("invalid timestamp '{}'", timestamp)))?;

        Ok(Self::new(*identity, timestamp))
    }

    /// Reject the message once `now - timestamp >= window`, or when it is dated
    /// further ahead than the allowed clock skew.
    pub fn check_freshness(&self, now: i64, config: &RegistryConfig) -> Result<()> {
        let elapsed = now.saturating_sub(self.timestamp);
        let window = i64::try_from(config.freshness_window_secs).unwrap_or(i64::MAX);
        let skew = i64::try_from(config.max_clock_skew_secs).unwrap_or(i64::MAX);

        if elapsed >= window {
            return Err(ChainError::ExpiredMessage {
                elapsed,
                window: config.freshness_window_secs,
            });
        }
        if elapsed < -skew {
            return Err(ChainError::MalformedMessage(format!(
                "timestamp is {}s in the future",
                -elapsed
            )));
        }
        Ok(())
    }
}
