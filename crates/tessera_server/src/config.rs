//! Backend configuration.

use crate::error::{ServerError, ServerResult};

/// Configuration for the sync backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Minimum gap between the document's server sequence and the client's
    /// checkpoint at which a pull answers with a snapshot instead of changes.
    pub snapshot_threshold: u64,
    /// Number of new changes after which a push-pull cycle stores a fresh
    /// snapshot.
    pub snapshot_interval: u64,
    /// Maximum number of changes read per step while replaying changes into
    /// a snapshot.
    pub snapshot_replay_chunk: u64,
}

impl BackendConfig {
    /// Default snapshot threshold.
    pub const DEFAULT_SNAPSHOT_THRESHOLD: u64 = 1000;
    /// Default snapshot interval.
    pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 1000;
    /// Default replay chunk size.
    pub const DEFAULT_SNAPSHOT_REPLAY_CHUNK: u64 = 100;

    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            snapshot_threshold: Self::DEFAULT_SNAPSHOT_THRESHOLD,
            snapshot_interval: Self::DEFAULT_SNAPSHOT_INTERVAL,
            snapshot_replay_chunk: Self::DEFAULT_SNAPSHOT_REPLAY_CHUNK,
        }
    }

    /// Sets the snapshot threshold.
    pub fn with_snapshot_threshold(mut self, threshold: u64) -> Self {
        self.snapshot_threshold = threshold;
        self
    }

    /// Sets the snapshot interval.
    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Sets the replay chunk size.
    pub fn with_snapshot_replay_chunk(mut self, chunk: u64) -> Self {
        self.snapshot_replay_chunk = chunk;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] if the snapshot threshold or the
    /// replay chunk size is zero.
    pub fn validate(&self) -> ServerResult<()> {
        if self.snapshot_threshold == 0 {
            return Err(ServerError::InvalidConfig(
                "snapshot_threshold must be greater than zero".into(),
            ));
        }
        if self.snapshot_replay_chunk == 0 {
            return Err(ServerError::InvalidConfig(
                "snapshot_replay_chunk must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.snapshot_threshold, 1000);
        assert_eq!(config.snapshot_interval, 1000);
        assert_eq!(config.snapshot_replay_chunk, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder() {
        let config = BackendConfig::new()
            .with_snapshot_threshold(100)
            .with_snapshot_interval(50)
            .with_snapshot_replay_chunk(10);

        assert_eq!(config.snapshot_threshold, 100);
        assert_eq!(config.snapshot_interval, 50);
        assert_eq!(config.snapshot_replay_chunk, 10);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = BackendConfig::new()
            .with_snapshot_threshold(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidConfig(_)));

        let err = BackendConfig::new()
            .with_snapshot_replay_chunk(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("snapshot_replay_chunk"));

        // a zero interval stores a snapshot on every cycle
        assert!(BackendConfig::new().with_snapshot_interval(0).validate().is_ok());
    }
}
