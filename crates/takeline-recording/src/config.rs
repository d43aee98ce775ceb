//! Recording configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a resumed recording treats material already in the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordingMode {
    /// Keep recording into the same region, merging with existing events
    #[default]
    MergeEvents,
    /// Keep recording into the same region, replacing events under the new range
    OverwriteEvents,
    /// Start a new region on the next lane for every resumed run
    Takes,
    /// Like `Takes`, and mute the previous take
    TakesMuted,
}

impl RecordingMode {
    /// Whether a resumed run opens a new region on the next lane.
    pub fn creates_takes(self) -> bool {
        matches!(self, Self::Takes | Self::TakesMuted)
    }
}

/// Capacities and behaviour of a recording pipeline.
///
/// Everything here is fixed when the [`RecordingManager`](crate::RecordingManager)
/// is built; the pool and queue never grow afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Largest processing cycle, in frames. Sizes the inline audio buffers.
    pub max_block_length: usize,
    /// Number of preallocated recording events.
    pub pool_capacity: usize,
    /// Event queue slots.
    pub queue_capacity: usize,
    /// Tracks a single producer can keep record flags for.
    pub max_tracks: usize,
    /// Automation lanes a single producer can keep record flags for.
    pub max_automation_lanes: usize,
    /// Region ids remembered per pass for the undo action.
    pub recorded_ids_capacity: usize,
    /// Worker drain period in milliseconds.
    pub drain_interval_ms: u64,
    pub mode: RecordingMode,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_block_length: 4096,
            pool_capacity: 10_000,
            queue_capacity: 10_000,
            max_tracks: 256,
            max_automation_lanes: 1024,
            recorded_ids_capacity: 8000,
            drain_interval_ms: 12,
            mode: RecordingMode::MergeEvents,
        }
    }
}

impl RecordingConfig {
    /// Create a builder for configuring a recording pipeline
    ///
    /// # Example
    /// ```
    /// use takeline_recording::{RecordingConfig, RecordingMode};
    ///
    /// let config = RecordingConfig::builder()
    ///     .max_block_length(512)
    ///     .event_capacity(2048)
    ///     .mode(RecordingMode::Takes)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.queue_capacity, 2048);
    /// ```
    pub fn builder() -> RecordingConfigBuilder {
        RecordingConfigBuilder::default()
    }

    /// Small capacities for tests.
    pub fn for_testing() -> Self {
        Self {
            max_block_length: 1024,
            pool_capacity: 400,
            queue_capacity: 400,
            max_tracks: 16,
            max_automation_lanes: 64,
            recorded_ids_capacity: 64,
            drain_interval_ms: 2,
            mode: RecordingMode::MergeEvents,
        }
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("max_block_length", self.max_block_length),
            ("pool_capacity", self.pool_capacity),
            ("queue_capacity", self.queue_capacity),
            ("max_tracks", self.max_tracks),
            ("recorded_ids_capacity", self.recorded_ids_capacity),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        if self.pool_capacity > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "pool_capacity {} exceeds u32 range",
                self.pool_capacity
            )));
        }
        if self.max_block_length > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "max_block_length {} exceeds u32 range",
                self.max_block_length
            )));
        }
        if self.drain_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "drain_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for RecordingConfig with fluent API
#[derive(Clone, Debug, Default)]
pub struct RecordingConfigBuilder {
    config: RecordingConfig,
}

impl RecordingConfigBuilder {
    pub fn max_block_length(mut self, frames: usize) -> Self {
        self.config.max_block_length = frames;
        self
    }

    pub fn pool_capacity(mut self, events: usize) -> Self {
        self.config.pool_capacity = events;
        self
    }

    pub fn queue_capacity(mut self, events: usize) -> Self {
        self.config.queue_capacity = events;
        self
    }

    /// Set pool and queue capacity together
    pub fn event_capacity(self, events: usize) -> Self {
        self.pool_capacity(events).queue_capacity(events)
    }

    pub fn max_tracks(mut self, tracks: usize) -> Self {
        self.config.max_tracks = tracks;
        self
    }

    pub fn max_automation_lanes(mut self, lanes: usize) -> Self {
        self.config.max_automation_lanes = lanes;
        self
    }

    pub fn recorded_ids_capacity(mut self, ids: usize) -> Self {
        self.config.recorded_ids_capacity = ids;
        self
    }

    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config.drain_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn mode(mut self, mode: RecordingMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Build and validate the RecordingConfig
    pub fn build(self) -> Result<RecordingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
