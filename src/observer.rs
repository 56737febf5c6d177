//! Data observer that accumulates evidence of streaming.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use crate::traits::{ExtendedData, StreamId};

/// Receiver of asynchronous data notifications.
///
/// Cameras call [`DataListener::on_new_data`] from their own delivery thread,
/// so implementors must be thread-safe.
pub trait DataListener: Send + Sync {
    /// Handle one notification.
    fn on_new_data(&self, data: &ExtendedData);
}

#[derive(Debug, Default)]
struct StreamingStats {
    frame_count: u64,
    temperatures: Vec<f32>,
    stream_ids: BTreeSet<StreamId>,
    exposure_times: Vec<u32>,
}

/// Listener that counts frames and collects temperature samples.
#[derive(Debug, Default)]
pub struct DataObserver {
    stats: Mutex<StreamingStats>,
}

impl DataObserver {
    /// Create an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Counters stay meaningful even if a delivery thread panicked mid-update.
    fn stats(&self) -> MutexGuard<'_, StreamingStats> {
        self.stats
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Clear the frame count and temperature samples.
    pub fn reset(&self) {
        let mut stats = self.stats();
        stats.frame_count = 0;
        stats.temperatures.clear();
    }

    /// Notifications received since creation or the last reset.
    pub fn frame_count(&self) -> u64 {
        self.stats().frame_count
    }

    /// Illumination temperatures received since creation or the last reset.
    pub fn temperature_samples(&self) -> Vec<f32> {
        self.stats().temperatures.clone()
    }

    /// Every stream id seen in depth metadata.
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.stats().stream_ids.iter().copied().collect()
    }

    /// Exposure times of the most recent depth frame.
    pub fn exposure_times(&self) -> Vec<u32> {
        self.stats().exposure_times.clone()
    }
}

impl DataListener for DataObserver {
    fn on_new_data(&self, data: &ExtendedData) {
        let mut stats = self.stats();
        stats.frame_count += 1;

        if let Some(depth) = &data.depth {
            stats.stream_ids.insert(depth.stream_id);
            stats.exposure_times.clone_from(&depth.exposure_times);
        }
        if let Some(raw) = &data.raw {
            stats.temperatures.push(raw.illumination_temperature);
        }
    }
}
