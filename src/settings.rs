//! Run configuration injected into the protocol.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::traits::{ProcessingFlag, Variant};

/// Use case run when none is requested.
pub const DEFAULT_USE_CASE: &str = "MODE_9_5FPS";

/// Default streaming window in seconds.
pub const DEFAULT_STREAM_SECONDS: u32 = 15;

/// Shortest streaming window the command line accepts.
pub const MIN_STREAM_SECONDS: u32 = 10;

/// Access code provisioned for the test station.
pub const DEFAULT_ACCESS_CODE: &str = "c715e2ca31e816b1ef17ba487e2a5e9efc6bbd7b";

/// Waits inserted between device operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Wait after a mode change before the next command.
    pub settle: Duration,
    /// Wait before checking that data arrives at all.
    pub warm_up: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            warm_up: Duration::from_secs(1),
        }
    }
}

/// Where the receive data stage records to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSinks {
    /// Recording file for regular runs.
    pub output: PathBuf,
    /// Destination for long runs that would otherwise fill the disk.
    pub discard: PathBuf,
    /// Windows longer than this many seconds record to `discard`.
    pub discard_after_seconds: u32,
}

impl Default for RecordingSinks {
    fn default() -> Self {
        Self {
            output: PathBuf::from("test.rrf"),
            discard: PathBuf::from("/dev/null"),
            discard_after_seconds: 300,
        }
    }
}

impl RecordingSinks {
    /// Destination for a window of `seconds`.
    pub fn destination(&self, seconds: u32) -> &Path {
        if seconds > self.discard_after_seconds {
            &self.discard
        } else {
            &self.output
        }
    }
}

/// Register written by the access level stage to check write access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRegister {
    /// Register address as the device expects it.
    pub address: String,
    /// Value to write.
    pub value: u32,
}

impl Default for DiagnosticRegister {
    fn default() -> Self {
        Self {
            address: "0xA0A3".to_owned(),
            value: 0x1000,
        }
    }
}

/// Processing parameter values written and verified by the processing stage.
#[must_use]
pub fn default_processing_targets() -> Vec<(ProcessingFlag, Variant)> {
    vec![
        (ProcessingFlag::UseRemoveFlyingPixel, Variant::Bool(false)),
        (ProcessingFlag::UseRemoveStrayLight, Variant::Bool(true)),
        (ProcessingFlag::AdaptiveNoiseFilterType, Variant::Int(2)),
        (ProcessingFlag::NoiseThreshold, Variant::Float(0.07)),
        (ProcessingFlag::GlobalBinning, Variant::Int(1)),
        (ProcessingFlag::AutoExposureRefValue, Variant::Float(400.0)),
    ]
}

/// Everything a run needs to know that is not read from the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Use case the initialize stage applies.
    pub use_case: String,
    /// Length of the measured streaming window.
    pub stream_seconds: u32,
    /// Access code held for the station, `None` when running without one.
    pub access_code: Option<String>,
    /// Explicit expected access level, overriding the one implied by the code.
    pub expected_access_level: Option<u8>,
    /// Stop at the first failing stage.
    pub exit_on_error: bool,
    /// Allowed deviation of the measured frame rate, in frames per second.
    pub fps_tolerance: f32,
    /// Values the processing stage writes and verifies.
    pub processing_targets: Vec<(ProcessingFlag, Variant)>,
    /// Register written by the access level stage.
    pub diagnostic_register: DiagnosticRegister,
    /// Recording destinations.
    pub recording: RecordingSinks,
    /// Settle and warm-up waits.
    pub timing: Timing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_case: DEFAULT_USE_CASE.to_owned(),
            stream_seconds: DEFAULT_STREAM_SECONDS,
            access_code: Some(DEFAULT_ACCESS_CODE.to_owned()),
            expected_access_level: None,
            exit_on_error: true,
            fps_tolerance: 0.5,
            processing_targets: default_processing_targets(),
            diagnostic_register: DiagnosticRegister::default(),
            recording: RecordingSinks::default(),
            timing: Timing::default(),
        }
    }
}

impl Settings {
    /// Set the use case to apply.
    #[must_use]
    pub fn with_use_case<S: Into<String>>(mut self, use_case: S) -> Self {
        self.use_case = use_case.into();
        self
    }

    /// Set the streaming window length.
    #[must_use]
    pub const fn with_stream_seconds(mut self, seconds: u32) -> Self {
        self.stream_seconds = seconds;
        self
    }

    /// Set or clear the access code. An empty code counts as none.
    #[must_use]
    pub fn with_access_code(mut self, code: Option<String>) -> Self {
        self.access_code = code.filter(|code| !code.is_empty());
        self
    }

    /// Pin the expected access level.
    #[must_use]
    pub const fn with_expected_access_level(mut self, level: u8) -> Self {
        self.expected_access_level = Some(level);
        self
    }

    /// Choose between halting on the first failure and running everything.
    #[must_use]
    pub const fn with_exit_on_error(mut self, exit_on_error: bool) -> Self {
        self.exit_on_error = exit_on_error;
        self
    }

    /// Replace the processing targets.
    #[must_use]
    pub fn with_processing_targets(mut self, targets: Vec<(ProcessingFlag, Variant)>) -> Self {
        self.processing_targets = targets;
        self
    }

    /// Replace the recording destinations.
    #[must_use]
    pub fn with_recording(mut self, recording: RecordingSinks) -> Self {
        self.recording = recording;
        self
    }

    /// Replace the settle and warm-up waits.
    #[must_use]
    pub const fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Access level the camera must report.
    ///
    /// Stations holding an access code run at level 3, others at level 1.
    pub fn expected_access_level(&self) -> u8 {
        let by_code = if self.access_code.is_some() { 3 } else { 1 };
        self.expected_access_level.unwrap_or(by_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.use_case, "MODE_9_5FPS");
        assert_eq!(settings.stream_seconds, 15);
        assert!(settings.exit_on_error);
        assert_eq!(settings.processing_targets.len(), 6);
    }

    #[test]
    fn test_expected_access_level_follows_access_code() {
        assert_eq!(Settings::default().expected_access_level(), 3);
        let without_code = Settings::default().with_access_code(Some(String::new()));
        assert_eq!(without_code.access_code, None);
        assert_eq!(without_code.expected_access_level(), 1);
        let pinned = without_code.with_expected_access_level(2);
        assert_eq!(pinned.expected_access_level(), 2);
    }

    #[test]
    fn test_long_windows_record_to_discard_sink() {
        let sinks = RecordingSinks::default();
        assert_eq!(sinks.destination(300), Path::new("test.rrf"));
        assert_eq!(sinks.destination(301), Path::new("/dev/null"));
    }
}
