//! Stage outcomes and their error classification.

use std::fmt;

use crate::stages::Stage;

/// Classification of a stage result.
///
/// The discriminant is the process exit code reported for a failed run.
/// Code 1 is left to command line usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// The stage passed.
    None = 0,
    /// No camera handle could be constructed.
    DeviceNotCreated = 2,
    /// The camera refused to initialize.
    DeviceNotInitialized = 3,
    /// Streams could not be listed or none exist.
    StreamError = 4,
    /// The access level could not be read or is not the expected one.
    AccessLevelError = 5,
    /// Listener registration, capture start or exposure control failed.
    ExposureModeError = 6,
    /// Use case listing, selection or frame rate verification failed.
    UseCaseError = 7,
    /// Processing parameters did not round-trip.
    ProcessingParameterError = 8,
    /// Lens calibration is missing or implausible.
    LensParameterError = 9,
    /// Streaming produced no data, bad temperatures or the wrong frame rate.
    ReceiveDataError = 10,
}

impl ErrorKind {
    /// Exit code for this kind.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::DeviceNotCreated => "device not created",
            Self::DeviceNotInitialized => "device not initialized",
            Self::StreamError => "stream error",
            Self::AccessLevelError => "access level error",
            Self::ExposureModeError => "exposure mode error",
            Self::UseCaseError => "use case error",
            Self::ProcessingParameterError => "processing parameter error",
            Self::LensParameterError => "lens parameter error",
            Self::ReceiveDataError => "receive data error",
        };
        f.write_str(name)
    }
}

/// Result of running one stage. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    stage: Stage,
    kind: ErrorKind,
    message: String,
}

impl StageOutcome {
    /// A passing outcome.
    pub fn success<S: Into<String>>(stage: Stage, message: S) -> Self {
        Self {
            stage,
            kind: ErrorKind::None,
            message: message.into(),
        }
    }

    /// A failing outcome. `kind` must not be [`ErrorKind::None`].
    pub fn failure<S: Into<String>>(stage: Stage, kind: ErrorKind, message: S) -> Self {
        debug_assert_ne!(kind, ErrorKind::None, "failure outcome without error kind");
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// Stage that produced the outcome.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Error classification, [`ErrorKind::None`] on success.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic or audit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the stage passed.
    pub fn is_success(&self) -> bool {
        self.kind == ErrorKind::None
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "[PASS] {}: {}", self.stage, self.message)
        } else {
            write!(f, "[FAIL] {} ({}): {}", self.stage, self.kind, self.message)
        }
    }
}
