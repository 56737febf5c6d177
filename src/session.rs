//! State accumulated across the stages of one run.

use crate::traits::StreamId;

/// What earlier stages learned about the camera.
///
/// Fields are filled in as stages pass and are never cleared during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraSession {
    /// Active use case, set by initialization and the use case switch.
    pub use_case: String,
    /// Stream used by later stages, set by the stream stage.
    pub stream_id: StreamId,
    /// Frame rate reported for the active use case.
    pub fps: u16,
    /// Access level read from the camera, `None` until the access stage ran.
    pub access_level: Option<u8>,
}

impl CameraSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
