//! Core traits and types for the depth camera contract.
//!
//! Everything a validation stage may ask of a camera goes through
//! [`DepthCamera`]. Vendor backends, the simulated camera and the test
//! double all implement it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::observer::DataListener;

/// Identifier of one logical data channel within a use case.
///
/// `StreamId(0)` addresses the device's default stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(pub u16);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Granularity of the data delivered to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// Raw sensor frames only.
    Raw,
    /// Final depth data only.
    Depth,
    /// Raw, intermediate and depth data.
    Intermediate,
}

/// Exposure control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    /// Exposure time is set explicitly per stream.
    Manual,
    /// The device regulates exposure itself.
    Automatic,
}

/// Optical calibration of the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct LensParameters {
    /// Principal point (cx, cy) in pixels.
    pub principal_point: (f32, f32),
    /// Focal length (fx, fy) in pixels.
    pub focal_length: (f32, f32),
    /// Radial distortion coefficients (k1, k2, k3).
    pub distortion_radial: Vec<f32>,
    /// Tangential distortion coefficients (p1, p2).
    pub distortion_tangential: (f32, f32),
}

/// A device-side processing setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingFlag {
    /// Consistency tolerance between modulation frequencies (float).
    ConsistencyTolerance,
    /// Flying pixel filter sensitivity (float).
    FlyingPixelsF0,
    /// Noise threshold (float).
    NoiseThreshold,
    /// Adaptive noise filter variant (int).
    AdaptiveNoiseFilterType,
    /// Global binning factor (int).
    GlobalBinning,
    /// Auto exposure reference value (float).
    AutoExposureRefValue,
    /// Enable adaptive noise filtering (bool).
    UseAdaptiveNoiseFilter,
    /// Enable flying pixel removal (bool).
    UseRemoveFlyingPixel,
    /// Enable stray light removal (bool).
    UseRemoveStrayLight,
    /// Enable image validation (bool).
    UseValidateImage,
    /// Any flag this harness has no name for.
    Other(u16),
}

impl fmt::Display for ProcessingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsistencyTolerance => write!(f, "consistency tolerance"),
            Self::FlyingPixelsF0 => write!(f, "flying pixels F0"),
            Self::NoiseThreshold => write!(f, "noise threshold"),
            Self::AdaptiveNoiseFilterType => write!(f, "adaptive noise filter type"),
            Self::GlobalBinning => write!(f, "global binning"),
            Self::AutoExposureRefValue => write!(f, "auto exposure reference value"),
            Self::UseAdaptiveNoiseFilter => write!(f, "adaptive noise filter"),
            Self::UseRemoveFlyingPixel => write!(f, "flying pixel removal"),
            Self::UseRemoveStrayLight => write!(f, "stray light removal"),
            Self::UseValidateImage => write!(f, "image validation"),
            Self::Other(id) => write!(f, "processing flag #{id}"),
        }
    }
}

/// Value of a processing parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variant {
    /// Boolean toggle.
    Bool(bool),
    /// Integer setting.
    Int(i32),
    /// Floating point setting.
    Float(f32),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Ordered processing parameter set as exchanged with the device.
pub type ProcessingParameters = Vec<(ProcessingFlag, Variant)>;

/// Depth metadata attached to a notification.
#[derive(Debug, Clone, Default)]
pub struct DepthMetadata {
    /// Stream the depth frame belongs to.
    pub stream_id: StreamId,
    /// Exposure times used for the frame, in microseconds.
    pub exposure_times: Vec<u32>,
}

/// Raw sensor metadata attached to a notification.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    /// Illumination unit temperature in degrees Celsius.
    pub illumination_temperature: f32,
}

/// One asynchronous data notification from a streaming camera.
#[derive(Debug, Clone, Default)]
pub struct ExtendedData {
    /// Present when the notification carries depth data.
    pub depth: Option<DepthMetadata>,
    /// Present when the notification carries raw data.
    pub raw: Option<RawMetadata>,
}

/// Status reported by a failing device operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The camera is not connected.
    #[error("camera not connected")]
    NotConnected,
    /// The operation needs a prior successful `initialize`.
    #[error("camera not initialized")]
    NotInitialized,
    /// The camera is busy, typically because capture is running.
    #[error("device is busy")]
    DeviceIsBusy,
    /// The current access level does not permit the operation.
    #[error("insufficient access level")]
    InsufficientPrivileges,
    /// An argument was rejected.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A numeric argument was outside the device's limits.
    #[error("value out of bounds")]
    OutOfBounds,
    /// The device does not implement the operation.
    #[error("not implemented")]
    NotImplemented,
    /// The camera could not be opened.
    #[error("could not open camera: {0}")]
    CouldNotOpen(String),
    /// Recording or file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// Any other vendor status.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Abstraction over a depth camera's control and streaming surface.
///
/// All calls are synchronous and block until the device answers.
pub trait DepthCamera {
    /// Bring the camera into an operational state.
    fn initialize(&mut self) -> Result<()>;

    /// List the use cases the camera offers.
    fn use_cases(&self) -> Result<Vec<String>>;

    /// Name of the active use case.
    fn current_use_case(&self) -> Result<String>;

    /// Switch to the named use case.
    fn set_use_case(&mut self, name: &str) -> Result<()>;

    /// Frame rate of the active use case.
    fn frame_rate(&self) -> Result<u16>;

    /// Streams of the active use case.
    fn streams(&self) -> Result<Vec<StreamId>>;

    /// Access level granted to this session.
    fn access_level(&self) -> Result<u8>;

    /// Write a single device register.
    fn write_register(&mut self, address: &str, value: u32) -> Result<()>;

    /// Register the listener that receives data while capturing.
    fn register_data_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<()>;

    /// Select which data the listener receives.
    fn set_callback_data(&mut self, data: CallbackData) -> Result<()>;

    /// Start capturing.
    fn start_capture(&mut self) -> Result<()>;

    /// Stop capturing.
    fn stop_capture(&mut self) -> Result<()>;

    /// Switch between manual and automatic exposure.
    fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<()>;

    /// Lowest and highest exposure time (microseconds) for a stream.
    fn exposure_limits(&self, stream: StreamId) -> Result<(u32, u32)>;

    /// Set the exposure time (microseconds) of a stream. Manual mode only.
    fn set_exposure_time(&mut self, exposure: u32, stream: StreamId) -> Result<()>;

    /// Read the lens calibration.
    fn lens_parameters(&self) -> Result<LensParameters>;

    /// Start recording the stream to `destination`.
    fn start_recording(&mut self, destination: &Path) -> Result<()>;

    /// Stop an active recording.
    fn stop_recording(&mut self) -> Result<()>;

    /// Read the processing parameters of a stream.
    fn processing_parameters(&self, stream: StreamId) -> Result<ProcessingParameters>;

    /// Replace the processing parameters of a stream.
    fn set_processing_parameters(
        &mut self,
        parameters: &ProcessingParameters,
        stream: StreamId,
    ) -> Result<()>;
}
