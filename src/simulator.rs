//! In-process simulated depth camera.
//!
//! Behaves like a well-configured camera: it streams notifications from a
//! background thread at the active use case's frame rate, remembers
//! processing parameters and writes a small record file when recording.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::observer::DataListener;
use crate::traits::{
    CallbackData, DepthCamera, DepthMetadata, DeviceError, ExposureMode, ExtendedData,
    LensParameters, ProcessingFlag, ProcessingParameters, RawMetadata, Result, StreamId, Variant,
};

/// A use case the simulated camera offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedUseCase {
    /// Use case name.
    pub name: String,
    /// Frame rate the camera runs the use case at.
    pub fps: u16,
}

impl SimulatedUseCase {
    /// Create a use case entry.
    pub fn new<S: Into<String>>(name: S, fps: u16) -> Self {
        Self {
            name: name.into(),
            fps,
        }
    }
}

/// State shared with the capture thread.
#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    fps: AtomicU16,
    exposure: AtomicU32,
    recording: AtomicBool,
    delivered: AtomicU64,
    recorded: AtomicU64,
}

struct ActiveRecording {
    file: File,
    path: PathBuf,
}

/// Simulated camera implementing [`DepthCamera`].
pub struct SimulatedCamera {
    use_cases: Vec<SimulatedUseCase>,
    current: usize,
    initialized: bool,
    access_level: u8,
    stream: StreamId,
    exposure_mode: ExposureMode,
    exposure_limits: (u32, u32),
    temperature: f32,
    lens: LensParameters,
    processing: ProcessingParameters,
    registers: HashMap<String, u32>,
    callback_data: CallbackData,
    listener: Option<Arc<dyn DataListener>>,
    shared: Arc<Shared>,
    capture: Option<JoinHandle<()>>,
    recording: Option<ActiveRecording>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    /// Create a camera offering `MODE_9_5FPS`, `MODE_9_10FPS` and
    /// `MODE_5_45FPS`, granting access level 3.
    #[must_use]
    pub fn new() -> Self {
        let camera = Self {
            use_cases: vec![
                SimulatedUseCase::new("MODE_9_5FPS", 5),
                SimulatedUseCase::new("MODE_9_10FPS", 10),
                SimulatedUseCase::new("MODE_5_45FPS", 45),
            ],
            current: 0,
            initialized: false,
            access_level: 3,
            stream: StreamId(0xdefa),
            exposure_mode: ExposureMode::Automatic,
            exposure_limits: (100, 2000),
            temperature: 34.0,
            lens: LensParameters {
                principal_point: (111.6, 86.2),
                focal_length: (209.7, 209.7),
                distortion_radial: vec![0.39, -4.06, 8.61],
                distortion_tangential: (0.0, 0.0),
            },
            processing: vec![
                (ProcessingFlag::ConsistencyTolerance, Variant::Float(1.2)),
                (ProcessingFlag::FlyingPixelsF0, Variant::Float(0.018)),
                (ProcessingFlag::NoiseThreshold, Variant::Float(0.04)),
                (ProcessingFlag::AdaptiveNoiseFilterType, Variant::Int(1)),
                (ProcessingFlag::GlobalBinning, Variant::Int(0)),
                (ProcessingFlag::AutoExposureRefValue, Variant::Float(1000.0)),
                (ProcessingFlag::UseAdaptiveNoiseFilter, Variant::Bool(true)),
                (ProcessingFlag::UseRemoveFlyingPixel, Variant::Bool(true)),
                (ProcessingFlag::UseRemoveStrayLight, Variant::Bool(false)),
                (ProcessingFlag::UseValidateImage, Variant::Bool(true)),
            ],
            registers: HashMap::new(),
            callback_data: CallbackData::Depth,
            listener: None,
            shared: Arc::new(Shared::default()),
            capture: None,
            recording: None,
        };
        camera.publish_fps();
        camera
    }

    /// Replace the offered use cases. The first one becomes active.
    #[must_use]
    pub fn with_use_cases(mut self, use_cases: Vec<SimulatedUseCase>) -> Self {
        self.use_cases = use_cases;
        self.current = 0;
        self.publish_fps();
        self
    }

    /// Set the access level the camera grants.
    #[must_use]
    pub const fn with_access_level(mut self, level: u8) -> Self {
        self.access_level = level;
        self
    }

    /// Set the illumination temperature reported with raw data.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the lens calibration.
    #[must_use]
    pub fn with_lens(mut self, lens: LensParameters) -> Self {
        self.lens = lens;
        self
    }

    /// Replace the stored processing parameters.
    #[must_use]
    pub fn with_processing(mut self, processing: ProcessingParameters) -> Self {
        self.processing = processing;
        self
    }

    /// Notifications delivered since capture last started.
    pub fn delivered_frames(&self) -> u64 {
        self.shared.delivered.load(Ordering::SeqCst)
    }

    /// Value last written to `address`, if any.
    pub fn register(&self, address: &str) -> Option<u32> {
        self.registers.get(address).copied()
    }

    fn active_use_case(&self) -> Option<&SimulatedUseCase> {
        self.use_cases.get(self.current)
    }

    fn publish_fps(&self) {
        let fps = self.active_use_case().map_or(0, |uc| uc.fps);
        self.shared.fps.store(fps, Ordering::SeqCst);
    }

    const fn require_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(DeviceError::NotInitialized)
        }
    }

    fn require_stream(&self, stream: StreamId) -> Result<()> {
        // The default stream id addresses the first stream.
        if stream == self.stream || stream == StreamId::default() {
            Ok(())
        } else {
            Err(DeviceError::InvalidValue(format!("no stream {stream}")))
        }
    }

    fn notification_template(&self) -> ExtendedData {
        let depth = DepthMetadata {
            stream_id: self.stream,
            exposure_times: Vec::new(),
        };
        let raw = RawMetadata {
            illumination_temperature: self.temperature,
        };
        match self.callback_data {
            CallbackData::Raw => ExtendedData {
                depth: None,
                raw: Some(raw),
            },
            CallbackData::Depth => ExtendedData {
                depth: Some(depth),
                raw: None,
            },
            CallbackData::Intermediate => ExtendedData {
                depth: Some(depth),
                raw: Some(raw),
            },
        }
    }

    fn join_capture(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture.take() {
            if handle.join().is_err() {
                warn!("simulated capture thread panicked");
            }
        }
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        self.join_capture();
    }
}

/// Deliver notifications at the published frame rate until stopped.
fn capture_loop(
    shared: &Shared,
    listener: Option<&Arc<dyn DataListener>>,
    template: &ExtendedData,
) {
    let mut next = Instant::now();
    while !shared.stop.load(Ordering::SeqCst) {
        let fps = shared.fps.load(Ordering::SeqCst).max(1);
        next += Duration::from_secs(1) / u32::from(fps);

        // Sleep in short slices so a stop request is honoured promptly.
        while let Some(remaining) = next.checked_duration_since(Instant::now()) {
            if shared.stop.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(remaining.min(Duration::from_millis(20)));
        }

        let mut data = template.clone();
        if let Some(depth) = &mut data.depth {
            depth.exposure_times = vec![shared.exposure.load(Ordering::SeqCst)];
        }
        if let Some(listener) = listener {
            listener.on_new_data(&data);
        }
        shared.delivered.fetch_add(1, Ordering::SeqCst);
        if shared.recording.load(Ordering::SeqCst) {
            shared.recorded.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl DepthCamera for SimulatedCamera {
    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(DeviceError::DeviceIsBusy);
        }
        self.initialized = true;
        debug!("simulated camera initialized");
        Ok(())
    }

    fn use_cases(&self) -> Result<Vec<String>> {
        self.require_initialized()?;
        Ok(self.use_cases.iter().map(|uc| uc.name.clone()).collect())
    }

    fn current_use_case(&self) -> Result<String> {
        self.require_initialized()?;
        self.active_use_case()
            .map(|uc| uc.name.clone())
            .ok_or_else(|| DeviceError::Other("no use case configured".to_owned()))
    }

    fn set_use_case(&mut self, name: &str) -> Result<()> {
        self.require_initialized()?;
        let index = self
            .use_cases
            .iter()
            .position(|uc| uc.name == name)
            .ok_or_else(|| DeviceError::InvalidValue(format!("no use case {name}")))?;
        self.current = index;
        self.publish_fps();
        Ok(())
    }

    fn frame_rate(&self) -> Result<u16> {
        self.require_initialized()?;
        self.active_use_case()
            .map(|uc| uc.fps)
            .ok_or_else(|| DeviceError::Other("no use case configured".to_owned()))
    }

    fn streams(&self) -> Result<Vec<StreamId>> {
        self.require_initialized()?;
        Ok(vec![self.stream])
    }

    fn access_level(&self) -> Result<u8> {
        Ok(self.access_level)
    }

    fn write_register(&mut self, address: &str, value: u32) -> Result<()> {
        if self.access_level < 2 {
            return Err(DeviceError::InsufficientPrivileges);
        }
        self.registers.insert(address.to_owned(), value);
        Ok(())
    }

    fn register_data_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<()> {
        if self.capture.is_some() {
            return Err(DeviceError::DeviceIsBusy);
        }
        self.listener = Some(listener);
        Ok(())
    }

    fn set_callback_data(&mut self, data: CallbackData) -> Result<()> {
        if self.capture.is_some() {
            return Err(DeviceError::DeviceIsBusy);
        }
        self.callback_data = data;
        Ok(())
    }

    fn start_capture(&mut self) -> Result<()> {
        self.require_initialized()?;
        if self.capture.is_some() {
            return Err(DeviceError::DeviceIsBusy);
        }

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.delivered.store(0, Ordering::SeqCst);
        self.shared
            .exposure
            .store(self.exposure_limits.1, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let listener = self.listener.clone();
        let template = self.notification_template();
        let handle = std::thread::Builder::new()
            .name("tof-sim-capture".to_owned())
            .spawn(move || capture_loop(&shared, listener.as_ref(), &template))?;
        self.capture = Some(handle);
        debug!("simulated capture started");
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<()> {
        if self.capture.is_none() {
            return Err(DeviceError::InvalidValue("capture is stopped".to_owned()));
        }
        self.join_capture();
        debug!("simulated capture stopped");
        Ok(())
    }

    fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<()> {
        self.require_initialized()?;
        self.exposure_mode = mode;
        Ok(())
    }

    fn exposure_limits(&self, stream: StreamId) -> Result<(u32, u32)> {
        self.require_initialized()?;
        self.require_stream(stream)?;
        Ok(self.exposure_limits)
    }

    fn set_exposure_time(&mut self, exposure: u32, stream: StreamId) -> Result<()> {
        self.require_initialized()?;
        self.require_stream(stream)?;
        if self.exposure_mode != ExposureMode::Manual {
            return Err(DeviceError::InvalidValue(
                "exposure time needs manual exposure mode".to_owned(),
            ));
        }
        let (low, high) = self.exposure_limits;
        if !(low..=high).contains(&exposure) {
            return Err(DeviceError::OutOfBounds);
        }
        self.shared.exposure.store(exposure, Ordering::SeqCst);
        Ok(())
    }

    fn lens_parameters(&self) -> Result<LensParameters> {
        self.require_initialized()?;
        Ok(self.lens.clone())
    }

    fn start_recording(&mut self, destination: &Path) -> Result<()> {
        if self.recording.is_some() {
            return Err(DeviceError::DeviceIsBusy);
        }
        let mut file = File::create(destination)?;
        let use_case = self.active_use_case().map_or("", |uc| uc.name.as_str());
        writeln!(file, "use_case={use_case}")?;

        self.shared.recorded.store(0, Ordering::SeqCst);
        self.shared.recording.store(true, Ordering::SeqCst);
        self.recording = Some(ActiveRecording {
            file,
            path: destination.to_path_buf(),
        });
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        let mut recording = self
            .recording
            .take()
            .ok_or_else(|| DeviceError::InvalidValue("not recording".to_owned()))?;
        self.shared.recording.store(false, Ordering::SeqCst);
        let frames = self.shared.recorded.load(Ordering::SeqCst);
        writeln!(recording.file, "frames={frames}")?;
        debug!("recorded {frames} frames to {}", recording.path.display());
        Ok(())
    }

    fn processing_parameters(&self, stream: StreamId) -> Result<ProcessingParameters> {
        self.require_initialized()?;
        self.require_stream(stream)?;
        Ok(self.processing.clone())
    }

    fn set_processing_parameters(
        &mut self,
        parameters: &ProcessingParameters,
        stream: StreamId,
    ) -> Result<()> {
        self.require_initialized()?;
        self.require_stream(stream)?;
        if self.access_level < 2 {
            return Err(DeviceError::InsufficientPrivileges);
        }
        for (flag, value) in parameters {
            match self.processing.iter_mut().find(|(known, _)| known == flag) {
                Some((_, stored)) => *stored = *value,
                None => return Err(DeviceError::InvalidValue(format!("unsupported {flag}"))),
            }
        }
        Ok(())
    }
}
