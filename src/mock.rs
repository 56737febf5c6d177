//! Mock camera implementation for testing without hardware.

use crate::observer::DataListener;
use crate::traits::{
    CallbackData, DepthCamera, DepthMetadata, DeviceError, ExposureMode, ExtendedData,
    LensParameters, ProcessingFlag, ProcessingParameters, RawMetadata, Result, StreamId, Variant,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Device operations, used to script failures and to inspect call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `DepthCamera::initialize`
    Initialize,
    /// `DepthCamera::use_cases`
    UseCases,
    /// `DepthCamera::current_use_case`
    CurrentUseCase,
    /// `DepthCamera::set_use_case`
    SetUseCase,
    /// `DepthCamera::frame_rate`
    FrameRate,
    /// `DepthCamera::streams`
    Streams,
    /// `DepthCamera::access_level`
    AccessLevel,
    /// `DepthCamera::write_register`
    WriteRegister,
    /// `DepthCamera::register_data_listener`
    RegisterDataListener,
    /// `DepthCamera::set_callback_data`
    SetCallbackData,
    /// `DepthCamera::start_capture`
    StartCapture,
    /// `DepthCamera::stop_capture`
    StopCapture,
    /// `DepthCamera::set_exposure_mode`
    SetExposureMode,
    /// `DepthCamera::exposure_limits`
    ExposureLimits,
    /// `DepthCamera::set_exposure_time`
    SetExposureTime,
    /// `DepthCamera::lens_parameters`
    LensParameters,
    /// `DepthCamera::start_recording`
    StartRecording,
    /// `DepthCamera::stop_recording`
    StopRecording,
    /// `DepthCamera::processing_parameters`
    ProcessingParameters,
    /// `DepthCamera::set_processing_parameters`
    SetProcessingParameters,
}

/// Scripted camera for unit tests.
pub struct MockCamera {
    use_cases: Vec<String>,
    current_use_case: String,
    sticky_use_case: bool,
    frame_rate: u16,
    streams: Vec<StreamId>,
    access_level: u8,
    lens: LensParameters,
    processing: ProcessingParameters,
    read_overrides: Vec<(ProcessingFlag, Variant)>,
    exposure_limits: (u32, u32),
    capture_frames: usize,
    temperature: f32,
    failures: HashMap<Op, DeviceError>,
    nth_failures: HashMap<Op, (usize, DeviceError)>,
    listener: Option<Arc<dyn DataListener>>,
    calls: RefCell<Vec<Op>>,
    /// Register writes in call order.
    pub registers: Vec<(String, u32)>,
    /// Exposure modes in call order.
    pub exposure_modes: Vec<ExposureMode>,
    /// Exposure times in call order.
    pub exposure_times: Vec<u32>,
    /// Last callback data selection.
    pub callback_data: Option<CallbackData>,
    /// Last recording destination.
    pub recording: Option<PathBuf>,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCamera {
    /// Create a mock camera in `MODE_9_5FPS` at access level 3.
    #[must_use]
    pub fn new() -> Self {
        Self {
            use_cases: vec![
                "MODE_9_5FPS".to_owned(),
                "MODE_9_10FPS".to_owned(),
                "MODE_5_45FPS".to_owned(),
            ],
            current_use_case: "MODE_9_5FPS".to_owned(),
            sticky_use_case: false,
            frame_rate: 5,
            streams: vec![StreamId(0xdefa)],
            access_level: 3,
            lens: LensParameters {
                principal_point: (112.3, 86.1),
                focal_length: (210.5, 210.4),
                distortion_radial: vec![0.41, -4.2, 8.7],
                distortion_tangential: (0.0, 0.0),
            },
            processing: vec![
                (ProcessingFlag::ConsistencyTolerance, Variant::Float(1.2)),
                (ProcessingFlag::UseRemoveFlyingPixel, Variant::Bool(true)),
                (ProcessingFlag::UseRemoveStrayLight, Variant::Bool(false)),
                (ProcessingFlag::AdaptiveNoiseFilterType, Variant::Int(1)),
                (ProcessingFlag::NoiseThreshold, Variant::Float(0.04)),
                (ProcessingFlag::GlobalBinning, Variant::Int(0)),
                (ProcessingFlag::AutoExposureRefValue, Variant::Float(1000.0)),
                (ProcessingFlag::UseValidateImage, Variant::Bool(true)),
            ],
            read_overrides: Vec::new(),
            exposure_limits: (100, 2000),
            capture_frames: 1,
            temperature: 34.5,
            failures: HashMap::new(),
            nth_failures: HashMap::new(),
            listener: None,
            calls: RefCell::new(Vec::new()),
            registers: Vec::new(),
            exposure_modes: Vec::new(),
            exposure_times: Vec::new(),
            callback_data: None,
            recording: None,
        }
    }

    /// Make `op` fail with `error`.
    #[must_use]
    pub fn with_failure(mut self, op: Op, error: DeviceError) -> Self {
        self.failures.insert(op, error);
        self
    }

    /// Make only the `nth` call (1-based) of `op` fail with `error`.
    #[must_use]
    pub fn with_failure_on_call(mut self, op: Op, nth: usize, error: DeviceError) -> Self {
        self.nth_failures.insert(op, (nth, error));
        self
    }

    /// Set the listed use cases and the active one.
    #[must_use]
    pub fn with_use_cases(mut self, use_cases: &[&str], current: &str) -> Self {
        self.use_cases = use_cases.iter().map(|&name| name.to_owned()).collect();
        current.clone_into(&mut self.current_use_case);
        self
    }

    /// Accept use case switches without actually changing mode.
    #[must_use]
    pub const fn with_sticky_use_case(mut self) -> Self {
        self.sticky_use_case = true;
        self
    }

    /// Set the reported frame rate.
    #[must_use]
    pub const fn with_frame_rate(mut self, fps: u16) -> Self {
        self.frame_rate = fps;
        self
    }

    /// Set the listed streams.
    #[must_use]
    pub fn with_streams(mut self, streams: Vec<StreamId>) -> Self {
        self.streams = streams;
        self
    }

    /// Set the reported access level.
    #[must_use]
    pub const fn with_access_level(mut self, level: u8) -> Self {
        self.access_level = level;
        self
    }

    /// Set the lens calibration.
    #[must_use]
    pub fn with_lens(mut self, lens: LensParameters) -> Self {
        self.lens = lens;
        self
    }

    /// Set the stored processing parameters.
    #[must_use]
    pub fn with_processing(mut self, processing: ProcessingParameters) -> Self {
        self.processing = processing;
        self
    }

    /// Report `value` for `flag` on every read, whatever was written.
    #[must_use]
    pub fn with_read_override(mut self, flag: ProcessingFlag, value: Variant) -> Self {
        self.read_overrides.push((flag, value));
        self
    }

    /// Number of notifications delivered when capture starts.
    #[must_use]
    pub const fn with_capture_frames(mut self, frames: usize) -> Self {
        self.capture_frames = frames;
        self
    }

    /// Active use case, without recording a call.
    pub fn current_use_case_name(&self) -> &str {
        &self.current_use_case
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<Op> {
        self.calls.borrow().clone()
    }

    /// Whether `op` was called.
    pub fn called(&self, op: Op) -> bool {
        self.calls.borrow().contains(&op)
    }

    fn call(&self, op: Op) -> Result<()> {
        let mut calls = self.calls.borrow_mut();
        calls.push(op);
        let count = calls.iter().filter(|&&called| called == op).count();
        match self.nth_failures.get(&op) {
            Some((nth, err)) if *nth == count => Err(err.clone()),
            _ => self.failures.get(&op).cloned().map_or(Ok(()), Err),
        }
    }

    fn notification(&self) -> ExtendedData {
        ExtendedData {
            depth: Some(DepthMetadata {
                stream_id: self.streams.first().copied().unwrap_or_default(),
                exposure_times: vec![self.exposure_limits.1],
            }),
            raw: Some(RawMetadata {
                illumination_temperature: self.temperature,
            }),
        }
    }
}

impl DepthCamera for MockCamera {
    fn initialize(&mut self) -> Result<()> {
        self.call(Op::Initialize)
    }

    fn use_cases(&self) -> Result<Vec<String>> {
        self.call(Op::UseCases)?;
        Ok(self.use_cases.clone())
    }

    fn current_use_case(&self) -> Result<String> {
        self.call(Op::CurrentUseCase)?;
        Ok(self.current_use_case.clone())
    }

    fn set_use_case(&mut self, name: &str) -> Result<()> {
        self.call(Op::SetUseCase)?;
        if !self.use_cases.iter().any(|uc| uc == name) {
            return Err(DeviceError::InvalidValue(name.to_owned()));
        }
        if !self.sticky_use_case {
            name.clone_into(&mut self.current_use_case);
        }
        Ok(())
    }

    fn frame_rate(&self) -> Result<u16> {
        self.call(Op::FrameRate)?;
        Ok(self.frame_rate)
    }

    fn streams(&self) -> Result<Vec<StreamId>> {
        self.call(Op::Streams)?;
        Ok(self.streams.clone())
    }

    fn access_level(&self) -> Result<u8> {
        self.call(Op::AccessLevel)?;
        Ok(self.access_level)
    }

    fn write_register(&mut self, address: &str, value: u32) -> Result<()> {
        self.call(Op::WriteRegister)?;
        self.registers.push((address.to_owned(), value));
        Ok(())
    }

    fn register_data_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<()> {
        self.call(Op::RegisterDataListener)?;
        self.listener = Some(listener);
        Ok(())
    }

    fn set_callback_data(&mut self, data: CallbackData) -> Result<()> {
        self.call(Op::SetCallbackData)?;
        self.callback_data = Some(data);
        Ok(())
    }

    fn start_capture(&mut self) -> Result<()> {
        self.call(Op::StartCapture)?;
        if let Some(listener) = &self.listener {
            let data = self.notification();
            for _ in 0..self.capture_frames {
                listener.on_new_data(&data);
            }
        }
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<()> {
        self.call(Op::StopCapture)
    }

    fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<()> {
        self.call(Op::SetExposureMode)?;
        self.exposure_modes.push(mode);
        Ok(())
    }

    fn exposure_limits(&self, _stream: StreamId) -> Result<(u32, u32)> {
        self.call(Op::ExposureLimits)?;
        Ok(self.exposure_limits)
    }

    fn set_exposure_time(&mut self, exposure: u32, _stream: StreamId) -> Result<()> {
        self.call(Op::SetExposureTime)?;
        self.exposure_times.push(exposure);
        Ok(())
    }

    fn lens_parameters(&self) -> Result<LensParameters> {
        self.call(Op::LensParameters)?;
        Ok(self.lens.clone())
    }

    fn start_recording(&mut self, destination: &Path) -> Result<()> {
        self.call(Op::StartRecording)?;
        self.recording = Some(destination.to_path_buf());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.call(Op::StopRecording)
    }

    fn processing_parameters(&self, _stream: StreamId) -> Result<ProcessingParameters> {
        self.call(Op::ProcessingParameters)?;
        let mut parameters = self.processing.clone();
        for (flag, value) in &mut parameters {
            if let Some((_, forced)) = self.read_overrides.iter().find(|(f, _)| f == flag) {
                *value = *forced;
            }
        }
        Ok(parameters)
    }

    fn set_processing_parameters(
        &mut self,
        parameters: &ProcessingParameters,
        _stream: StreamId,
    ) -> Result<()> {
        self.call(Op::SetProcessingParameters)?;
        self.processing.clone_from(parameters);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::DataObserver;

    #[test]
    fn test_mock_camera_defaults() {
        let camera = MockCamera::new();
        assert_eq!(
            camera.current_use_case().expect("current use case"),
            "MODE_9_5FPS"
        );
        assert_eq!(camera.frame_rate().expect("frame rate"), 5);
        assert_eq!(camera.access_level().expect("access level"), 3);
        assert_eq!(
            camera.calls(),
            vec![Op::CurrentUseCase, Op::FrameRate, Op::AccessLevel]
        );
    }

    #[test]
    fn test_scripted_failure() {
        let mut camera = MockCamera::new().with_failure(Op::Initialize, DeviceError::NotConnected);
        assert_eq!(camera.initialize(), Err(DeviceError::NotConnected));
        assert!(camera.called(Op::Initialize));
    }

    #[test]
    fn test_capture_delivers_to_listener() {
        let observer = Arc::new(DataObserver::new());
        let mut camera = MockCamera::new().with_capture_frames(3);
        camera
            .register_data_listener(Arc::clone(&observer) as Arc<dyn DataListener>)
            .expect("register listener");
        camera.start_capture().expect("start capture");

        assert_eq!(observer.frame_count(), 3);
        assert_eq!(observer.temperature_samples(), vec![34.5; 3]);
    }

    #[test]
    fn test_read_override_survives_writes() {
        let mut camera = MockCamera::new()
            .with_read_override(ProcessingFlag::GlobalBinning, Variant::Int(4));
        let params = vec![(ProcessingFlag::GlobalBinning, Variant::Int(1))];
        camera
            .set_processing_parameters(&params, StreamId(0))
            .expect("write parameters");

        let read = camera
            .processing_parameters(StreamId(0))
            .expect("read parameters");
        assert_eq!(read, vec![(ProcessingFlag::GlobalBinning, Variant::Int(4))]);
    }

    #[test]
    fn test_failure_on_nth_call_only() {
        let camera = MockCamera::new().with_failure_on_call(
            Op::ProcessingParameters,
            2,
            DeviceError::NotConnected,
        );

        assert!(camera.processing_parameters(StreamId(0)).is_ok());
        assert_eq!(
            camera.processing_parameters(StreamId(0)),
            Err(DeviceError::NotConnected)
        );
        assert!(camera.processing_parameters(StreamId(0)).is_ok());
    }

    #[test]
    fn test_with_processing_replaces_parameters() {
        let processing = vec![(ProcessingFlag::Other(42), Variant::Bool(true))];
        let camera = MockCamera::new().with_processing(processing.clone());

        assert_eq!(camera.processing_parameters(StreamId(0)), Ok(processing));
    }
}
