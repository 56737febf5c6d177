//! Capture and optics stages: exposure control and lens calibration.

use std::sync::Arc;

use log::info;

use super::{conclude, fail, Failure, Stage, StageResult, StageRunner};
use crate::observer::DataObserver;
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;
use crate::traits::{CallbackData, ExposureMode};

impl StageRunner<'_> {
    /// Register the observer, start capturing and enable automatic exposure.
    pub fn exposure(&mut self, _session: &mut CameraSession) -> StageOutcome {
        conclude(Stage::Exposure, self.check_exposure())
    }

    fn check_exposure(&mut self) -> StageResult {
        let observer: Arc<DataObserver> = Arc::clone(self.observer);
        self.camera.register_data_listener(observer).map_err(|err| {
            fail(
                ErrorKind::ExposureModeError,
                format!("could not register the data listener: {err}"),
            )
        })?;
        self.camera
            .set_callback_data(CallbackData::Intermediate)
            .map_err(|err| {
                fail(
                    ErrorKind::ExposureModeError,
                    format!("could not set the callback data: {err}"),
                )
            })?;
        self.camera.start_capture().map_err(|err| {
            fail(
                ErrorKind::ExposureModeError,
                format!("could not start capturing: {err}"),
            )
        })?;
        info!("capture started");
        self.sleeper.sleep(self.settings.timing.settle);

        // The mode change gets its own settle window.
        self.sleeper.sleep(self.settings.timing.settle);
        self.set_exposure_mode(ExposureMode::Automatic)?;

        Ok("capture running with automatic exposure".to_owned())
    }

    /// Sweep the exposure time of the session stream between its limits.
    ///
    /// Expects capture to be running, so it belongs after [`Stage::Exposure`].
    /// Exposure is back on automatic when the stage passes.
    pub fn manual_exposure(&mut self, session: &mut CameraSession) -> StageOutcome {
        conclude(Stage::ManualExposure, self.check_manual_exposure(session))
    }

    fn check_manual_exposure(&mut self, session: &CameraSession) -> StageResult {
        let settle = self.settings.timing.settle;
        let stream = session.stream_id;

        self.set_exposure_mode(ExposureMode::Manual)?;
        self.sleeper.sleep(settle);

        let (low, high) = self.camera.exposure_limits(stream).map_err(|err| {
            fail(
                ErrorKind::ExposureModeError,
                format!("could not get exposure limits: {err}"),
            )
        })?;
        info!("stream {stream} exposure limits: {low}..={high} us");

        for exposure in [low, high] {
            self.camera.set_exposure_time(exposure, stream).map_err(|err| {
                fail(
                    ErrorKind::ExposureModeError,
                    format!("could not set the exposure to {exposure}: {err}"),
                )
            })?;
            self.sleeper.sleep(settle);
        }

        self.set_exposure_mode(ExposureMode::Automatic)?;
        Ok(format!("exposure swept from {low} to {high} us"))
    }

    fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<(), Failure> {
        self.camera.set_exposure_mode(mode).map_err(|err| {
            fail(
                ErrorKind::ExposureModeError,
                format!("could not set the exposure mode to {mode:?}: {err}"),
            )
        })
    }

    /// Check that the lens calibration is physically plausible.
    pub fn lens_parameters(&mut self, _session: &mut CameraSession) -> StageOutcome {
        conclude(Stage::LensParameters, self.check_lens_parameters())
    }

    fn check_lens_parameters(&self) -> StageResult {
        let lens = self.camera.lens_parameters().map_err(|err| {
            fail(
                ErrorKind::LensParameterError,
                format!("could not read lens parameters: {err}"),
            )
        })?;

        let (cx, cy) = lens.principal_point;
        let (fx, fy) = lens.focal_length;
        let checks = [
            ("principal point x", cx),
            ("principal point y", cy),
            ("focal length x", fx),
            ("focal length y", fy),
        ];
        if let Some((name, value)) = checks
            .iter()
            .find(|(_, value)| value.is_nan() || *value <= 0.0)
        {
            return Err(fail(
                ErrorKind::LensParameterError,
                format!("{name} is invalid: {value}"),
            ));
        }

        Ok(format!(
            "principal point ({cx}, {cy}), focal length ({fx}, {fy})"
        ))
    }
}
