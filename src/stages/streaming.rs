//! Receive data stage: measured streaming window.

use std::time::Duration;

use log::info;

use super::{conclude, fail, Stage, StageResult, StageRunner};
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;

/// Frames per second over a window.
#[allow(clippy::cast_precision_loss)]
pub fn measured_fps(frames: u64, seconds: u32) -> f32 {
    frames as f32 / seconds as f32
}

/// Whether `measured` lies within `expected ± tolerance`, bounds included.
pub fn fps_within(measured: f32, expected: u16, tolerance: f32) -> bool {
    let expected = f32::from(expected);
    measured >= expected - tolerance && measured <= expected + tolerance
}

impl StageRunner<'_> {
    /// Record for `seconds` and check temperature and frame rate.
    ///
    /// Capture must already be running (see [`Stage::Exposure`]); it is
    /// stopped once the temperatures check out.
    pub fn receive_data(&mut self, session: &mut CameraSession, seconds: u32) -> StageOutcome {
        conclude(
            Stage::ReceiveData,
            self.check_receive_data(session, seconds),
        )
    }

    fn check_receive_data(&mut self, session: &CameraSession, seconds: u32) -> StageResult {
        if seconds == 0 {
            return Err(fail(
                ErrorKind::ReceiveDataError,
                "streaming window must be positive",
            ));
        }

        self.sleeper.sleep(self.settings.timing.warm_up);
        if self.observer.frame_count() == 0 {
            return Err(fail(
                ErrorKind::ReceiveDataError,
                "not receiving new depth data",
            ));
        }

        let destination = self.settings.recording.destination(seconds);
        self.camera.start_recording(destination).map_err(|err| {
            fail(
                ErrorKind::ReceiveDataError,
                format!(
                    "could not start recording to {}: {err}",
                    destination.display()
                ),
            )
        })?;
        info!(
            "begin recording to {} for {seconds} seconds",
            destination.display()
        );

        self.observer.reset();
        self.sleeper.sleep(Duration::from_secs(u64::from(seconds)));

        self.camera.stop_recording().map_err(|err| {
            fail(
                ErrorKind::ReceiveDataError,
                format!("could not stop the recording: {err}"),
            )
        })?;
        let frames = self.observer.frame_count();
        let fps = measured_fps(frames, seconds);

        let temperatures = self.observer.temperature_samples();
        if let Some(bad) = temperatures.iter().find(|&&t| t.is_nan() || t <= 0.0) {
            return Err(fail(
                ErrorKind::ReceiveDataError,
                format!("temperature reading of {bad} <= 0"),
            ));
        }
        if let Some(last) = temperatures.last() {
            info!("temperature sensor working, reading is {last}");
        }

        self.camera.stop_capture().map_err(|err| {
            fail(
                ErrorKind::ReceiveDataError,
                format!("could not stop the camera capture: {err}"),
            )
        })?;

        let tolerance = self.settings.fps_tolerance;
        if !fps_within(fps, session.fps, tolerance) {
            return Err(fail(
                ErrorKind::ReceiveDataError,
                format!(
                    "FPS is outside of limits at {fps:.2} ({frames} frames in {seconds} seconds, expected {} ± {tolerance})",
                    session.fps
                ),
            ));
        }

        Ok(format!(
            "FPS is inside limits at {fps:.2} ({frames} frames in {seconds} seconds)"
        ))
    }
}
