//! Setup stages: initialization, stream selection, access level, use cases.

use log::{info, warn};

use super::{conclude, fail, Stage, StageResult, StageRunner};
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;
use crate::settings::DiagnosticRegister;
use crate::use_case::expected_frame_rate;

impl StageRunner<'_> {
    /// Initialize the camera, apply `use_case` and verify its frame rate.
    pub fn initialize(&mut self, session: &mut CameraSession, use_case: &str) -> StageOutcome {
        conclude(Stage::Initialize, self.check_initialize(session, use_case))
    }

    fn check_initialize(&mut self, session: &mut CameraSession, use_case: &str) -> StageResult {
        self.camera.initialize().map_err(|err| {
            fail(
                ErrorKind::DeviceNotInitialized,
                format!("camera device could not be initialized: {err}"),
            )
        })?;

        let use_cases = self.camera.use_cases().map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not get use cases: {err}"),
            )
        })?;
        if use_cases.is_empty() {
            return Err(fail(ErrorKind::UseCaseError, "camera reports no use cases"));
        }

        if !use_cases.iter().any(|candidate| candidate == use_case) {
            return Err(fail(
                ErrorKind::UseCaseError,
                format!(
                    "use case {use_case} is not offered (available: {})",
                    use_cases.join(", ")
                ),
            ));
        }
        self.camera.set_use_case(use_case).map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not set use case {use_case}: {err}"),
            )
        })?;
        info!("setting use case: {use_case}");

        let fps = self.camera.frame_rate().map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not get camera frame rate: {err}"),
            )
        })?;
        use_case.clone_into(&mut session.use_case);
        session.fps = fps;

        let expected = expected_frame_rate(use_case)
            .map_err(|err| fail(ErrorKind::UseCaseError, err.to_string()))?;
        if expected != fps {
            return Err(fail(
                ErrorKind::UseCaseError,
                format!(
                    "camera frame rate {fps} not equal to use case rate {expected}"
                ),
            ));
        }

        Ok(format!("use case {use_case} running at {fps} fps"))
    }

    /// Record the first stream of the active use case.
    pub fn stream(&mut self, session: &mut CameraSession) -> StageOutcome {
        conclude(Stage::Stream, self.check_stream(session))
    }

    fn check_stream(&self, session: &mut CameraSession) -> StageResult {
        let streams = self.camera.streams().map_err(|err| {
            fail(
                ErrorKind::StreamError,
                format!("could not get the camera streams: {err}"),
            )
        })?;
        let Some(&first) = streams.first() else {
            return Err(fail(ErrorKind::StreamError, "no camera streams found"));
        };

        session.stream_id = first;
        Ok(format!("using stream {first} of {}", streams.len()))
    }

    /// Verify the camera grants `expected` access and try a diagnostic register write.
    pub fn access_level(&mut self, session: &mut CameraSession, expected: u8) -> StageOutcome {
        conclude(
            Stage::AccessLevel,
            self.check_access_level(session, expected),
        )
    }

    fn check_access_level(&mut self, session: &mut CameraSession, expected: u8) -> StageResult {
        let level = self.camera.access_level().map_err(|err| {
            fail(
                ErrorKind::AccessLevelError,
                format!("could not read the access level: {err}"),
            )
        })?;
        info!("camera reports access level {level}");
        session.access_level = Some(level);

        if level != expected {
            return Err(fail(
                ErrorKind::AccessLevelError,
                format!("access level mismatch: {level} != {expected}"),
            ));
        }

        // Informational only: the write outcome never decides the stage.
        let DiagnosticRegister { address, value } = &self.settings.diagnostic_register;
        match self.camera.write_register(address, *value) {
            Ok(()) => info!(
                "wrote {value:#x} to register {address} at access level {level}"
            ),
            Err(err) => warn!("could not write register {address}: {err}"),
        }

        Ok(format!("access level {level}"))
    }

    /// Switch to the first use case other than the active one.
    ///
    /// Only the use case name is recorded; the session keeps the frame rate
    /// set by initialization.
    pub fn use_case_switch(&mut self, session: &mut CameraSession) -> StageOutcome {
        conclude(Stage::UseCaseSwitch, self.check_use_case_switch(session))
    }

    fn check_use_case_switch(&mut self, session: &mut CameraSession) -> StageResult {
        let use_cases = self.camera.use_cases().map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not get use cases: {err}"),
            )
        })?;
        let current = self.camera.current_use_case().map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not get the current use case: {err}"),
            )
        })?;

        let Some(next) = use_cases.into_iter().find(|name| *name != current) else {
            warn!("no other use case than {current} to switch to");
            return Ok(format!("{current} is the only use case"));
        };

        info!("switching use case from {current} to {next}");
        self.camera.set_use_case(&next).map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not set use case {next}: {err}"),
            )
        })?;
        let applied = self.camera.current_use_case().map_err(|err| {
            fail(
                ErrorKind::UseCaseError,
                format!("could not get the current use case: {err}"),
            )
        })?;
        if applied != next {
            return Err(fail(
                ErrorKind::UseCaseError,
                format!(
                    "current use case {applied} does not match the set use case {next}"
                ),
            ));
        }

        session.use_case = applied;
        Ok(format!("switched to {next}"))
    }
}
