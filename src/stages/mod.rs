//! Validation stages.
//!
//! Each stage drives one camera capability through [`StageRunner`] and
//! reports a [`StageOutcome`]. Stages share what they learn through the
//! [`CameraSession`] and observe streaming through the [`DataObserver`].

mod exposure;
mod processing;
mod setup;
mod streaming;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{error, info};

use crate::observer::DataObserver;
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;
use crate::settings::Settings;
use crate::timing::Sleeper;
use crate::traits::DepthCamera;

/// One step of the validation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Initialize the camera and apply the requested use case.
    Initialize,
    /// Select the stream later stages address.
    Stream,
    /// Verify the granted access level.
    AccessLevel,
    /// Switch to another use case and read it back.
    UseCaseSwitch,
    /// Register the observer, start capture, enable auto exposure.
    Exposure,
    /// Sweep manual exposure between the stream's limits.
    ManualExposure,
    /// Round-trip processing parameters.
    ProcessingParameters,
    /// Sanity-check the lens calibration.
    LensParameters,
    /// Stream for a fixed window and check frame rate and temperature.
    ReceiveData,
}

impl Stage {
    /// Every stage in protocol order.
    pub const ALL: [Self; 9] = [
        Self::Initialize,
        Self::Stream,
        Self::AccessLevel,
        Self::UseCaseSwitch,
        Self::Exposure,
        Self::ManualExposure,
        Self::ProcessingParameters,
        Self::LensParameters,
        Self::ReceiveData,
    ];

    /// Command line name of the stage.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Stream => "stream",
            Self::AccessLevel => "access-level",
            Self::UseCaseSwitch => "use-case-switch",
            Self::Exposure => "exposure",
            Self::ManualExposure => "manual-exposure",
            Self::ProcessingParameters => "processing-parameters",
            Self::LensParameters => "lens-parameters",
            Self::ReceiveData => "receive-data",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage name that matches no [`Stage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage `{0}`")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| UnknownStage(s.to_owned()))
    }
}

/// Why a stage failed.
#[derive(Debug)]
struct Failure {
    kind: ErrorKind,
    message: String,
}

fn fail<S: Into<String>>(kind: ErrorKind, message: S) -> Failure {
    Failure {
        kind,
        message: message.into(),
    }
}

/// Success message or failure of a stage body.
type StageResult = Result<String, Failure>;

fn conclude(stage: Stage, result: StageResult) -> StageOutcome {
    match result {
        Ok(message) => {
            info!("[SUCCESS] {stage}: {message}");
            StageOutcome::success(stage, message)
        }
        Err(failure) => {
            error!("[ERROR] {stage}: {}", failure.message);
            StageOutcome::failure(stage, failure.kind, failure.message)
        }
    }
}

/// Runs stages against one camera.
pub struct StageRunner<'a> {
    camera: &'a mut dyn DepthCamera,
    observer: &'a Arc<DataObserver>,
    settings: &'a Settings,
    sleeper: &'a dyn Sleeper,
}

impl<'a> StageRunner<'a> {
    /// Create a runner over borrowed protocol state.
    pub fn new(
        camera: &'a mut dyn DepthCamera,
        observer: &'a Arc<DataObserver>,
        settings: &'a Settings,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            camera,
            observer,
            settings,
            sleeper,
        }
    }

    /// Run `stage` with the parameters the settings provide.
    pub fn run(&mut self, stage: Stage, session: &mut CameraSession) -> StageOutcome {
        let settings = self.settings;
        match stage {
            Stage::Initialize => self.initialize(session, &settings.use_case),
            Stage::Stream => self.stream(session),
            Stage::AccessLevel => self.access_level(session, settings.expected_access_level()),
            Stage::UseCaseSwitch => self.use_case_switch(session),
            Stage::Exposure => self.exposure(session),
            Stage::ManualExposure => self.manual_exposure(session),
            Stage::ProcessingParameters => self.processing_parameters(session),
            Stage::LensParameters => self.lens_parameters(session),
            Stage::ReceiveData => self.receive_data(session, settings.stream_seconds),
        }
    }
}
