//! Protocol orchestration.
//!
//! A [`Protocol`] owns the camera, the observer and the session for one run
//! and walks a [`StagePlan`] in order. With `exit_on_error` it stops at the
//! first failing stage; otherwise it runs every enabled stage and reports
//! each outcome. Stages are never retried.

use std::sync::Arc;

use log::{error, info, warn};

use crate::observer::DataObserver;
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;
use crate::settings::Settings;
use crate::stages::{Stage, StageRunner};
use crate::timing::{Sleeper, ThreadSleeper};
use crate::traits::DepthCamera;

/// One entry of a [`StagePlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStage {
    /// Stage to run.
    pub stage: Stage,
    /// Whether the stage runs.
    pub enabled: bool,
}

/// Ordered stage selection for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    entries: Vec<PlannedStage>,
}

impl StagePlan {
    /// Every stage in protocol order, only the access level check enabled.
    pub fn reference() -> Self {
        Self::canonical(|stage| stage == Stage::AccessLevel)
    }

    /// Every stage in protocol order, all but manual exposure enabled.
    pub fn full() -> Self {
        Self::canonical(|stage| stage != Stage::ManualExposure)
    }

    /// Exactly `stages`, in the given order.
    pub fn from_stages(stages: &[Stage]) -> Self {
        Self {
            entries: stages
                .iter()
                .map(|&stage| PlannedStage {
                    stage,
                    enabled: true,
                })
                .collect(),
        }
    }

    fn canonical<F: Fn(Stage) -> bool>(enabled: F) -> Self {
        Self {
            entries: Stage::ALL
                .into_iter()
                .map(|stage| PlannedStage {
                    stage,
                    enabled: enabled(stage),
                })
                .collect(),
        }
    }

    /// Enable or disable every entry for `stage`.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage, enabled: bool) -> Self {
        for entry in self.entries.iter_mut().filter(|entry| entry.stage == stage) {
            entry.enabled = enabled;
        }
        self
    }

    /// All entries, enabled or not.
    pub fn entries(&self) -> &[PlannedStage] {
        &self.entries
    }

    /// Stages that will run, in order.
    pub fn enabled(&self) -> impl Iterator<Item = Stage> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.stage)
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::reference()
    }
}

/// Outcomes of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolReport {
    outcomes: Vec<StageOutcome>,
}

impl ProtocolReport {
    /// Every outcome produced.
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// The first failing outcome, if any.
    pub fn first_failure(&self) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|outcome| !outcome.is_success())
    }

    /// Whether every stage that ran passed.
    pub fn is_success(&self) -> bool {
        self.first_failure().is_none()
    }

    /// Overall verdict: the first failure's kind, or [`ErrorKind::None`].
    pub fn verdict(&self) -> ErrorKind {
        self.first_failure()
            .map_or(ErrorKind::None, StageOutcome::kind)
    }

    /// Process exit code for the run.
    pub fn exit_code(&self) -> u8 {
        self.verdict().code()
    }
}

/// State of one validation run.
pub struct Protocol {
    camera: Option<Box<dyn DepthCamera>>,
    observer: Arc<DataObserver>,
    session: CameraSession,
    settings: Settings,
    sleeper: Box<dyn Sleeper>,
}

impl Protocol {
    /// Create a run over `camera`; `None` means the camera could not be created.
    pub fn new(camera: Option<Box<dyn DepthCamera>>, settings: Settings) -> Self {
        Self {
            camera,
            observer: Arc::new(DataObserver::new()),
            session: CameraSession::new(),
            settings,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace how fixed-duration waits are performed.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Session state gathered so far.
    pub const fn session(&self) -> &CameraSession {
        &self.session
    }

    /// The observer registered with the camera.
    pub const fn observer(&self) -> &Arc<DataObserver> {
        &self.observer
    }

    /// Settings the run uses.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one stage.
    pub fn run_stage(&mut self, stage: Stage) -> StageOutcome {
        let Some(camera) = self.camera.as_deref_mut() else {
            let outcome = StageOutcome::failure(
                stage,
                ErrorKind::DeviceNotCreated,
                "camera device could not be created",
            );
            error!("[ERROR] {stage}: {}", outcome.message());
            return outcome;
        };

        info!("running stage {stage}");
        let mut runner =
            StageRunner::new(camera, &self.observer, &self.settings, &*self.sleeper);
        runner.run(stage, &mut self.session)
    }

    /// Run the enabled stages of `plan` in order.
    pub fn run(&mut self, plan: &StagePlan) -> ProtocolReport {
        let mut report = ProtocolReport::default();
        for stage in plan.enabled() {
            let outcome = self.run_stage(stage);
            let failed = !outcome.is_success();
            report.outcomes.push(outcome);

            if failed && self.settings.exit_on_error {
                warn!("halting after failed stage {stage}");
                break;
            }
        }

        if report.is_success() {
            info!("[SUCCESS] all {} stages passed", report.outcomes.len());
        }
        report
    }
}
