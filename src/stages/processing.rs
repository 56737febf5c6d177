//! Processing parameter round-trip stage.

use log::{error, info, warn};

use super::{conclude, fail, Stage, StageResult, StageRunner};
use crate::outcome::{ErrorKind, StageOutcome};
use crate::session::CameraSession;
use crate::traits::{ProcessingFlag, ProcessingParameters, Variant};

/// Lowest access level allowed to write processing parameters.
const REQUIRED_ACCESS_LEVEL: u8 = 2;

/// Overwrite every flag that has a target, leaving the others alone.
///
/// Returns the flags that were overwritten, in parameter order.
fn apply_targets(
    parameters: &mut ProcessingParameters,
    targets: &[(ProcessingFlag, Variant)],
) -> Vec<(ProcessingFlag, Variant)> {
    let mut touched = Vec::new();
    for (flag, value) in parameters.iter_mut() {
        if let Some(&(_, target)) = targets.iter().find(|(candidate, _)| candidate == flag) {
            *value = target;
            touched.push((*flag, target));
        }
    }
    touched
}

/// Every touched flag whose read-back value differs from its target.
fn mismatches(
    read_back: &ProcessingParameters,
    touched: &[(ProcessingFlag, Variant)],
) -> Vec<String> {
    touched
        .iter()
        .filter_map(|&(flag, target)| {
            match read_back.iter().find(|(candidate, _)| *candidate == flag) {
                Some(&(_, actual)) if actual == target => None,
                Some(&(_, actual)) => Some(format!("{flag}: expected {target}, read {actual}")),
                None => Some(format!("{flag}: missing after write")),
            }
        })
        .collect()
}

impl StageRunner<'_> {
    /// Write the configured processing targets and verify they read back.
    ///
    /// Passes without touching the camera below access level 2.
    pub fn processing_parameters(&mut self, session: &mut CameraSession) -> StageOutcome {
        conclude(
            Stage::ProcessingParameters,
            self.check_processing_parameters(session),
        )
    }

    fn check_processing_parameters(&mut self, session: &CameraSession) -> StageResult {
        match session.access_level {
            Some(level) if level >= REQUIRED_ACCESS_LEVEL => {}
            level => {
                warn!(
                    "ignoring processing parameter tests: requires L{REQUIRED_ACCESS_LEVEL} access, have {level:?}"
                );
                return Ok(format!(
                    "skipped, requires access level {REQUIRED_ACCESS_LEVEL}"
                ));
            }
        }

        let stream = session.stream_id;
        let mut parameters = self.camera.processing_parameters(stream).map_err(|err| {
            fail(
                ErrorKind::ProcessingParameterError,
                format!("could not get processing parameters: {err}"),
            )
        })?;

        let touched = apply_targets(&mut parameters, &self.settings.processing_targets);
        info!(
            "writing {} of {} processing parameters",
            touched.len(),
            parameters.len()
        );
        self.camera
            .set_processing_parameters(&parameters, stream)
            .map_err(|err| {
                fail(
                    ErrorKind::ProcessingParameterError,
                    format!("could not set the processing parameters: {err}"),
                )
            })?;

        let read_back = self.camera.processing_parameters(stream).map_err(|err| {
            fail(
                ErrorKind::ProcessingParameterError,
                format!("could not get processing parameters: {err}"),
            )
        })?;

        let mismatched = mismatches(&read_back, &touched);
        for mismatch in &mismatched {
            error!("processing parameter mismatch: {mismatch}");
        }
        if !mismatched.is_empty() {
            return Err(fail(
                ErrorKind::ProcessingParameterError,
                format!(
                    "{} of {} processing parameters mismatched: {}",
                    mismatched.len(),
                    touched.len(),
                    mismatched.join("; ")
                ),
            ));
        }

        Ok(format!(
            "{} processing parameters round-tripped",
            touched.len()
        ))
    }
}
