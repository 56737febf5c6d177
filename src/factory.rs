//! Camera construction.

use crate::settings::Settings;
use crate::traits::DepthCamera;

/// Create the camera the protocol runs against.
///
/// Returns `None` when no backend is available; the protocol then reports
/// [`crate::outcome::ErrorKind::DeviceNotCreated`] for the first stage.
#[cfg(feature = "simulator")]
pub fn create_camera(settings: &Settings) -> Option<Box<dyn DepthCamera>> {
    use crate::simulator::SimulatedCamera;

    // The simulator grants whatever level the supplied access code unlocks.
    let camera = SimulatedCamera::new().with_access_level(settings.expected_access_level());
    log::info!("using the simulated camera");
    Some(Box::new(camera))
}

/// Create the camera the protocol runs against.
///
/// Always `None`: this build links no camera backend.
#[cfg(not(feature = "simulator"))]
pub fn create_camera(_settings: &Settings) -> Option<Box<dyn DepthCamera>> {
    log::warn!("no camera backend compiled in");
    None
}
