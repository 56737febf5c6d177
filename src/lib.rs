//! `tof-acceptance`: a hardware-in-the-loop acceptance protocol for time-of-flight
//! depth cameras.
//!
//! The protocol drives a camera through a fixed sequence of stages
//! (initialization, stream selection, access level, use case switching,
//! exposure, processing parameters, lens calibration and a measured
//! streaming window) and reports a pass/fail verdict per stage. Devices sit
//! behind the [`DepthCamera`] trait so the protocol runs against real
//! hardware, the in-process simulator or test doubles alike.

pub mod factory;
pub mod observer;
pub mod outcome;
pub mod protocol;
pub mod session;
pub mod settings;
#[cfg(feature = "simulator")]
pub mod simulator;
pub mod stages;
pub mod timing;
pub mod traits;
pub mod use_case;

#[cfg(test)]
pub mod mock;

pub use observer::{DataListener, DataObserver};
pub use outcome::{ErrorKind, StageOutcome};
pub use protocol::{Protocol, ProtocolReport, StagePlan};
pub use session::CameraSession;
pub use settings::Settings;
#[cfg(feature = "simulator")]
pub use simulator::SimulatedCamera;
pub use stages::Stage;
pub use traits::{DepthCamera, DeviceError, StreamId};
