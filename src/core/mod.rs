pub mod agent;
pub mod fuel;
pub mod landing;
pub mod loadsheet;
pub mod payload;
pub mod tracker;

pub use crate::domain::ports::{ConfigProvider, SimulatorControl, Storage, TelemetrySource};
pub use crate::utils::error::Result;
pub use agent::{FlightLog, StopReason, TrackingAgent};
