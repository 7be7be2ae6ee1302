pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, AgentConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::msfs::MsfsSource;
pub use adapters::replay::ReplaySource;
pub use adapters::xplane::{XPlaneConnection, XPlaneEndpoint};
pub use app::ReportWriter;
pub use crate::core::agent::{FlightLog, TrackingAgent};
pub use utils::error::{AgentError, Result};
