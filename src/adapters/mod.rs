// Adapters layer: simulator-specific telemetry sources and their mapping tables.

pub mod mapping;
pub mod msfs;
pub mod replay;
pub mod xplane;
