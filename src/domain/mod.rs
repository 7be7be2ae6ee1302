// Domain layer: shared telemetry model, unit-tagged fields and ports (interfaces).

pub mod conversion;
pub mod fields;
pub mod model;
pub mod ports;
pub mod record;
