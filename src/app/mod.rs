// Application layer: turns a finished flight into files on storage
// and writes planned loadouts back to the simulator.

pub mod loadout;
pub mod report;

pub use loadout::{apply_loadout, Loadout};
pub use report::ReportWriter;
