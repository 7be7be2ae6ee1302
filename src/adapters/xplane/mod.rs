pub mod client;
pub mod datarefs;
pub mod protocol;

pub use client::{XPlaneConnection, XPlaneEndpoint};
