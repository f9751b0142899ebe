//! OSC boundary: outbound telemetry and the inbound control server.

pub mod control;
pub mod telemetry;

pub use control::ControlServer;
pub use telemetry::TelemetrySender;
