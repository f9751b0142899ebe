//! emgbridge - EMG acquisition to OSC bridge
//!
//! Bridges a Delsys-style EMG acquisition server (binary protocol over four
//! TCP channels) to an OSC/UDP consumer such as Max/MSP, and accepts inbound
//! OSC control messages that retune the server-side cyclic-event analyzers.
//!
//! ## Channel layout
//!
//! | Channel  | Direction | Carries |
//! |----------|-----------|---------|
//! | command  | out + in  | 8-byte commands and every 16-byte acknowledgment |
//! | response | out       | length-prefixed JSON configuration payloads |
//! | data     | in        | framed live sample stream |
//! | analyses | in        | framed analyzer result stream |

pub mod analyzer;
pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod osc;
pub mod protocol;
pub mod session;
pub mod streaming;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
