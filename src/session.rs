//! Shared session state.
//!
//! One explicit object owns everything the workers share: the
//! command/response socket pair, the tuning scalars, and the telemetry
//! sender. Each concern sits behind its own lock so stream forwarding,
//! control handling, and reconfiguration round trips serialize
//! independently of one another.

use crate::analyzer::AnalyzerDescriptor;
use crate::link::CommandLink;
use crate::osc::TelemetrySender;
use parking_lot::Mutex;

/// Mutable tuning state driven by inbound OSC control messages.
pub struct TuningState {
    /// 1-based sensor channels currently forwarded; replaced wholesale.
    pub selection: Vec<u32>,
    pub left: AnalyzerDescriptor,
    pub right: AnalyzerDescriptor,
}

/// Shared state handed to every worker.
pub struct Session {
    /// Command/response socket pair. One lock covers the pair so two
    /// reconfiguration sequences cannot interleave their round trips.
    pub link: Mutex<CommandLink>,
    /// Tuning scalars mutated by the control server.
    pub tuning: Mutex<TuningState>,
    /// Shared outbound OSC sender (internally locked).
    pub telemetry: TelemetrySender,
    /// Scale factor applied to raw sample values.
    pub data_multiplier: f64,
    /// Capacity of the data stream's emitted-timestamp window.
    pub dedup_capacity: usize,
}

impl Session {
    pub fn new(
        link: CommandLink,
        tuning: TuningState,
        telemetry: TelemetrySender,
        data_multiplier: f64,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            link: Mutex::new(link),
            tuning: Mutex::new(tuning),
            telemetry,
            data_multiplier,
            dedup_capacity,
        }
    }
}
