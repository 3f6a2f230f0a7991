//! QVegas diagnostics snapshot.
//!
//! The snapshot is defined for the host's connection-introspection protocol,
//! but the export hook is disabled: `CongestionOps::get_info` always returns
//! `None`. Callers must not depend on it. The snapshot is still useful for
//! local tooling that holds the controller directly.

use serde::Serialize;

use super::state::QVegasState;

/// Sampling state of a QVegas connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QVegasInfo {
    /// Whether delay-based decisions are active for the current RTT.
    pub enabled: bool,
    /// RTT samples collected in the current measurement window.
    pub rtt_count: u16,
    /// Base RTT (usec), `None` before the first sample after a reset.
    pub base_rtt: Option<u32>,
    /// Minimum RTT of the current measurement window (usec).
    pub min_rtt: Option<u32>,
}

impl From<&QVegasState> for QVegasInfo {
    fn from(state: &QVegasState) -> Self {
        Self {
            enabled: state.is_active(),
            rtt_count: state.sample_count(),
            base_rtt: state.min_rtt_ever(),
            min_rtt: state.min_rtt_this_window(),
        }
    }
}
