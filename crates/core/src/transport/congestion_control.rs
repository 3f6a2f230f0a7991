//! Congestion control interface between the host transport and an algorithm.
//!
//! The host transport stack owns packet transmission, acknowledgment
//! processing, retransmission timers and loss recovery. An algorithm plugs
//! into it through a fixed set of named hooks ([`CongestionOps`]) and sees the
//! connection through a narrow read/write view ([`TcpSocket`]).
//!
//! ## Design
//!
//! The hooks receive `&mut dyn TcpSocket` so that a host can keep algorithms
//! behind `Box<dyn CongestionOps>` and pick one per connection at runtime.
//! All calls for a single connection are serialized by the host; nothing in
//! this interface is `Sync`.
//!
//! ## Usage
//!
//! ```ignore
//! use qvegas::transport::{CaState, CongestionOps, QVegasModule, QVegasTunables};
//!
//! let module = QVegasModule::with_default_budget(QVegasTunables::global())?;
//! let mut cc = module.connection();
//!
//! cc.init(&mut socket);
//! cc.pkts_acked(&mut socket, AckSample::from_micros(10_000));
//! cc.cong_avoid(&mut socket, ack, acked);
//! cc.set_state(&mut socket, CaState::Recovery);
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::qvegas::QVegasInfo;

// =============================================================================
// Sequence Numbers
// =============================================================================

/// 32-bit TCP sequence number with wrap-around comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SeqNumber(u32);

impl SeqNumber {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns `true` if `self` comes strictly after `other` in sequence space.
    ///
    /// Uses serial-number arithmetic, so the comparison stays correct when the
    /// sequence space wraps past `u32::MAX`.
    pub fn is_after(self, other: SeqNumber) -> bool {
        (other.0.wrapping_sub(self.0) as i32) < 0
    }

    /// Returns `true` if `self` comes strictly before `other`.
    pub fn is_before(self, other: SeqNumber) -> bool {
        other.is_after(self)
    }

    pub fn wrapping_add(self, bytes: u32) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl From<u32> for SeqNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SeqNumber> for u32 {
    fn from(value: SeqNumber) -> Self {
        value.0
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Congestion state of the connection as tracked by the host's loss recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CaState {
    /// Nothing suspicious; normal ACK processing.
    Open = 0,
    /// Duplicate ACKs or SACKs seen, no loss declared yet.
    Disorder = 1,
    /// Window reduced in response to an explicit congestion notification.
    Cwr = 2,
    /// Fast retransmit / fast recovery in progress.
    Recovery = 3,
    /// Retransmission timeout fired; recovering from loss.
    Loss = 4,
}

/// Window-related events raised by the host outside of ACK processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaEvent {
    /// First transmission after the connection had nothing in flight.
    TxStart,
    /// Window restart after an idle period.
    CwndRestart,
    /// End of a congestion window reduction.
    CompleteCwr,
    /// Loss timeout.
    Loss,
    /// In-sequence ACK.
    FastAck,
    /// Any other ACK.
    SlowAck,
}

impl CaEvent {
    /// Events after which any window feedback is computed from stale data.
    pub fn is_restart(self) -> bool {
        matches!(self, CaEvent::TxStart | CaEvent::CwndRestart)
    }
}

// =============================================================================
// RTT Samples
// =============================================================================

/// One RTT observation delivered with an acknowledgment.
///
/// A negative value means the ACK carried no usable sample (e.g. it covered
/// only retransmitted data, per Karn's algorithm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckSample {
    /// RTT in microseconds, negative if invalid.
    pub rtt_us: i64,
}

impl AckSample {
    pub const INVALID: Self = Self { rtt_us: -1 };

    pub fn from_micros(rtt_us: i64) -> Self {
        Self { rtt_us }
    }

    pub fn from_duration(rtt: Duration) -> Self {
        Self::from_micros(i64::try_from(rtt.as_micros()).unwrap_or(i64::MAX))
    }

    pub fn is_valid(&self) -> bool {
        self.rtt_us >= 0
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Algorithm-specific diagnostics exported through connection introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum CongestionInfo {
    QVegas(QVegasInfo),
}

// =============================================================================
// Host View
// =============================================================================

/// Per-connection transport state the host exposes to the algorithm.
///
/// Window and threshold are in packets. The growth functions at the bottom
/// are the host's standard (Reno) slow start and congestion avoidance; the
/// algorithm delegates to them but never implements them.
pub trait TcpSocket {
    /// Current congestion window (packets).
    fn snd_cwnd(&self) -> u32;

    fn set_snd_cwnd(&mut self, cwnd: u32);

    /// Slow start threshold (packets).
    fn snd_ssthresh(&self) -> u32;

    fn set_snd_ssthresh(&mut self, ssthresh: u32);

    /// Upper bound the window must never exceed.
    fn snd_cwnd_clamp(&self) -> u32;

    /// Next sequence number to be sent.
    fn snd_nxt(&self) -> SeqNumber;

    /// Packets currently marked lost.
    fn lost_out(&self) -> u32;

    /// Connection-default initial window (packets).
    fn initial_cwnd(&self) -> u32;

    fn in_slow_start(&self) -> bool {
        self.snd_cwnd() < self.snd_ssthresh()
    }

    /// Standard slow start for `acked` packets; returns the leftover packets
    /// that did not fit below ssthresh.
    fn slow_start(&mut self, acked: u32) -> u32;

    /// Standard slow start / additive increase for one ACK.
    fn reno_cong_avoid(&mut self, ack: SeqNumber, acked: u32);

    /// Standard multiplicative-decrease threshold used on loss.
    fn reno_ssthresh(&self) -> u32;

    /// Threshold as currently visible to the rest of the stack.
    fn current_ssthresh(&self) -> u32;
}

// =============================================================================
// Hooks
// =============================================================================

/// The hook table a congestion control algorithm implements.
///
/// Every hook is infallible: the contract is to always leave the socket with
/// a valid window and threshold.
pub trait CongestionOps {
    /// Short algorithm name used for selection and logging.
    fn name(&self) -> &'static str;

    /// Called when the connection becomes congestion-avoidance capable.
    fn init(&mut self, tp: &mut dyn TcpSocket);

    /// Threshold to use after a loss event.
    fn ssthresh(&mut self, tp: &mut dyn TcpSocket) -> u32;

    /// Called for every acknowledgment that advances the window.
    fn cong_avoid(&mut self, tp: &mut dyn TcpSocket, ack: SeqNumber, acked: u32);

    /// Called with the RTT sample of every acknowledgment.
    fn pkts_acked(&mut self, tp: &mut dyn TcpSocket, sample: AckSample);

    /// Called when the host changes congestion state.
    fn set_state(&mut self, tp: &mut dyn TcpSocket, state: CaState);

    /// Called on window-related events outside ACK processing.
    fn cwnd_event(&mut self, tp: &mut dyn TcpSocket, event: CaEvent);

    /// Window to restore once a loss turned out to be spurious.
    fn undo_cwnd(&mut self, tp: &mut dyn TcpSocket) -> u32;

    /// Diagnostics snapshot for connection introspection, `None` if the
    /// algorithm has nothing to report for the requested extension mask.
    fn get_info(&self, ext: u32) -> Option<CongestionInfo>;
}

impl fmt::Debug for dyn CongestionOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CongestionOps({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_after() {
        let a = SeqNumber::new(100);
        let b = SeqNumber::new(200);
        assert!(b.is_after(a));
        assert!(!a.is_after(b));
        assert!(!a.is_after(a));
        assert!(a.is_before(b));
    }

    #[test]
    fn test_seq_is_after_wraps() {
        let before_wrap = SeqNumber::new(u32::MAX - 10);
        let after_wrap = before_wrap.wrapping_add(20);
        assert_eq!(u32::from(after_wrap), 9);
        assert!(after_wrap.is_after(before_wrap));
        assert!(!before_wrap.is_after(after_wrap));
    }

    #[test]
    fn test_restart_events() {
        assert!(CaEvent::TxStart.is_restart());
        assert!(CaEvent::CwndRestart.is_restart());
        assert!(!CaEvent::CompleteCwr.is_restart());
        assert!(!CaEvent::Loss.is_restart());
        assert!(!CaEvent::FastAck.is_restart());
        assert!(!CaEvent::SlowAck.is_restart());
    }

    #[test]
    fn test_ack_sample_validity() {
        assert!(!AckSample::INVALID.is_valid());
        assert!(AckSample::from_micros(0).is_valid());
        assert_eq!(
            AckSample::from_duration(Duration::from_millis(10)).rtt_us,
            10_000
        );
    }
}
