//! Per-connection QVegas state.
//!
//! The record lives in the host's fixed-size per-connection private area, so
//! it is a plain `#[repr(C)]` value: zero-initialised by the host, copied
//! freely, never shared between connections.

use std::mem::size_of;

use crate::transport::congestion_control::SeqNumber;
use crate::transport::errors::CongestionControlError;

use super::config::{CA_PRIV_SIZE, MIN_CWND, MIN_SAMPLES_PER_RTT, RTT_UNSET};

// The record must fit the default host budget; a mismatch stops the build.
const _: () = assert!(size_of::<QVegasState>() <= CA_PRIV_SIZE);

/// QVegas per-connection variables.
///
/// A zeroed record (`QVegasState::default()`) means the connection has never
/// been reset: `min_rtt_ever` is `0`, which no sample can ever produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct QVegasState {
    /// Right edge of the send window when the current RTT started.
    pub(crate) window_at_rtt_start: SeqNumber,
    /// Window saved at the end of the last cycle; restored after a spurious
    /// loss and at the start of each RTT decision.
    pub(crate) saved_window_on_loss: u32,
    /// Window growth attributed to the fallback algorithm.
    pub(crate) fallback_increment: u32,
    /// True while delay-based decisions are made for the current RTT.
    pub(crate) active: bool,
    /// RTT samples observed within the current measurement window.
    pub(crate) sample_count: u16,
    /// Minimum RTT within the current measurement window (usec).
    pub(crate) min_rtt_this_window: u32,
    /// Minimum RTT ever observed, i.e. the propagation delay (usec).
    pub(crate) min_rtt_ever: u32,
}

impl QVegasState {
    /// Checks the record against the host's private storage allocation.
    pub fn check_private_storage(budget: usize) -> Result<(), CongestionControlError> {
        let size = size_of::<Self>();
        if size > budget {
            return Err(CongestionControlError::PrivateStateTooLarge { size, budget });
        }
        Ok(())
    }

    /// Start sampling a fresh measurement window beginning at `snd_nxt`.
    pub(crate) fn enable(&mut self, snd_nxt: SeqNumber) {
        self.active = true;
        self.window_at_rtt_start = snd_nxt;
        self.sample_count = 0;
        self.fallback_increment = 0;
        self.min_rtt_this_window = RTT_UNSET;
    }

    /// Stop making delay-based decisions until re-enabled.
    pub(crate) fn disable(&mut self) {
        self.active = false;
    }

    /// Forget everything measured so far and open a fresh window.
    pub(crate) fn reset(&mut self, snd_nxt: SeqNumber, initial_cwnd: u32) {
        if self.min_rtt_ever == 0 {
            self.saved_window_on_loss = initial_cwnd.max(MIN_CWND);
        }
        self.min_rtt_ever = RTT_UNSET;
        self.enable(snd_nxt);
    }

    /// Fold one RTT sample (usec, negative if invalid) into both minima.
    pub(crate) fn sample(&mut self, rtt_us: i64) {
        if rtt_us < 0 {
            return;
        }
        // Never allow a zero RTT: min_rtt_ever is used as a divisor
        let vrtt = u32::try_from(rtt_us).unwrap_or(u32::MAX).saturating_add(1);

        self.min_rtt_ever = self.min_rtt_ever.min(vrtt);
        self.min_rtt_this_window = self.min_rtt_this_window.min(vrtt);
        self.sample_count = self.sample_count.saturating_add(1);
    }

    /// Whether enough samples arrived this RTT to rule out delayed-ACK noise.
    pub(crate) fn has_enough_samples(&self) -> bool {
        self.sample_count >= MIN_SAMPLES_PER_RTT
    }

    /// Wipe the measurement window and remember `cwnd` for the next cycle.
    pub(crate) fn clear_window(&mut self, cwnd: u32) {
        self.sample_count = 0;
        self.min_rtt_this_window = RTT_UNSET;
        self.saved_window_on_loss = cwnd;
    }

    /// Add the window delta produced by one fallback growth step.
    pub(crate) fn track_fallback(&mut self, cwnd_before: u32, cwnd_after: u32) {
        self.fallback_increment = self
            .fallback_increment
            .wrapping_add(cwnd_after.wrapping_sub(cwnd_before));
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sample_count(&self) -> u16 {
        self.sample_count
    }

    pub fn window_at_rtt_start(&self) -> SeqNumber {
        self.window_at_rtt_start
    }

    pub fn saved_window_on_loss(&self) -> u32 {
        self.saved_window_on_loss
    }

    pub fn fallback_increment(&self) -> u32 {
        self.fallback_increment
    }

    /// Minimum RTT of the current window, `None` until a sample arrives.
    pub fn min_rtt_this_window(&self) -> Option<u32> {
        Some(self.min_rtt_this_window).filter(|&rtt| rtt != RTT_UNSET && rtt != 0)
    }

    /// Base RTT, `None` until a sample arrives after the last reset.
    pub fn min_rtt_ever(&self) -> Option<u32> {
        Some(self.min_rtt_ever).filter(|&rtt| rtt != RTT_UNSET && rtt != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> QVegasState {
        let mut state = QVegasState::default();
        state.reset(SeqNumber::new(1000), 10);
        state
    }

    #[test]
    fn test_fits_default_budget() {
        assert!(QVegasState::check_private_storage(CA_PRIV_SIZE).is_ok());
    }

    #[test]
    fn test_too_small_budget_fails() {
        let err = QVegasState::check_private_storage(8).unwrap_err();
        assert!(matches!(
            err,
            CongestionControlError::PrivateStateTooLarge { budget: 8, .. }
        ));
    }

    #[test]
    fn test_first_reset_seeds_saved_window() {
        let state = fresh();
        assert_eq!(state.saved_window_on_loss, 10);
        assert!(state.active);
        assert_eq!(state.sample_count, 0);
        assert_eq!(state.fallback_increment, 0);
        assert_eq!(state.window_at_rtt_start, SeqNumber::new(1000));
        assert_eq!(state.min_rtt_ever(), None);
        assert_eq!(state.min_rtt_this_window(), None);
    }

    #[test]
    fn test_later_reset_keeps_saved_window() {
        let mut state = fresh();
        state.sample(5_000);
        state.clear_window(37);

        state.reset(SeqNumber::new(2000), 10);

        assert_eq!(state.saved_window_on_loss, 37);
        assert_eq!(state.min_rtt_ever(), None);
        assert_eq!(state.window_at_rtt_start, SeqNumber::new(2000));
    }

    #[test]
    fn test_sample_updates_both_minima() {
        let mut state = fresh();
        state.sample(10_000);
        state.sample(12_000);
        state.sample(9_000);

        assert_eq!(state.min_rtt_ever(), Some(9_001));
        assert_eq!(state.min_rtt_this_window(), Some(9_001));
        assert_eq!(state.sample_count, 3);
        assert!(state.has_enough_samples());
    }

    #[test]
    fn test_invalid_sample_ignored() {
        let mut state = fresh();
        let before = state;
        state.sample(-1);
        assert_eq!(state, before);
    }

    #[test]
    fn test_zero_rtt_becomes_one() {
        let mut state = fresh();
        state.sample(0);
        assert_eq!(state.min_rtt_ever(), Some(1));
        assert_eq!(state.min_rtt_this_window(), Some(1));
    }

    #[test]
    fn test_huge_rtt_saturates() {
        let mut state = fresh();
        state.sample(i64::MAX);
        assert_eq!(state.min_rtt_ever, RTT_UNSET);
        assert_eq!(state.sample_count, 1);
    }

    #[test]
    fn test_base_rtt_survives_window_clear() {
        let mut state = fresh();
        state.sample(8_000);
        state.clear_window(20);
        state.sample(11_000);

        assert_eq!(state.min_rtt_ever(), Some(8_001));
        assert_eq!(state.min_rtt_this_window(), Some(11_001));
        assert_eq!(state.sample_count, 1);
        assert!(state.min_rtt_ever <= state.min_rtt_this_window);
    }

    #[test]
    fn test_disable_then_enable_matches_enable() {
        let mut once = fresh();
        once.sample(10_000);
        once.sample(10_000);
        let mut twice = once;

        once.enable(SeqNumber::new(5000));
        twice.disable();
        twice.enable(SeqNumber::new(5000));

        assert_eq!(once, twice);
        assert_eq!(twice.sample_count, 0);
        assert_eq!(twice.min_rtt_this_window(), None);
    }

    #[test]
    fn test_track_fallback_accumulates() {
        let mut state = fresh();
        state.track_fallback(10, 11);
        state.track_fallback(11, 13);
        assert_eq!(state.fallback_increment, 3);
    }
}
