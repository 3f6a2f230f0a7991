//! QVegas congestion controller.
//!
//! This module contains the hook implementation: RTT sampling, the
//! once-per-RTT delay decision, lifecycle resets and the threshold / undo
//! helpers.

use std::sync::Arc;

use crate::transport::congestion_control::{
    AckSample, CaEvent, CaState, CongestionInfo, CongestionOps, SeqNumber, TcpSocket,
};
use crate::transport::errors::CongestionControlError;

use super::config::{QVegasParams, QVegasTunables, CA_PRIV_SIZE, DECISION_MIN_CWND, MIN_CWND};
use super::state::QVegasState;

/// Name the algorithm is selected by.
pub const QVEGAS_NAME: &str = "qvegas";

/// Registration handle for QVegas.
///
/// Validates the per-connection record against the host's private storage
/// budget once, at startup, and then hands out controllers that share one
/// tunables store.
#[derive(Debug, Clone)]
pub struct QVegasModule {
    tunables: Arc<QVegasTunables>,
}

impl QVegasModule {
    pub fn new(
        tunables: Arc<QVegasTunables>,
        priv_budget: usize,
    ) -> Result<Self, CongestionControlError> {
        if let Err(err) = QVegasState::check_private_storage(priv_budget) {
            tracing::warn!(%err, "QVegas registration refused");
            return Err(err);
        }
        tracing::debug!(priv_budget, "QVegas registered");
        Ok(Self { tunables })
    }

    pub fn with_default_budget(
        tunables: Arc<QVegasTunables>,
    ) -> Result<Self, CongestionControlError> {
        Self::new(tunables, CA_PRIV_SIZE)
    }

    /// A fresh, zeroed controller for a new connection.
    pub fn connection(&self) -> QVegas {
        QVegas::new(self.tunables.clone())
    }

    pub fn tunables(&self) -> &Arc<QVegasTunables> {
        &self.tunables
    }
}

/// QVegas delay-based congestion avoidance for one connection.
///
/// Once per RTT the window is compared against the rate the path would carry
/// with no queuing (`cwnd * base_rtt / rtt`). The difference, in packets, is
/// the estimate of data sitting in network queues:
/// - in slow start, more than `gamma` queued packets ends slow start and the
///   window is cut to the measured rate,
/// - in congestion avoidance, more than `beta` shrinks the window by one and
///   fewer than `alpha` grows it by one.
///
/// Outside of a trusted measurement window (after a restart, during loss
/// recovery, or with too few samples) growth is delegated to the host's
/// standard slow start / additive increase.
#[derive(Debug)]
pub struct QVegas {
    pub(crate) state: QVegasState,
    tunables: Arc<QVegasTunables>,
}

impl QVegas {
    pub fn new(tunables: Arc<QVegasTunables>) -> Self {
        Self {
            state: QVegasState::default(),
            tunables,
        }
    }

    pub fn state(&self) -> &QVegasState {
        &self.state
    }

    /// Retransmission timeout: everything measured so far is stale.
    pub fn on_rto(&mut self, tp: &mut dyn TcpSocket) {
        self.reset(tp);
    }

    fn reset(&mut self, tp: &mut dyn TcpSocket) {
        self.state.reset(tp.snd_nxt(), tp.initial_cwnd());
        tracing::debug!(
            snd_nxt = %tp.snd_nxt(),
            saved_cwnd = self.state.saved_window_on_loss,
            "QVegas reset, waiting for a fresh RTT"
        );
    }

    /// Run the host's standard growth for one ACK and remember how much of
    /// the window it is responsible for.
    fn fallback_growth(&mut self, tp: &mut dyn TcpSocket, ack: SeqNumber, acked: u32) {
        let cwnd = tp.snd_cwnd();
        tp.reno_cong_avoid(ack, acked);
        self.state.track_fallback(cwnd, tp.snd_cwnd());
    }

    /// Decision engine for one acknowledgment, with a fixed parameter snapshot.
    pub(crate) fn on_ack(
        &mut self,
        tp: &mut dyn TcpSocket,
        params: &QVegasParams,
        ack: SeqNumber,
        acked: u32,
    ) {
        if !self.state.active {
            self.fallback_growth(tp, ack, acked);
            return;
        }

        if !ack.is_after(self.state.window_at_rtt_start) {
            // Still inside the current RTT
            if tp.in_slow_start() {
                tp.slow_start(acked);
            }
            return;
        }

        // A full RTT has elapsed: start from the window saved at the end of
        // the previous cycle and open the next measurement window.
        tp.set_snd_cwnd(self.state.saved_window_on_loss);
        self.state.window_at_rtt_start = tp.snd_nxt();

        if self.state.has_enough_samples() {
            self.adjust_cwnd(tp, params, acked);
        } else {
            self.fallback_growth(tp, ack, acked);
        }

        self.state.clear_window(tp.snd_cwnd());
    }

    /// The delay-based window adjustment, run at most once per RTT.
    fn adjust_cwnd(&mut self, tp: &mut dyn TcpSocket, params: &QVegasParams, acked: u32) {
        let cwnd = tp.snd_cwnd();
        // Min RTT of the last RTT filters out delayed-ACK inflation
        let rtt = self.state.min_rtt_this_window.max(1);
        let base_rtt = self.state.min_rtt_ever.max(1);

        // Window the path would carry at the measured rate with empty queues
        let target_cwnd = saturate(u64::from(cwnd) * u64::from(base_rtt) / u64::from(rtt));
        // Packets queued in the network beyond what saturates the path
        let diff = saturate(
            u64::from(cwnd) * u64::from(rtt.saturating_sub(base_rtt)) / u64::from(base_rtt),
        );
        // Bounds compare as unsigned: a negative bound is a huge threshold
        let gamma = params.gamma as u32;
        let beta = params.beta as u32;
        let alpha = params.alpha as u32;

        if diff > gamma && tp.in_slow_start() {
            // Too fast: match the actual rate. The +1 makes up for the
            // truncation in target_cwnd.
            tp.set_snd_cwnd(cwnd.min(target_cwnd.saturating_add(1)));
            let ssthresh = self.recalc_ssthresh(tp);
            tp.set_snd_ssthresh(ssthresh);
            tracing::debug!(
                old_cwnd = cwnd,
                new_cwnd = tp.snd_cwnd(),
                ssthresh,
                diff,
                rtt_us = rtt,
                base_rtt_us = base_rtt,
                "QVegas leaving slow start"
            );
        } else if tp.in_slow_start() {
            tp.slow_start(acked);
        } else if diff > beta {
            tp.set_snd_cwnd(cwnd.saturating_sub(1));
            let ssthresh = self.recalc_ssthresh(tp);
            tp.set_snd_ssthresh(ssthresh);
        } else if diff < alpha {
            tp.set_snd_cwnd(cwnd.saturating_add(1));
        }

        let adjusted = tp.snd_cwnd();
        if adjusted < DECISION_MIN_CWND {
            tp.set_snd_cwnd(DECISION_MIN_CWND);
        } else if adjusted > tp.snd_cwnd_clamp() {
            tp.set_snd_cwnd(tp.snd_cwnd_clamp());
        }

        let ssthresh = tp.current_ssthresh();
        tp.set_snd_ssthresh(ssthresh);

        tracing::trace!(
            old_cwnd = cwnd,
            new_cwnd = tp.snd_cwnd(),
            ssthresh,
            target_cwnd,
            diff,
            rtt_us = rtt,
            base_rtt_us = base_rtt,
            samples = self.state.sample_count,
            "QVegas RTT decision"
        );
    }

    /// Threshold after a delay-triggered reduction.
    ///
    /// With packets marked lost, the loss restore point is also moved to the
    /// current window minus half of the fallback growth.
    pub(crate) fn recalc_ssthresh(&mut self, tp: &dyn TcpSocket) -> u32 {
        let cwnd = tp.snd_cwnd();
        if tp.lost_out() > 0 {
            self.state.saved_window_on_loss = cwnd
                .saturating_sub(self.state.fallback_increment / 2)
                .max(MIN_CWND);
        }
        tp.snd_ssthresh()
            .min(cwnd.saturating_sub(1))
            .max(MIN_CWND)
    }
}

impl CongestionOps for QVegas {
    fn name(&self) -> &'static str {
        QVEGAS_NAME
    }

    fn init(&mut self, tp: &mut dyn TcpSocket) {
        self.reset(tp);
    }

    fn ssthresh(&mut self, tp: &mut dyn TcpSocket) -> u32 {
        tp.reno_ssthresh()
    }

    fn cong_avoid(&mut self, tp: &mut dyn TcpSocket, ack: SeqNumber, acked: u32) {
        let params = self.tunables.snapshot();
        self.on_ack(tp, &params, ack, acked);
    }

    fn pkts_acked(&mut self, _tp: &mut dyn TcpSocket, sample: AckSample) {
        self.state.sample(sample.rtt_us);
    }

    fn set_state(&mut self, tp: &mut dyn TcpSocket, state: CaState) {
        if state == CaState::Open {
            self.reset(tp);
            tp.set_snd_cwnd(self.state.saved_window_on_loss.max(MIN_CWND));
        } else {
            self.state.disable();
            tracing::debug!(?state, "QVegas paused during loss recovery");
        }
    }

    fn cwnd_event(&mut self, tp: &mut dyn TcpSocket, event: CaEvent) {
        if event.is_restart() {
            self.reset(tp);
        }
    }

    fn undo_cwnd(&mut self, _tp: &mut dyn TcpSocket) -> u32 {
        self.state.saved_window_on_loss.max(MIN_CWND)
    }

    fn get_info(&self, _ext: u32) -> Option<CongestionInfo> {
        // Introspection export is not wired up; see QVegasInfo.
        None
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
