//! Reno-style host socket for simulations and tests.
//!
//! Real deployments supply their own transport; this one only implements
//! enough of the host side (window, threshold, clamp, standard slow start and
//! additive increase) to drive a congestion controller deterministically.

use crate::transport::{SeqNumber, TcpSocket};

/// Threshold meaning "no slow start limit yet" (packets).
pub const INFINITE_SSTHRESH: u32 = 0x7fff_ffff;

/// Segment size used to advance sequence numbers (bytes).
pub const SIM_MSS: u32 = 1448;

/// Minimal TCP sender state with Reno growth.
#[derive(Debug, Clone)]
pub struct RenoSocket {
    snd_cwnd: u32,
    snd_ssthresh: u32,
    snd_cwnd_clamp: u32,
    /// Fractional additive-increase counter.
    snd_cwnd_cnt: u32,
    snd_nxt: SeqNumber,
    lost_out: u32,
    initial_cwnd: u32,
}

impl RenoSocket {
    pub fn new(initial_cwnd: u32) -> Self {
        Self {
            snd_cwnd: initial_cwnd,
            snd_ssthresh: INFINITE_SSTHRESH,
            snd_cwnd_clamp: u32::MAX,
            snd_cwnd_cnt: 0,
            snd_nxt: SeqNumber::new(0),
            lost_out: 0,
            initial_cwnd,
        }
    }

    pub fn with_ssthresh(mut self, ssthresh: u32) -> Self {
        self.snd_ssthresh = ssthresh;
        self
    }

    pub fn with_clamp(mut self, clamp: u32) -> Self {
        self.snd_cwnd_clamp = clamp;
        self
    }

    pub fn with_snd_nxt(mut self, snd_nxt: SeqNumber) -> Self {
        self.snd_nxt = snd_nxt;
        self
    }

    /// Transmit `packets` new segments; returns the sequence number just past
    /// the first one, i.e. what its ACK will carry.
    pub fn send(&mut self, packets: u32) -> SeqNumber {
        let first_ack = self.snd_nxt.wrapping_add(SIM_MSS);
        self.snd_nxt = self.snd_nxt.wrapping_add(packets.wrapping_mul(SIM_MSS));
        first_ack
    }

    pub fn set_lost_out(&mut self, lost: u32) {
        self.lost_out = lost;
    }

    /// Reno additive increase: one packet per window's worth of ACKs.
    fn cong_avoid_ai(&mut self, w: u32, acked: u32) {
        let w = w.max(1);
        if self.snd_cwnd_cnt >= w {
            self.snd_cwnd_cnt = 0;
            self.snd_cwnd = self.snd_cwnd.saturating_add(1);
        }
        self.snd_cwnd_cnt = self.snd_cwnd_cnt.saturating_add(acked);
        if self.snd_cwnd_cnt >= w {
            let delta = self.snd_cwnd_cnt / w;
            self.snd_cwnd_cnt -= delta * w;
            self.snd_cwnd = self.snd_cwnd.saturating_add(delta);
        }
        self.snd_cwnd = self.snd_cwnd.min(self.snd_cwnd_clamp);
    }
}

impl TcpSocket for RenoSocket {
    fn snd_cwnd(&self) -> u32 {
        self.snd_cwnd
    }

    fn set_snd_cwnd(&mut self, cwnd: u32) {
        self.snd_cwnd = cwnd;
    }

    fn snd_ssthresh(&self) -> u32 {
        self.snd_ssthresh
    }

    fn set_snd_ssthresh(&mut self, ssthresh: u32) {
        self.snd_ssthresh = ssthresh;
    }

    fn snd_cwnd_clamp(&self) -> u32 {
        self.snd_cwnd_clamp
    }

    fn snd_nxt(&self) -> SeqNumber {
        self.snd_nxt
    }

    fn lost_out(&self) -> u32 {
        self.lost_out
    }

    fn initial_cwnd(&self) -> u32 {
        self.initial_cwnd
    }

    fn slow_start(&mut self, acked: u32) -> u32 {
        let cwnd = self
            .snd_cwnd
            .saturating_add(acked)
            .min(self.snd_ssthresh.max(self.snd_cwnd));
        let leftover = acked - (cwnd - self.snd_cwnd);
        self.snd_cwnd = cwnd.min(self.snd_cwnd_clamp);
        leftover
    }

    fn reno_cong_avoid(&mut self, _ack: SeqNumber, acked: u32) {
        let mut acked = acked;
        if self.in_slow_start() {
            acked = self.slow_start(acked);
            if acked == 0 {
                return;
            }
        }
        self.cong_avoid_ai(self.snd_cwnd, acked);
    }

    fn reno_ssthresh(&self) -> u32 {
        (self.snd_cwnd >> 1).max(2)
    }

    fn current_ssthresh(&self) -> u32 {
        self.snd_ssthresh
            .max((self.snd_cwnd >> 1) + (self.snd_cwnd >> 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_start_stops_at_ssthresh() {
        let mut socket = RenoSocket::new(10).with_ssthresh(12);
        let leftover = socket.slow_start(5);
        assert_eq!(socket.snd_cwnd(), 12);
        assert_eq!(leftover, 3);
        assert!(!socket.in_slow_start());
    }

    #[test]
    fn test_additive_increase_one_per_window() {
        let mut socket = RenoSocket::new(10).with_ssthresh(5);
        for _ in 0..10 {
            socket.reno_cong_avoid(SeqNumber::new(0), 1);
        }
        assert_eq!(socket.snd_cwnd(), 11);
    }

    #[test]
    fn test_growth_respects_clamp() {
        let mut socket = RenoSocket::new(10).with_clamp(12);
        for _ in 0..10 {
            socket.reno_cong_avoid(SeqNumber::new(0), 1);
        }
        assert_eq!(socket.snd_cwnd(), 12);
    }

    #[test]
    fn test_send_advances_snd_nxt() {
        let mut socket = RenoSocket::new(10).with_snd_nxt(SeqNumber::new(1000));
        let first_ack = socket.send(3);
        assert_eq!(u32::from(first_ack), 1000 + SIM_MSS);
        assert_eq!(u32::from(socket.snd_nxt()), 1000 + 3 * SIM_MSS);
    }
}
