//! Deterministic simulation of a congestion-controlled flow.
//!
//! This module provides the pieces needed to run a congestion controller
//! against a modelled network without any real I/O or wall-clock time:
//!
//! - **RenoSocket**: a host-side socket with standard Reno growth, standing in
//!   for the transport stack the controller normally plugs into
//! - **BottleneckPath**: a single-bottleneck path whose RTT grows with the
//!   bottleneck queue, with optional seeded jitter
//! - **SimulatedFlow**: drives one flow round by round, delivering one RTT
//!   sample and one ACK per packet, and running loss recovery on drops
//!
//! Each round the whole window is sent, every delivered packet is ACKed in
//! order, and dropped packets are handled by a recovery episode
//! (`Recovery` -> threshold halved -> `Open`).

mod path;
mod socket;

pub use path::{BottleneckPath, PathCondition};
pub use socket::{RenoSocket, INFINITE_SSTHRESH, SIM_MSS};

use crate::transport::{AckSample, CaState, CongestionOps, TcpSocket};

/// What happened during one simulated round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Round number, starting at 1.
    pub round: u64,
    /// Packets sent this round.
    pub sent: u32,
    /// Packets dropped at the bottleneck.
    pub dropped: u32,
    /// Packets queued at the bottleneck.
    pub queued: u32,
    /// Smallest RTT sample delivered this round (usec).
    pub min_rtt_us: i64,
    /// Window after the round's ACKs were processed.
    pub cwnd: u32,
    /// Threshold after the round's ACKs were processed.
    pub ssthresh: u32,
}

/// One flow driven by congestion controller `C` over a bottleneck path.
#[derive(Debug)]
pub struct SimulatedFlow<C: CongestionOps> {
    pub socket: RenoSocket,
    pub cc: C,
    pub path: BottleneckPath,
    round: u64,
}

impl<C: CongestionOps> SimulatedFlow<C> {
    /// Build the flow and bring the connection up (`init` then `Open`).
    pub fn new(mut cc: C, mut socket: RenoSocket, path: BottleneckPath) -> Self {
        cc.init(&mut socket);
        cc.set_state(&mut socket, CaState::Open);
        Self {
            socket,
            cc,
            path,
            round: 0,
        }
    }

    pub fn run_round(&mut self) -> RoundReport {
        self.round += 1;

        let sent = self.socket.snd_cwnd();
        let mut ack = self.socket.send(sent);
        let dropped = self.path.drops(sent);
        let queued = self.path.queued(sent);

        let mut min_rtt_us = i64::MAX;
        for _ in 0..sent - dropped {
            let rtt_us = self.path.rtt_us(sent);
            min_rtt_us = min_rtt_us.min(rtt_us);
            self.cc
                .pkts_acked(&mut self.socket, AckSample::from_micros(rtt_us));
            self.cc.cong_avoid(&mut self.socket, ack, 1);
            ack = ack.wrapping_add(SIM_MSS);
        }

        if dropped > 0 {
            self.recover(dropped);
        }

        let report = RoundReport {
            round: self.round,
            sent,
            dropped,
            queued,
            min_rtt_us,
            cwnd: self.socket.snd_cwnd(),
            ssthresh: self.socket.snd_ssthresh(),
        };
        tracing::trace!(?report, "simulated round");
        report
    }

    /// Run `rounds` round trips and collect their reports.
    pub fn run(&mut self, rounds: usize) -> Vec<RoundReport> {
        (0..rounds).map(|_| self.run_round()).collect()
    }

    fn recover(&mut self, lost: u32) {
        self.socket.set_lost_out(lost);
        self.cc.set_state(&mut self.socket, CaState::Recovery);
        let ssthresh = self.cc.ssthresh(&mut self.socket);
        self.socket.set_snd_ssthresh(ssthresh);
        self.socket.set_snd_cwnd(ssthresh);
        self.socket.set_lost_out(0);
        self.cc.set_state(&mut self.socket, CaState::Open);
        tracing::debug!(lost, ssthresh, "simulated loss recovery");
    }
}
