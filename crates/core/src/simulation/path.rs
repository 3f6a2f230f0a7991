//! Single-bottleneck network path model.
//!
//! The path holds `bdp_packets` at its propagation delay; every packet in
//! flight beyond that sits in the bottleneck queue and adds one packet's
//! worth of serialization delay. Packets beyond `buffer_packets` of queue are
//! dropped.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Network condition presets for path construction.
#[derive(Debug, Clone, Copy)]
pub struct PathCondition {
    /// Propagation round-trip time with empty queues.
    pub base_rtt: Duration,
    /// Packets in flight that exactly fill the path.
    pub bdp_packets: u32,
    /// Bottleneck queue capacity (packets).
    pub buffer_packets: u32,
}

impl PathCondition {
    /// Datacenter: 1ms RTT, shallow buffer
    pub const DATACENTER: Self = Self {
        base_rtt: Duration::from_millis(1),
        bdp_packets: 20,
        buffer_packets: 40,
    };

    /// Continental: 50ms RTT, one BDP of buffer
    pub const CONTINENTAL: Self = Self {
        base_rtt: Duration::from_millis(50),
        bdp_packets: 100,
        buffer_packets: 100,
    };

    /// Intercontinental: 135ms RTT, deep buffer
    pub const INTERCONTINENTAL: Self = Self {
        base_rtt: Duration::from_millis(135),
        bdp_packets: 300,
        buffer_packets: 600,
    };
}

/// Deterministic bottleneck path.
#[derive(Debug, Clone)]
pub struct BottleneckPath {
    base_rtt_us: u64,
    bdp_packets: u32,
    buffer_packets: u32,
    jitter_us: u64,
    rng: SmallRng,
}

impl BottleneckPath {
    pub fn new(condition: PathCondition) -> Self {
        Self {
            base_rtt_us: u64::try_from(condition.base_rtt.as_micros()).unwrap_or(u64::MAX),
            bdp_packets: condition.bdp_packets.max(1),
            buffer_packets: condition.buffer_packets,
            jitter_us: 0,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Add uniform extra delay in `[0, jitter)` to every sample, drawn from a
    /// seeded RNG so runs are reproducible.
    pub fn with_jitter(mut self, jitter: Duration, seed: u64) -> Self {
        self.jitter_us = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn base_rtt_us(&self) -> u64 {
        self.base_rtt_us
    }

    pub fn bdp_packets(&self) -> u32 {
        self.bdp_packets
    }

    /// Packets sitting in the bottleneck queue with `in_flight` outstanding.
    pub fn queued(&self, in_flight: u32) -> u32 {
        in_flight
            .saturating_sub(self.bdp_packets)
            .min(self.buffer_packets)
    }

    /// Packets dropped at the bottleneck with `in_flight` outstanding.
    pub fn drops(&self, in_flight: u32) -> u32 {
        in_flight.saturating_sub(self.bdp_packets.saturating_add(self.buffer_packets))
    }

    /// RTT sample (usec) seen by a packet sent with `in_flight` outstanding.
    pub fn rtt_us(&mut self, in_flight: u32) -> i64 {
        let queued = u64::from(self.queued(in_flight));
        let queuing_us = self.base_rtt_us.saturating_mul(queued) / u64::from(self.bdp_packets);
        let jitter = if self.jitter_us > 0 {
            self.rng.random_range(0..self.jitter_us)
        } else {
            0
        };
        let rtt_us = self
            .base_rtt_us
            .saturating_add(queuing_us)
            .saturating_add(jitter);
        i64::try_from(rtt_us).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> BottleneckPath {
        BottleneckPath::new(PathCondition {
            base_rtt: Duration::from_millis(10),
            bdp_packets: 20,
            buffer_packets: 10,
        })
    }

    #[test]
    fn test_no_queuing_below_bdp() {
        let mut path = path();
        assert_eq!(path.queued(15), 0);
        assert_eq!(path.rtt_us(15), 10_000);
        assert_eq!(path.drops(15), 0);
    }

    #[test]
    fn test_queuing_adds_delay() {
        let mut path = path();
        assert_eq!(path.queued(30), 10);
        assert_eq!(path.rtt_us(30), 15_000);
    }

    #[test]
    fn test_overflow_drops() {
        let path = path();
        assert_eq!(path.queued(35), 10);
        assert_eq!(path.drops(35), 5);
    }

    #[test]
    fn test_jitter_is_reproducible() {
        let mut a = path().with_jitter(Duration::from_millis(2), 7);
        let mut b = path().with_jitter(Duration::from_millis(2), 7);
        for _ in 0..16 {
            let sample = a.rtt_us(10);
            assert_eq!(sample, b.rtt_us(10));
            assert!((10_000..12_000).contains(&sample));
        }
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let mut path = BottleneckPath::new(PathCondition {
            base_rtt: Duration::MAX,
            bdp_packets: 0,
            buffer_packets: 10,
        })
        .with_jitter(Duration::MAX, 1);

        assert_eq!(path.base_rtt_us(), u64::MAX);
        assert_eq!(path.bdp_packets(), 1);
        assert_eq!(path.rtt_us(5), i64::MAX);
    }
}
