//! QVegas tunables and constants.
//!
//! The three queuing bounds are process-wide and may be rewritten by an
//! operator at any time. The decision logic never reads them directly: each
//! hook takes one [`QVegasParams`] snapshot from [`QVegasTunables`] on entry
//! and threads it through.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Sentinel for "no RTT observed yet" in both RTT minima (microseconds).
pub(crate) const RTT_UNSET: u32 = 0x7fff_ffff;

/// Samples needed within one RTT before a delay-based decision is trusted.
///
/// Two or fewer samples per RTT means roughly one ACK per RTT, which is
/// almost certainly delayed-ACK noise.
pub(crate) const MIN_SAMPLES_PER_RTT: u16 = 3;

/// Smallest window the decision engine leaves behind (packets).
pub(crate) const DECISION_MIN_CWND: u32 = 4;

/// Smallest window or threshold handed back to the host (packets).
pub(crate) const MIN_CWND: u32 = 2;

/// Host private-area budget for per-connection algorithm state (bytes).
pub const CA_PRIV_SIZE: usize = 104;

pub(crate) const DEFAULT_ALPHA: i32 = 2;
pub(crate) const DEFAULT_BETA: i32 = 4;
pub(crate) const DEFAULT_GAMMA: i32 = 1;

/// Immutable snapshot of the QVegas queuing bounds (packets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QVegasParams {
    /// Lower bound of packets queued in the network; below it, grow.
    pub alpha: i32,
    /// Upper bound of packets queued in the network; above it, shrink.
    pub beta: i32,
    /// Queued packets above which slow start is abandoned.
    pub gamma: i32,
}

impl Default for QVegasParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
        }
    }
}

impl QVegasParams {
    /// Reject bounds that leave no steady-state band.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alpha > self.beta {
            return Err(ConfigError::InvertedBounds {
                alpha: self.alpha,
                beta: self.beta,
            });
        }
        Ok(())
    }
}

static GLOBAL_TUNABLES: LazyLock<Arc<QVegasTunables>> =
    LazyLock::new(|| Arc::new(QVegasTunables::default()));

/// Concurrently writable store for the QVegas bounds.
///
/// Each bound is an independent `AtomicI32` with `Relaxed` ordering. A reader
/// may observe a mix of old and new values across the three fields while an
/// operator is writing; every individual value is always one that was stored.
#[derive(Debug)]
pub struct QVegasTunables {
    alpha: AtomicI32,
    beta: AtomicI32,
    gamma: AtomicI32,
}

impl Default for QVegasTunables {
    fn default() -> Self {
        Self::new(QVegasParams::default())
    }
}

impl QVegasTunables {
    pub fn new(params: QVegasParams) -> Self {
        Self {
            alpha: AtomicI32::new(params.alpha),
            beta: AtomicI32::new(params.beta),
            gamma: AtomicI32::new(params.gamma),
        }
    }

    /// The process-wide store shared by every connection that does not bring
    /// its own.
    pub fn global() -> Arc<QVegasTunables> {
        GLOBAL_TUNABLES.clone()
    }

    pub fn snapshot(&self) -> QVegasParams {
        QVegasParams {
            alpha: self.alpha.load(Ordering::Relaxed),
            beta: self.beta.load(Ordering::Relaxed),
            gamma: self.gamma.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, params: QVegasParams) {
        self.alpha.store(params.alpha, Ordering::Relaxed);
        self.beta.store(params.beta, Ordering::Relaxed);
        self.gamma.store(params.gamma, Ordering::Relaxed);
        tracing::debug!(
            alpha = params.alpha,
            beta = params.beta,
            gamma = params.gamma,
            "QVegas tunables updated"
        );
    }

    pub fn set_alpha(&self, alpha: i32) {
        self.alpha.store(alpha, Ordering::Relaxed);
    }

    pub fn set_beta(&self, beta: i32) {
        self.beta.store(beta, Ordering::Relaxed);
    }

    pub fn set_gamma(&self, gamma: i32) {
        self.gamma.store(gamma, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = QVegasParams::default();
        assert_eq!(params.alpha, 2);
        assert_eq!(params.beta, 4);
        assert_eq!(params.gamma, 1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let params = QVegasParams {
            alpha: 5,
            beta: 3,
            gamma: 1,
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvertedBounds { alpha: 5, beta: 3 })
        ));
    }

    #[test]
    fn test_snapshot_reflects_writes() {
        let tunables = QVegasTunables::default();
        let before = tunables.snapshot();

        tunables.set_alpha(1);
        tunables.set_beta(6);
        tunables.set_gamma(3);

        // Snapshots taken earlier are unaffected
        assert_eq!(before, QVegasParams::default());
        assert_eq!(
            tunables.snapshot(),
            QVegasParams {
                alpha: 1,
                beta: 6,
                gamma: 3
            }
        );

        tunables.store(QVegasParams::default());
        assert_eq!(tunables.snapshot(), QVegasParams::default());
    }

    #[test]
    fn test_partial_params_deserialize_with_defaults() {
        let params: QVegasParams = toml::from_str("beta = 8").unwrap();
        assert_eq!(params.alpha, DEFAULT_ALPHA);
        assert_eq!(params.beta, 8);
        assert_eq!(params.gamma, DEFAULT_GAMMA);
    }

    #[test]
    fn test_concurrent_writes_are_visible() {
        let tunables = Arc::new(QVegasTunables::default());
        let writer = {
            let tunables = tunables.clone();
            std::thread::spawn(move || {
                for gamma in 0..1000 {
                    tunables.set_gamma(gamma);
                }
            })
        };
        // Readers only ever see values that were actually stored
        for _ in 0..1000 {
            let gamma = tunables.snapshot().gamma;
            assert!((0..1000).contains(&gamma));
        }
        writer.join().unwrap();
        assert_eq!(tunables.snapshot().gamma, 999);
    }
}
