//! QVegas delay-based congestion avoidance.
//!
//! Based on TCP Vegas (Brakmo & Peterson, "TCP Vegas: End to end congestion
//! avoidance on a global internet", IEEE JSAC 13(8), 1995), in the variant
//! that leaves loss detection and recovery entirely to the host.
//!
//! ## How it differs from textbook Vegas
//!
//! - Slow start grows the window every RTT, like Reno, instead of every other RTT.
//! - The "actual" rate comes from the rate ACKs return, not the send rate.
//! - On slow start exit the window is set straight to the measured rate.
//! - Delayed-ACK noise is filtered by using the minimum RTT seen during the
//!   last RTT, and by refusing to decide on two or fewer samples.
//! - After an idle restart no decision is made until a whole flight of new
//!   data has been acknowledged.
//!
//! ## Per-RTT decision
//!
//! | Queued packets (`diff`) | Slow start | Congestion avoidance |
//! |-------------------------|------------|----------------------|
//! | `> gamma` | exit, `cwnd = min(cwnd, target + 1)` | - |
//! | `> beta` | - | `cwnd -= 1` |
//! | `< alpha` | - | `cwnd += 1` |
//! | otherwise | host slow start | hold |

mod config;
mod controller;
mod state;
mod stats;


// Re-export public API
pub use config::{QVegasParams, QVegasTunables, CA_PRIV_SIZE};
pub use controller::{QVegas, QVegasModule, QVEGAS_NAME};
pub use state::QVegasState;
pub use stats::QVegasInfo;
