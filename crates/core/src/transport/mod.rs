//! Congestion control for a reliable byte-stream transport.
//!
//! The transport itself (segments, timers, loss recovery) belongs to the
//! host. This module holds the interface an algorithm plugs into and the
//! QVegas delay-based algorithm.

pub mod congestion_control;
pub mod errors;
pub mod qvegas;

pub use congestion_control::{
    AckSample, CaEvent, CaState, CongestionInfo, CongestionOps, SeqNumber, TcpSocket,
};
pub use errors::CongestionControlError;
pub use qvegas::{
    QVegas, QVegasInfo, QVegasModule, QVegasParams, QVegasState, QVegasTunables, CA_PRIV_SIZE,
    QVEGAS_NAME,
};
