/// Operator configuration of the algorithm tunables.
pub mod config;

/// Deterministic flow simulation over a modelled bottleneck.
pub mod simulation;

/// Tracing and logging infrastructure.
pub mod tracing;

/// Congestion control interface and the QVegas algorithm.
pub mod transport;
