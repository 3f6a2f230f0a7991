use thiserror::Error;

// Errors surfaced while registering a congestion control algorithm with the host
#[derive(Debug, Error)]
pub enum CongestionControlError {
    #[error("per-connection state needs {size} bytes, host private area holds {budget}")]
    PrivateStateTooLarge { size: usize, budget: usize },
}
