use rota_chain::ChainError;
use rota_network::NetworkError;
use rota_rounds::RoundError;
use rota_store::StoreError;
use thiserror::Error;

/// Umbrella error for node-level operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The dispatch loop did not drain within the shutdown window.
    #[error("node shutdown timed out")]
    ShutdownTimeout,
}
