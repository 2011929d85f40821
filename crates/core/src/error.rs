use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A snapshot fetch from one of the collaborator stores failed or timed out.
    #[error("Query failure: {0}")]
    QueryFailure(String),

    /// A caller-supplied parameter is out of range. Never coerced.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The durable usage-ledger store could not be read or written.
    #[error("Ledger I/O failure: {0}")]
    LedgerIo(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}
