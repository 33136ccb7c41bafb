use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Scan cancelled")]
    Cancelled,
}

impl MarketError {
    /// Errors caused by the caller's input rather than by the data or the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MarketError::InvalidQuery(_) | MarketError::UnknownField(_))
    }
}
