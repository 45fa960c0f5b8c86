use thiserror::Error;

/// Failures that abort a tool call.
///
/// Rejected or failing user queries are not represented here; those come back
/// to the caller as error records.
#[derive(Error, Debug)]
pub enum PeekError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),
}

impl From<PeekError> for rmcp::ErrorData {
    fn from(err: PeekError) -> Self {
        match err {
            PeekError::InvalidArguments(_) | PeekError::UnknownTool(_) => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            _ => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}
