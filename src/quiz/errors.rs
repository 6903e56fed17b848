use thiserror::Error;

/// Errors that can arise inside the quiz engine and its collaborators.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (question bank reads, directory creation).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed question bank or score payload.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Score endpoint transport failure.
    #[error("http error: {0}")]
    Http(String),

    /// Score endpoint answered with a non-success status.
    #[error("score endpoint rejected update: {0}")]
    ScoreRejected(String),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A phase exists but has no questions configured.
    #[error("phase {0} has no questions")]
    NoQuestions(u32),

    /// Not enough coins for a purchase
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },

    /// Item id not present in the catalog
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// Operation not valid in the encounter's current state
    #[error("invalid encounter state: {0}")]
    InvalidState(String),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

