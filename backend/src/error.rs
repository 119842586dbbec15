//! Error taxonomy of the card audit pipeline.
//!
//! Every variant here aborts the run it happens in. The one recoverable
//! condition, an archive request the server does not confirm, is not an error
//! at all: the executor records it in the `ArchiveReport` and moves on.

/// Errors raised while fetching, parsing or transforming cards.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Card listing failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Request to the BI tool failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response body is not valid card JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Card #{index} (id {card_id:?}) is missing required field '{field}'")]
    MissingField {
        index: usize,
        card_id: Option<i64>,
        field: &'static str,
    },

    #[error("Card #{index} (id {card_id:?}) has an invalid '{field}': {reason}")]
    InvalidField {
        index: usize,
        card_id: Option<i64>,
        field: &'static str,
        reason: String,
    },

    #[error("Card {0} appears more than once in the listing")]
    DuplicateCard(i64),

    #[error("Database id {0} is not in the database name table")]
    UnknownDatabase(i64),

    #[error("Cannot build age buckets for an empty batch")]
    EmptyBatch,

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
