use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A card as read from the BI tool's `/api/card` listing, normalized to the
/// fields the audit needs.
///
/// Records are built once by the parser (`services::cards::parse` in the
/// backend) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Unique card identifier; the join key for every later stage.
    pub card_id: i64,
    /// Collection the card lives in. `None` for the root collection.
    pub collection_id: Option<i64>,
    pub card_name: String,
    /// Native SQL of the card, taken from `dataset_query.native.query`.
    /// GUI-built questions have no native query.
    pub card_sql: Option<String>,
    /// Identifier of the database (data source) the card queries.
    pub db_id: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_updated_at: DateTime<Utc>,
    /// Email of the last editor; absent when the card has no edit history.
    pub last_updated_by: Option<String>,
    /// `None` when the card has never been used.
    pub last_used_at: Option<DateTime<Utc>>,
    pub archived: bool,
}
