use crate::model::enriched::EnrichedCardRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one archive run.
///
/// `archived` and `not_archived` are disjoint and keep the order in which the
/// cards were processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub archived: Vec<i64>,
    pub not_archived: Vec<i64>,
}

impl fmt::Display for ArchiveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cards were archived. {} cards were NOT archived. Cards to try again: {:?}",
            self.archived.len(),
            self.not_archived.len(),
            self.not_archived
        )
    }
}

/// Result of the read-only part of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub cards: Vec<EnrichedCardRecord>,
    pub flagged: usize,
    /// Identifiers the archive selector picked, in listing order.
    pub to_archive: Vec<i64>,
}
