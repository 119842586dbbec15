use crate::model::card::CardRecord;
use crate::model::raw_source::{RawSource, RawSourceFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A fixed-width window of ages in days.
///
/// Windows are closed on the right: window `k` holds ages in
/// `(k * width, (k + 1) * width]`, and the first one also holds `0`.
/// `lower` and `upper` are the inclusive ages the window holds; the label
/// keeps the `since {k * width}-{k * width + width - 1} days` form.
///
/// Buckets are derived per run from the oldest card in the batch, so the set
/// of labels changes between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub lower: i64,
    pub upper: i64,
    pub label: String,
}

impl AgeBucket {
    /// Window number `index` (from 0) of `width` days.
    pub fn new(index: i64, width: i64) -> Self {
        let start = index * width;
        AgeBucket {
            lower: if index == 0 { 0 } else { start + 1 },
            upper: start + width,
            label: format!("since {}-{} days", start, start + width - 1),
        }
    }

    pub fn contains(&self, days: i64) -> bool {
        self.lower <= days && days <= self.upper
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A card after the transform stage: resolved data-source name, detected raw
/// sources, the review flag and staleness buckets.
///
/// Only exists for the duration of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCardRecord {
    #[serde(flatten)]
    pub card: CardRecord,
    pub db_name: String,
    pub raw_dbs_used: BTreeSet<RawSource>,
    #[serde(flatten)]
    pub raw_flags: RawSourceFlags,
    pub flagged: bool,
    pub days_since_last_usage: Option<i64>,
    pub days_since_last_update: i64,
    pub update_category: AgeBucket,
    /// `None` when the card was never used.
    pub usage_category: Option<AgeBucket>,
}
