//! # Card Transform
//!
//! Turns parsed cards into `EnrichedCardRecord`s in three phases.
//!
//! 1. **Per card**: drop the embeddings collection and the metadata database,
//!    resolve the database name, detect raw sources, left-join the raw source
//!    flags back by card id, compute the review flag and the ages.
//! 2. **Barrier**: the whole batch is materialized and the oldest update and
//!    usage ages size the bucket windows.
//! 3. **Per card again**: each card gets its update and usage bucket.
//!
//! Phase 2 needs every card from phase 1, so the transform cannot stream.

mod buckets;
mod detector;
mod namer;

pub use buckets::Binning;
pub use detector::detect;
pub use namer::DatabaseNamer;

use crate::config::AuditRules;
use crate::error::AuditError;
use chrono::{DateTime, Utc};
use common::model::card::CardRecord;
use common::model::enriched::EnrichedCardRecord;
use common::model::raw_source::{RawSource, RawSourceFlags};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A card after phase 1, waiting for the batch-wide bucket bounds.
struct AgedCard {
    card: CardRecord,
    db_name: String,
    raw_dbs_used: BTreeSet<RawSource>,
    raw_flags: RawSourceFlags,
    flagged: bool,
    days_since_last_usage: Option<i64>,
    days_since_last_update: i64,
}

pub fn transform(
    cards: Vec<CardRecord>,
    rules: &AuditRules,
    now: DateTime<Utc>,
) -> Result<Vec<EnrichedCardRecord>, AuditError> {
    let total = cards.len();
    let cards = exclude(cards, rules);
    log::info!("{} of {} cards kept after exclusions", cards.len(), total);

    let mut seen = HashSet::with_capacity(cards.len());
    if let Some(dup) = cards.iter().find(|card| !seen.insert(card.card_id)) {
        return Err(AuditError::DuplicateCard(dup.card_id));
    }

    let namer = DatabaseNamer::new(rules);
    let detected: Vec<(CardRecord, &str, BTreeSet<RawSource>)> = cards
        .into_iter()
        .map(|card| -> Result<_, AuditError> {
            let db_name = namer.name(card.db_id)?;
            let raw_dbs_used = detect(card.card_sql.as_deref());
            Ok((card, db_name, raw_dbs_used))
        })
        .collect::<Result<_, _>>()?;

    // Flags only for cards that touch a raw source, joined back by id below.
    let raw_usage: HashMap<i64, RawSourceFlags> = detected
        .iter()
        .filter(|(_, _, used)| !used.is_empty())
        .map(|(card, _, used)| (card.card_id, RawSourceFlags::from_sources(used)))
        .collect();
    log::debug!("{} cards reference a raw source", raw_usage.len());

    let aged: Vec<AgedCard> = detected
        .into_iter()
        .map(|(card, db_name, raw_dbs_used)| {
            let raw_flags = raw_usage.get(&card.card_id).copied().unwrap_or_default();
            let flagged = raw_flags.any() || db_name != rules.production_db_name;
            AgedCard {
                days_since_last_usage: card.last_used_at.map(|at| age_in_days(now, at)),
                days_since_last_update: age_in_days(now, card.last_updated_at),
                db_name: db_name.to_string(),
                raw_dbs_used,
                raw_flags,
                flagged,
                card,
            }
        })
        .collect();

    let update_bins = Binning::from_ages(
        rules.update_bucket_days,
        aged.iter().map(|c| c.days_since_last_update),
    )
    .ok_or(AuditError::EmptyBatch)?;
    let usage_bins = Binning::from_ages(
        rules.usage_bucket_days,
        aged.iter().filter_map(|c| c.days_since_last_usage),
    );
    log::debug!(
        "{} update buckets, {} usage buckets",
        update_bins.buckets().len(),
        usage_bins.map_or(0, |bins| bins.buckets().len())
    );

    let enriched: Vec<EnrichedCardRecord> = aged
        .into_iter()
        .map(|c| EnrichedCardRecord {
            update_category: update_bins.assign(c.days_since_last_update),
            usage_category: c
                .days_since_last_usage
                .zip(usage_bins)
                .map(|(days, bins)| bins.assign(days)),
            card: c.card,
            db_name: c.db_name,
            raw_dbs_used: c.raw_dbs_used,
            raw_flags: c.raw_flags,
            flagged: c.flagged,
            days_since_last_usage: c.days_since_last_usage,
            days_since_last_update: c.days_since_last_update,
        })
        .collect();

    log::info!(
        "{} of {} cards flagged for review",
        enriched.iter().filter(|c| c.flagged).count(),
        enriched.len()
    );
    Ok(enriched)
}

fn exclude(cards: Vec<CardRecord>, rules: &AuditRules) -> Vec<CardRecord> {
    cards
        .into_iter()
        .filter(|card| card.collection_id != Some(rules.excluded_collection_id))
        .filter(|card| card.db_id != rules.excluded_db_id)
        .collect()
}

/// Whole days elapsed since `at`. Timestamps in the future count as zero.
fn age_in_days(now: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (now - at).num_days().max(0)
}
