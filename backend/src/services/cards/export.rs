use crate::error::AuditError;
use chrono::{DateTime, Utc};
use common::model::enriched::EnrichedCardRecord;
use serde::Serialize;

/// Flat CSV view of an enriched card: one column per raw source and the
/// bucket labels as text.
#[derive(Serialize)]
struct CsvRow<'a> {
    card_id: i64,
    collection_id: Option<i64>,
    card_name: &'a str,
    db_id: i64,
    db_name: &'a str,
    created_at: DateTime<Utc>,
    created_by: &'a str,
    last_updated_at: DateTime<Utc>,
    last_updated_by: Option<&'a str>,
    last_used_at: Option<DateTime<Utc>>,
    archived: bool,
    raw_dbs_used: String,
    raw_hex: bool,
    raw_stitch: bool,
    raw_fivetran: bool,
    raw_airbyte: bool,
    raw_portable: bool,
    raw_dataddo: bool,
    flagged: bool,
    days_since_last_usage: Option<i64>,
    days_since_last_update: i64,
    update_category: &'a str,
    usage_category: Option<&'a str>,
}

impl<'a> From<&'a EnrichedCardRecord> for CsvRow<'a> {
    fn from(record: &'a EnrichedCardRecord) -> Self {
        let card = &record.card;
        let flags = &record.raw_flags;
        CsvRow {
            card_id: card.card_id,
            collection_id: card.collection_id,
            card_name: &card.card_name,
            db_id: card.db_id,
            db_name: &record.db_name,
            created_at: card.created_at,
            created_by: &card.created_by,
            last_updated_at: card.last_updated_at,
            last_updated_by: card.last_updated_by.as_deref(),
            last_used_at: card.last_used_at,
            archived: card.archived,
            raw_dbs_used: record
                .raw_dbs_used
                .iter()
                .map(|source| source.marker())
                .collect::<Vec<_>>()
                .join(";"),
            raw_hex: flags.raw_hex,
            raw_stitch: flags.raw_stitch,
            raw_fivetran: flags.raw_fivetran,
            raw_airbyte: flags.raw_airbyte,
            raw_portable: flags.raw_portable,
            raw_dataddo: flags.raw_dataddo,
            flagged: record.flagged,
            days_since_last_usage: record.days_since_last_usage,
            days_since_last_update: record.days_since_last_update,
            update_category: &record.update_category.label,
            usage_category: record.usage_category.as_ref().map(|b| b.label.as_str()),
        }
    }
}

pub fn to_csv(cards: &[EnrichedCardRecord]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for card in cards {
        writer.serialize(CsvRow::from(card))?;
    }
    writer
        .into_inner()
        .map_err(|e| AuditError::Csv(e.into_error().into()))
}
