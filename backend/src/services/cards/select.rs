use common::model::enriched::EnrichedCardRecord;

/// Cards unused for strictly more than `threshold_days`.
///
/// Cards that were never used have no usage age and are never selected.
pub fn select(enriched: &[EnrichedCardRecord], threshold_days: i64) -> Vec<&EnrichedCardRecord> {
    enriched
        .iter()
        .filter(|card| {
            card.days_since_last_usage
                .is_some_and(|days| days > threshold_days)
        })
        .collect()
}
