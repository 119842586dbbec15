//! # Card Audit Service
//!
//! Read-only part of the pipeline behind `GET /api/cards/audit` and
//! `GET /api/cards/audit/csv`.
//!
//! ## Workflow
//!
//! 1.  **Fetch**: all cards are listed through `CardApi::fetch_cards`. A failed
//!     listing stops here.
//! 2.  **Parse**: raw JSON becomes `CardRecord`s (`parse`).
//! 3.  **Transform**: exclusions, database names, raw source detection, flags
//!     and staleness buckets (`transform`).
//! 4.  **Select**: cards past the archive threshold are listed in the report
//!     but nothing is archived.
//!
//! The HTTP client is blocking, so the handlers run the pipeline through
//! `tokio::task::spawn_blocking`.

use crate::config::AuditRules;
use crate::error::AuditError;
use crate::services::cards::client::{CardApi, Connect};
use crate::services::cards::export::to_csv;
use crate::services::cards::parse::parse;
use crate::services::cards::select::select;
use crate::services::cards::transform::transform;
use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use common::model::report::AuditReport;

pub fn run_audit<A: CardApi + ?Sized>(
    api: &A,
    rules: &AuditRules,
    now: DateTime<Utc>,
) -> Result<AuditReport, AuditError> {
    let raw_cards = api.fetch_cards()?;
    log::info!("Fetched {} cards", raw_cards.len());

    let cards = parse(&raw_cards)?;
    let enriched = transform(cards, rules, now)?;
    let to_archive = select(&enriched, rules.archive_after_days)
        .iter()
        .map(|card| card.card.card_id)
        .collect::<Vec<_>>();
    log::info!("{} cards unused for more than {} days", to_archive.len(), rules.archive_after_days);

    Ok(AuditReport {
        generated_at: now,
        flagged: enriched.iter().filter(|card| card.flagged).count(),
        cards: enriched,
        to_archive,
    })
}

async fn audit_blocking<C: Connect>(
    connector: web::Data<C>,
    rules: web::Data<AuditRules>,
) -> Result<AuditReport, String> {
    let connector = connector.into_inner();
    let rules = rules.into_inner();
    let handle = tokio::task::spawn_blocking(move || {
        let api = connector.connect()?;
        run_audit(&api, &rules, Utc::now())
    });

    match handle.await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(join_err) => Err(format!("join error: {}", join_err)),
    }
}

pub(crate) async fn process<C: Connect>(
    connector: web::Data<C>,
    rules: web::Data<AuditRules>,
) -> impl Responder {
    match audit_blocking(connector, rules).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => HttpResponse::ServiceUnavailable().body(format!("Error auditing cards: {}", e)),
    }
}

pub(crate) async fn process_csv<C: Connect>(
    connector: web::Data<C>,
    rules: web::Data<AuditRules>,
) -> impl Responder {
    let report = match audit_blocking(connector, rules).await {
        Ok(report) => report,
        Err(e) => {
            return HttpResponse::ServiceUnavailable().body(format!("Error auditing cards: {}", e))
        }
    };
    match to_csv(&report.cards) {
        Ok(body) => HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(body),
        Err(e) => HttpResponse::InternalServerError().body(format!("Error exporting cards: {}", e)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::cards::client::fake::FakeApi;
    use crate::services::cards::transform::tests::now;
    use chrono::Duration;
    use serde_json::{json, Value};

    pub(crate) fn raw_card(id: i64, collection_id: i64, sql: Option<&str>, used_days_ago: i64) -> Value {
        raw_card_at(now(), id, collection_id, sql, used_days_ago)
    }

    pub(crate) fn raw_card_at(
        now: DateTime<Utc>,
        id: i64,
        collection_id: i64,
        sql: Option<&str>,
        used_days_ago: i64,
    ) -> Value {
        json!({
            "id": id,
            "collection_id": collection_id,
            "name": format!("card {id}"),
            "database_id": 35,
            "created_at": (now - Duration::days(500)).to_rfc3339(),
            "updated_at": (now - Duration::days(200)).to_rfc3339(),
            "last_used_at": (now - Duration::days(used_days_ago)).to_rfc3339(),
            "archived": false,
            "creator": { "common_name": "Ada Lovelace" },
            "dataset_query": { "type": "native", "native": { "query": sql } }
        })
    }

    /// Card (a) is fresh and clean, card (b) is stale and reads a raw source,
    /// card (c) lives in the embeddings collection.
    pub(crate) fn three_cards() -> Vec<Value> {
        three_cards_at(now())
    }

    pub(crate) fn three_cards_at(now: DateTime<Utc>) -> Vec<Value> {
        vec![
            raw_card_at(now, 1, 10, Some("select * from analytics.orders"), 5),
            raw_card_at(now, 2, 10, Some("select * from raw_fivetran.orders"), 150),
            raw_card_at(now, 3, 1950, Some("select * from raw_fivetran.orders"), 500),
        ]
    }

    #[test]
    fn audit_flags_and_selects_stale_raw_card() {
        let api = FakeApi::new(three_cards());
        let report = run_audit(&api, &AuditRules::default(), now()).unwrap();

        assert_eq!(report.cards.len(), 2);
        let a = &report.cards[0];
        let b = &report.cards[1];
        assert_eq!((a.card.card_id, a.flagged), (1, false));
        assert_eq!((b.card.card_id, b.flagged), (2, true));
        assert_eq!(report.flagged, 1);
        assert_eq!(report.to_archive, vec![2]);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn failed_listing_stops_the_pipeline() {
        let mut api = FakeApi::new(Vec::new());
        api.cards = Err(503);
        let err = run_audit(&api, &AuditRules::default(), now()).unwrap_err();
        assert!(matches!(err, AuditError::Fetch { status: 503, .. }));
    }

    #[test]
    fn bad_record_stops_the_pipeline() {
        let mut cards = three_cards();
        cards[1].as_object_mut().unwrap().remove("database_id");
        let api = FakeApi::new(cards);
        let err = run_audit(&api, &AuditRules::default(), now()).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingField {
                index: 1,
                card_id: Some(2),
                field: "database_id"
            }
        ));
    }
}
