//! Audits the BI tool's cards and archives the stale ones.
//!
//! The pipeline runs left to right: `client` (fetch) → `parse` → `transform`
//! (names, raw sources, flags, buckets) → `select` → `archive` (executor).
//!
//! The provided routes are:
//! - `GET /api/cards/audit`: runs the pipeline up to the selector and returns
//!   the `AuditReport` as JSON. Nothing is archived.
//! - `GET /api/cards/audit/csv`: the same enriched cards as a CSV download.
//! - `POST /api/cards/archive`: starts a background archive job and returns
//!   its `job_id`. An optional `{"dry_run": true}` body only reports the
//!   selection.
//! - `GET /api/cards/status/{job_id}`: current `JobStatus` of an archive job.

use actix_web::web::{get, post, scope};
use actix_web::Scope;
use client::Connect;

pub mod archive;
pub mod audit;
pub mod client;
mod export;
mod get_status;
pub mod parse;
pub mod select;
pub mod transform;

const API_PATH: &str = "/api/cards";

/// Configures and returns the Actix scope for card audit routes.
///
/// Handlers expect `web::Data<C>`, `web::Data<AuditRules>` and
/// `web::Data<JobsState>` in the application state.
pub fn configure_routes<C: Connect>() -> Scope {
    scope(API_PATH)
        .route("/audit", get().to(audit::process::<C>))
        .route("/audit/csv", get().to(audit::process_csv::<C>))
        .route("/archive", post().to(archive::process::<C>))
        .route("/status/{job_id}", get().to(get_status::process))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditRules;
    use crate::job_controller::state::{start_job_updater, JobsState};
    use crate::services::cards::audit::tests::three_cards_at;
    use crate::services::cards::client::fake::FakeApi;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use chrono::Utc;
    use common::jobs::JobStatus;
    use serde_json::Value;
    use std::time::Duration;

    macro_rules! app {
        ($api:expr) => {{
            let (jobs_state, rx) = JobsState::new(16);
            actix_web::rt::spawn(start_job_updater(jobs_state.clone(), rx));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(jobs_state))
                    .app_data(web::Data::new($api))
                    .app_data(web::Data::new(AuditRules::default()))
                    .service(configure_routes::<FakeApi>()),
            )
            .await
        }};
    }

    /// Polls the status route until the job leaves `Pending`/`InProgress`.
    macro_rules! finished_status {
        ($app:expr, $job_id:expr) => {{
            let job_id: String = $job_id;
            let mut finished = None;
            for _ in 0..500 {
                let req = test::TestRequest::get()
                    .uri(&format!("/api/cards/status/{job_id}"))
                    .to_request();
                let status: JobStatus = test::call_and_read_body_json(&$app, req).await;
                if matches!(status, JobStatus::Completed(_) | JobStatus::Failed(_)) {
                    finished = Some(status);
                    break;
                }
                actix_web::rt::time::sleep(Duration::from_millis(10)).await;
            }
            finished.expect("archive job did not finish")
        }};
    }

    fn job_id(body: Value) -> String {
        body["job_id"].as_str().unwrap().to_string()
    }

    #[actix_web::test]
    async fn audit_route_returns_report_without_archiving() {
        let api = FakeApi::new(three_cards_at(Utc::now())).confirming(&[2]);
        let app = app!(api.clone());

        let req = test::TestRequest::get().uri("/api/cards/audit").to_request();
        let report: Value = test::call_and_read_body_json(&app, req).await;

        let ids: Vec<i64> = report["cards"]
            .as_array()
            .unwrap()
            .iter()
            .map(|card| card["card_id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(report["flagged"], 1);
        assert_eq!(report["to_archive"], serde_json::json!([2]));
        assert!(api.calls().is_empty());
    }

    #[actix_web::test]
    async fn audit_csv_route_serves_one_row_per_card() {
        let app = app!(FakeApi::new(three_cards_at(Utc::now())));

        let req = test::TestRequest::get().uri("/api/cards/audit/csv").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/csv"), "{content_type}");

        let body = test::read_body(resp).await;
        let csv = std::str::from_utf8(&body).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("card_id,"));
    }

    #[actix_web::test]
    async fn audit_route_reports_failed_listing() {
        let mut api = FakeApi::new(Vec::new());
        api.cards = Err(503);
        let app = app!(api);

        let req = test::TestRequest::get().uri("/api/cards/audit").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("status 503"));
    }

    #[actix_web::test]
    async fn archive_route_without_body_archives_stale_cards() {
        let api = FakeApi::new(three_cards_at(Utc::now())).confirming(&[2]);
        let app = app!(api.clone());

        let req = test::TestRequest::post().uri("/api/cards/archive").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let status = finished_status!(app, job_id(body));

        assert_eq!(
            status,
            JobStatus::Completed(
                "1 cards were archived. 0 cards were NOT archived. Cards to try again: []"
                    .to_string()
            )
        );
        assert_eq!(api.calls(), vec![2]);
    }

    #[actix_web::test]
    async fn archive_route_dry_run_archives_nothing() {
        let api = FakeApi::new(three_cards_at(Utc::now())).confirming(&[2]);
        let app = app!(api.clone());

        let req = test::TestRequest::post()
            .uri("/api/cards/archive")
            .set_json(serde_json::json!({ "dry_run": true }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let status = finished_status!(app, job_id(body));

        assert_eq!(
            status,
            JobStatus::Completed("1 cards would be archived: [2]".to_string())
        );
        assert!(api.calls().is_empty());
    }

    #[actix_web::test]
    async fn archive_job_fails_when_listing_fails() {
        let mut api = FakeApi::new(Vec::new());
        api.cards = Err(502);
        let app = app!(api.clone());

        let req = test::TestRequest::post().uri("/api/cards/archive").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let job_id = job_id(body);

        let req = test::TestRequest::get()
            .uri(&format!("/api/cards/status/{job_id}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        match finished_status!(app, job_id.clone()) {
            JobStatus::Failed(message) => assert!(message.contains("status 502"), "{message}"),
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(api.calls().is_empty());
    }
}
