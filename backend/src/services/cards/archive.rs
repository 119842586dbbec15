//! # Card Archive Service
//!
//! `POST /api/cards/archive` runs the whole pipeline and archives every card
//! unused for longer than the configured threshold, as a background job.
//!
//! ## Workflow
//!
//! 1.  **Job Scheduling**: `schedule_archive_job` registers a new `job_id` as
//!     `Pending`, returns it to the client immediately and spawns the job.
//! 2.  **Pipeline**: the blocking worker (`archive_blocking`) opens the API
//!     session and runs fetch, parse, transform and select (`run_audit`).
//! 3.  **Archiving**: `archive_batch` sends one archive request per selected
//!     card, strictly one after the other, and reports
//!     `JobStatus::InProgress(cards processed)` after each.
//! 4.  **Result**: the job completes with the summary line of the
//!     `ArchiveReport`, listing the identifiers to retry by hand. Pipeline
//!     errors fail the job before any card is touched. With `dry_run` the job
//!     completes with the selected identifiers and archives nothing.

use crate::config::AuditRules;
use crate::error::AuditError;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::cards::audit::run_audit;
use crate::services::cards::client::{CardApi, Connect};
use crate::services::cards::select::select;
use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use common::jobs::JobStatus;
use common::model::enriched::EnrichedCardRecord;
use common::model::report::ArchiveReport;
use common::requests::StartArchiveRequest;
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Text the BI tool echoes back once a card is really archived.
const ARCHIVE_CONFIRMATION: &str = r#""archived":true"#;

/// Archives each distinct card in `selected`, in order of first appearance.
///
/// A card counts as archived only when the response body confirms it; a
/// `200 OK` without the confirmation, or a request that never got an answer,
/// puts the card on the retry list. `on_progress` is called with the number
/// of cards processed so far.
pub fn archive_batch<A: CardApi + ?Sized>(
    selected: &[&EnrichedCardRecord],
    api: &A,
    mut on_progress: impl FnMut(usize),
) -> ArchiveReport {
    let mut seen = HashSet::new();
    let card_ids: Vec<i64> = selected
        .iter()
        .map(|card| card.card.card_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut report = ArchiveReport::default();
    for (done, card_id) in card_ids.into_iter().enumerate() {
        log::info!("Archiving card_id {}", card_id);
        match api.archive_card(card_id) {
            Ok(response) if response.body.contains(ARCHIVE_CONFIRMATION) => {
                log::info!("Card {} successfully archived", card_id);
                report.archived.push(card_id);
            }
            Ok(response) => {
                log::warn!("Card {} was not archived (status {})", card_id, response.status);
                report.not_archived.push(card_id);
            }
            Err(e) => {
                log::warn!("Card {} was not archived: {}", card_id, e);
                report.not_archived.push(card_id);
            }
        }
        on_progress(done + 1);
    }

    report
}

/// Full pipeline followed by the archive run. Returns the job summary.
pub fn run_archive<A: CardApi + ?Sized>(
    api: &A,
    rules: &AuditRules,
    now: DateTime<Utc>,
    dry_run: bool,
    on_progress: impl FnMut(usize),
) -> Result<String, AuditError> {
    let audit = run_audit(api, rules, now)?;
    let selected = select(&audit.cards, rules.archive_after_days);

    if dry_run {
        return Ok(format!(
            "{} cards would be archived: {:?}",
            audit.to_archive.len(),
            audit.to_archive
        ));
    }

    let report = archive_batch(&selected, api, on_progress);
    Ok(report.to_string())
}

fn archive_blocking<C: Connect>(
    tx: mpsc::Sender<JobUpdate>,
    job_id: String,
    connector: &C,
    rules: &AuditRules,
    dry_run: bool,
) -> Result<String, String> {
    let _ = tx.blocking_send(JobUpdate {
        job_id: job_id.clone(),
        status: JobStatus::InProgress(0),
    });

    let api = connector.connect().map_err(|e| e.to_string())?;
    run_archive(&api, rules, Utc::now(), dry_run, |done| {
        let _ = tx.blocking_send(JobUpdate {
            job_id: job_id.clone(),
            status: JobStatus::InProgress(u32::try_from(done).unwrap_or(u32::MAX)),
        });
    })
    .map_err(|e| e.to_string())
}

pub(crate) async fn process<C: Connect>(
    state: web::Data<JobsState>,
    connector: web::Data<C>,
    rules: web::Data<AuditRules>,
    req: Option<web::Json<StartArchiveRequest>>,
) -> impl Responder {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    match schedule_archive_job(state, connector, rules, req).await {
        Ok(job_id) => HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id })),
        Err(err) => HttpResponse::InternalServerError().body(err),
    }
}

async fn schedule_archive_job<C: Connect>(
    state: web::Data<JobsState>,
    connector: web::Data<C>,
    rules: web::Data<AuditRules>,
    req: StartArchiveRequest,
) -> Result<String, String> {
    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let connector = connector.into_inner();
    let rules = rules.into_inner();
    let job_id_clone = job_id.clone();

    tokio::spawn(async move {
        let tx_block = tx.clone();
        let job_id_for_blocking = job_id_clone.clone();
        let handle = tokio::task::spawn_blocking(move || {
            archive_blocking(tx_block, job_id_for_blocking, &*connector, &rules, req.dry_run)
        });

        let status = match handle.await {
            Ok(Ok(summary)) => {
                log::info!("{}", summary);
                JobStatus::Completed(summary)
            }
            Ok(Err(e)) => {
                log::error!("Archive job {} failed: {}", job_id_clone, e);
                JobStatus::Failed(e)
            }
            Err(join_err) => JobStatus::Failed(format!("join error: {}", join_err)),
        };
        let _ = tx
            .send(JobUpdate {
                job_id: job_id_clone,
                status,
            })
            .await;
    });

    Ok(job_id)
}
