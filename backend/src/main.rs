mod config;
mod error;
mod job_controller;
mod services;

use crate::config::{AppConfig, MetabaseConfig};
use crate::job_controller::state::JobsState;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let url = format!("http://{}:{}", config.host, config.port);
    info!(
        "Auditing cards of {} ({} known databases)",
        config.metabase.base_url,
        config.rules.databases.len()
    );

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(100);

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    info!("Server running at {}", url);

    let bind = (config.host.clone(), config.port);
    let connector = web::Data::new(config.metabase);
    let rules = web::Data::new(config.rules);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(connector.clone())
            .app_data(rules.clone())
            .service(services::cards::configure_routes::<MetabaseConfig>())
    })
    .bind(bind)?
    .run()
    .await
}
