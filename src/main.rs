#[cfg(test)]
#[macro_use]
extern crate approx;

use std::env;

use actix::prelude::*;
use actix_web::client::Client;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use chrono::Utc;
use log::info;

mod api;
mod app;
mod config;
mod error;
mod geo;
mod ids;
mod igc;
mod ingest;
mod models;
mod redis;
mod store;
mod ticker;
mod webhook;

#[actix_web::main]
async fn main() -> Result<()> {
    let mut log_builder = pretty_env_logger::formatted_builder();
    log_builder.parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    let logger = sentry::integrations::log::LogIntegration::default()
        .with_env_logger_dest(Some(log_builder.build()));

    let _sentry = sentry::init(sentry::ClientOptions::new().add_integration(logger));

    let matches = config::app().get_matches();
    let config = config::Config::from_matches(&matches)?;

    let pool = redis::create_pool(&config.redis_url)?;
    let redis_executor_addr = SyncArbiter::start(config.redis_threads, move || {
        redis::RedisExecutor::new(pool.clone())
    });

    let listen_address = config.listen_address();
    let http_timeout = config.http_timeout;

    let state = web::Data::new(app::AppState {
        redis: redis_executor_addr,
        config,
        started_at: Utc::now(),
    });

    info!("Starting HTTP server on {}…", listen_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .data(Client::builder().timeout(http_timeout).finish())
            .wrap(middleware::Logger::default())
            .configure(app::configure)
    })
    .bind(&listen_address)?
    .run()
    .await?;

    Ok(())
}
