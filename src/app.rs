use actix::prelude::*;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};

use crate::api;
use crate::config::Config;
use crate::redis::RedisExecutor;

pub struct AppState {
    pub redis: Addr<RedisExecutor>,
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/paragliding", web::get().to(redirect_to_api))
        .service(
            web::scope("/paragliding/api")
                .route("", web::get().to(api::info::get))
                .route("/track", web::post().to(api::tracks::post))
                .route("/track", web::get().to(api::tracks::list))
                .route("/track/{id}", web::get().to(api::tracks::get))
                .route("/track/{id}/{field}", web::get().to(api::tracks::get_field))
                .route("/ticker/latest", web::get().to(api::ticker::latest))
                .route("/ticker", web::get().to(api::ticker::get))
                .route("/ticker/{timestamp}", web::get().to(api::ticker::since))
                .route("/webhook/new_track", web::post().to(api::webhooks::post))
                .route("/webhook/new_track/{id}", web::get().to(api::webhooks::get))
                .route("/webhook/new_track/{id}", web::delete().to(api::webhooks::delete)),
        )
        .service(
            web::scope("/admin/api")
                .route("/tracks_count", web::get().to(api::admin::count))
                .route("/tracks", web::delete().to(api::admin::delete_all)),
        );
}

async fn redirect_to_api() -> HttpResponse {
    HttpResponse::SeeOther()
        .header("LOCATION", "/paragliding/api")
        .finish()
}
