use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

use crate::app::AppState;

#[derive(Serialize)]
struct Info {
    uptime: String,
    info: &'static str,
    version: &'static str,
}

pub async fn get(state: web::Data<AppState>) -> HttpResponse {
    let uptime = Utc::now().signed_duration_since(state.started_at);

    HttpResponse::Ok().json(Info {
        uptime: uptime.to_string(),
        info: "Service for IGC tracks.",
        version: "v1",
    })
}
