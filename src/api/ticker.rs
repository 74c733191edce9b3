use actix_web::{web, HttpResponse};

use crate::api::plain_text;
use crate::app::AppState;
use crate::error::Error;
use crate::redis::{ReadLatestTimestamp, ReadTicker};

pub async fn latest(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    Ok(match state.redis.send(ReadLatestTimestamp).await?? {
        Some(timestamp) => plain_text(timestamp.to_string()),
        None => HttpResponse::NoContent().finish(),
    })
}

pub async fn get(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    respond(&state, 0).await
}

pub async fn since(
    state: web::Data<AppState>,
    timestamp: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let since = timestamp
        .parse::<i64>()
        .map_err(|_| Error::BadRequest("Couldn't parse timestamp".to_string()))?;

    respond(&state, since).await
}

async fn respond(state: &AppState, since: i64) -> Result<HttpResponse, Error> {
    let cap = state.config.ticker_cap;

    Ok(match state.redis.send(ReadTicker { cap, since }).await?? {
        Some(ticker) => HttpResponse::Ok().json(ticker),
        None => HttpResponse::NoContent().finish(),
    })
}
