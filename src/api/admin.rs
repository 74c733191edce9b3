use actix_web::{web, HttpResponse};

use crate::api::plain_text;
use crate::app::AppState;
use crate::error::Error;
use crate::redis::{CountTracks, DeleteAllTracks};

pub async fn count(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let count = state.redis.send(CountTracks).await??;
    Ok(plain_text(count.to_string()))
}

pub async fn delete_all(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let count = state.redis.send(DeleteAllTracks).await??;
    Ok(plain_text(count.to_string()))
}
