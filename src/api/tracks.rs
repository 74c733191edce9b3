use actix_web::client::Client;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::api::{parse_id, plain_text};
use crate::app::AppState;
use crate::error::Error;
use crate::ids::RecordId;
use crate::ingest;
use crate::models::Track;
use crate::redis::{ReadTrack, ReadTrackIds};

#[derive(Deserialize, Debug)]
pub struct TrackRequest {
    url: Option<String>,
}

#[derive(Serialize)]
struct IdResponse {
    id: RecordId,
}

#[derive(Serialize)]
struct TrackResponse<'a> {
    #[serde(rename = "H_date")]
    date: String,
    pilot: &'a str,
    glider: &'a str,
    glider_id: &'a str,
    track_length: f64,
    track_src_url: &'a str,
}

impl<'a> From<&'a Track> for TrackResponse<'a> {
    fn from(track: &'a Track) -> Self {
        TrackResponse {
            date: track.date.to_string(),
            pilot: &track.pilot,
            glider: &track.glider,
            glider_id: &track.glider_id,
            track_length: track.track_length,
            track_src_url: &track.track_src_url,
        }
    }
}

pub async fn post(
    state: web::Data<AppState>,
    client: web::Data<Client>,
    body: web::Json<TrackRequest>,
) -> Result<HttpResponse, Error> {
    let url = body.into_inner().url.unwrap_or_default();
    let track = ingest::ingest(&state, &client, &url).await?;

    Ok(HttpResponse::Ok().json(IdResponse { id: track.id }))
}

pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let ids = state.redis.send(ReadTrackIds).await??;
    Ok(HttpResponse::Ok().json(ids))
}

async fn find(state: &AppState, raw_id: &str) -> Result<Track, Error> {
    let id = parse_id(raw_id)?;

    state
        .redis
        .send(ReadTrack(id))
        .await??
        .ok_or_else(|| Error::NotFound(format!("track {} not found", id)))
}

pub async fn get(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse, Error> {
    let track = find(&state, &id).await?;
    Ok(HttpResponse::Ok().json(TrackResponse::from(&track)))
}

pub async fn get_field(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, Error> {
    let (id, field) = path.into_inner();
    let track = find(&state, &id).await?;

    track
        .field(&field)
        .map(plain_text)
        .ok_or_else(|| Error::NotFound(format!("unknown field {:?}", field)))
}
