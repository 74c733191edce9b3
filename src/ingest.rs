use actix_web::client::Client;
use actix_web::http::Uri;
use log::{debug, info};

use crate::app::AppState;
use crate::error::Error;
use crate::geo::track_length;
use crate::igc::{self, IgcTrack};
use crate::models::{NewTrack, Track};
use crate::redis::InsertTrack;
use crate::webhook;

/// Checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<Uri, Error> {
    if url.trim().is_empty() {
        return Err(Error::BadRequest("missing URL".to_string()));
    }

    let uri: Uri = url
        .parse()
        .map_err(|error| Error::BadRequest(format!("invalid URL {:?}: {}", url, error)))?;

    let is_http = matches!(uri.scheme_str(), Some("http") | Some("https"));
    if !is_http || uri.host().is_none() {
        return Err(Error::BadRequest(format!(
            "invalid URL {:?}: expected an absolute http(s) URL",
            url
        )));
    }

    Ok(uri)
}

pub fn new_track(track_src_url: String, igc: &IgcTrack) -> NewTrack {
    NewTrack {
        date: igc.date,
        pilot: igc.pilot.clone(),
        glider: igc.glider_type.clone(),
        glider_id: igc.glider_id.clone(),
        track_length: track_length(&igc.points()),
        track_src_url,
    }
}

/// Downloads, measures and stores the track at `url`, then runs a webhook
/// dispatch sweep.
///
/// The sweep never fails the ingestion, its errors are only logged.
pub async fn ingest(state: &AppState, client: &Client, url: &str) -> Result<Track, Error> {
    validate_url(url)?;

    let igc = igc::download(client, url, state.config.http_timeout)
        .await
        .map_err(|error| Error::BadRequest(format!("{:#}", error)))?;

    debug!(
        "Parsed {} fixes for {}, max. altitude {}m",
        igc.fixes.len(),
        url,
        igc.fixes.iter().map(|fix| fix.gnss_altitude).max().unwrap_or(0),
    );

    let track = state
        .redis
        .send(InsertTrack(new_track(url.to_owned(), &igc)))
        .await??;

    info!(
        "Added track {} ({:.1} km by {:?})",
        track.id, track.track_length, track.pilot
    );

    webhook::dispatch(&state.redis, client, state.config.http_timeout).await;

    Ok(track)
}
