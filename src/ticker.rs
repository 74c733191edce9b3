use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use crate::ids::RecordId;
use crate::store::TrackStore;

/// Answer to a "what changed since `T`" query.
#[derive(Debug, Serialize, PartialEq)]
pub struct Ticker {
    /// Creation time of the newest track in the store
    pub t_latest: i64,
    /// Newest creation time within `tracks`
    pub t_start: i64,
    /// Oldest creation time within `tracks`
    pub t_stop: i64,
    pub tracks: Vec<RecordId>,
    /// Time spent answering the query in milliseconds
    pub processing: u64,
}

/// Returns up to `cap` tracks created strictly after `since`.
///
/// The tracks are taken in scan order and are not sorted before the cap is
/// applied, so `t_start` and `t_stop` only describe the returned batch.
/// Returns `None` if no track qualifies.
pub fn since<S: TrackStore>(store: &mut S, cap: usize, since: i64) -> Result<Option<Ticker>> {
    let started = Instant::now();

    if cap == 0 {
        return Ok(None);
    }

    let tracks: Vec<RecordId> = store
        .tracks_since(since)?
        .into_iter()
        .take(cap)
        .map(|track| track.id)
        .collect();

    if tracks.is_empty() {
        return Ok(None);
    }

    let t_latest = match store.latest_track()? {
        Some(track) => track.id.timestamp(),
        None => return Ok(None),
    };

    let t_start = tracks.iter().map(RecordId::timestamp).max().unwrap_or(since);
    let t_stop = tracks.iter().map(RecordId::timestamp).min().unwrap_or(since);

    Ok(Some(Ticker {
        t_latest,
        t_start,
        t_stop,
        tracks,
        processing: started.elapsed().as_millis() as u64,
    }))
}

/// Creation time of the newest track, if there is one.
pub fn latest<S: TrackStore>(store: &mut S) -> Result<Option<i64>> {
    Ok(store.latest_track()?.map(|track| track.id.timestamp()))
}
