use std::fmt::Display;

use actix::prelude::*;
use anyhow::{anyhow, Result};
use bincode::serialize;
use chrono::{Datelike, NaiveDate};
use log::info;
use r2d2_redis::redis::{pipe, transaction, Commands, Connection};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;
use crate::models::{NewTrack, Track};
use crate::redis::executor::RedisExecutor;
use crate::redis::records::*;
use crate::store::{DuplicateUrl, TrackStore};
use crate::ticker::{self, Ticker};

/// List of all track ids in insertion order
const TRACK_IDS: &str = "tracks";
/// Hash of source URL → track id, guards the URL uniqueness
const TRACK_URLS: &str = "track-urls";
const TRACK_SEQUENCE: &str = "track-sequence";

fn track_key(id: impl Display) -> String {
    format!("track:{}", id)
}

#[derive(Serialize, Deserialize, Debug)]
struct RedisTrackRecord {
    /// days since 0001-01-01
    date: i32,
    pilot: String,
    glider: String,
    glider_id: String,
    track_length: f64,
    track_src_url: String,
}

impl RedisTrackRecord {
    fn from_new(track: &NewTrack) -> Self {
        RedisTrackRecord {
            date: track.date.num_days_from_ce(),
            pilot: track.pilot.clone(),
            glider: track.glider.clone(),
            glider_id: track.glider_id.clone(),
            track_length: track.track_length,
            track_src_url: track.track_src_url.clone(),
        }
    }

    fn into_track(self, id: RecordId) -> Result<Track> {
        let date = NaiveDate::from_num_days_from_ce_opt(self.date)
            .ok_or_else(|| anyhow!("invalid date in track record {}", id))?;

        Ok(Track {
            id,
            date,
            pilot: self.pilot,
            glider: self.glider,
            glider_id: self.glider_id,
            track_length: self.track_length,
            track_src_url: self.track_src_url,
        })
    }
}

fn read_tracks(conn: &mut Connection, ids: Vec<RecordId>) -> Result<Vec<Track>> {
    let keys: Vec<String> = ids.iter().map(track_key).collect();
    let records = read_records::<RedisTrackRecord>(conn, &keys)?;

    let mut tracks = Vec::with_capacity(records.len());
    // records without value were deleted in the meantime
    for (id, record) in ids.into_iter().zip(records) {
        if let Some(record) = record {
            tracks.push(record.into_track(id)?);
        }
    }

    Ok(tracks)
}

impl TrackStore for Connection {
    fn insert_track(&mut self, track: NewTrack) -> Result<Track> {
        let id = next_id(self, TRACK_SEQUENCE)?;
        let value = serialize(&RedisTrackRecord::from_new(&track))?;

        let claimed: bool = self.hset_nx(TRACK_URLS, &track.track_src_url, id.to_string())?;
        if !claimed {
            return Err(DuplicateUrl {
                kind: "track",
                url: track.track_src_url,
            }
            .into());
        }

        let stored = pipe()
            .atomic()
            .set(track_key(id), value)
            .ignore()
            .rpush(TRACK_IDS, id.to_string())
            .ignore()
            .query::<()>(self);

        if let Err(error) = stored {
            release_url(self, TRACK_URLS, &track.track_src_url);
            return Err(error.into());
        }

        Ok(Track::from_new(id, track))
    }

    fn find_track(&mut self, id: RecordId) -> Result<Option<Track>> {
        read_record::<RedisTrackRecord>(self, &track_key(id))?
            .map(|record| record.into_track(id))
            .transpose()
    }

    fn count_tracks(&mut self) -> Result<usize> {
        Ok(self.llen(TRACK_IDS)?)
    }

    fn track_ids(&mut self) -> Result<Vec<RecordId>> {
        read_ids(self, TRACK_IDS)
    }

    fn tracks_since(&mut self, timestamp: i64) -> Result<Vec<Track>> {
        // the ids carry their creation time, only matching records are loaded
        let ids = read_ids(self, TRACK_IDS)?
            .into_iter()
            .filter(|id| id.timestamp() > timestamp)
            .collect();

        read_tracks(self, ids)
    }

    fn latest_track(&mut self) -> Result<Option<Track>> {
        let last: Option<String> = self.lindex(TRACK_IDS, -1)?;
        match last {
            Some(id) => self.find_track(id.parse()?),
            None => Ok(None),
        }
    }

    fn delete_all_tracks(&mut self) -> Result<usize> {
        // retried until no insert touched the id list in between
        let count = transaction(self, &[TRACK_IDS], |conn, pipeline| {
            let ids: Vec<String> = conn.lrange(TRACK_IDS, 0, -1)?;

            pipeline.del(TRACK_IDS).ignore().del(TRACK_URLS).ignore();
            for id in &ids {
                pipeline.del(track_key(id)).ignore();
            }

            let committed: Option<()> = pipeline.query(conn)?;
            Ok(committed.map(|_| ids.len()))
        })?;

        Ok(count)
    }
}

pub struct InsertTrack(pub NewTrack);

impl Message for InsertTrack {
    type Result = Result<Track>;
}

impl Handler<InsertTrack> for RedisExecutor {
    type Result = Result<Track>;

    fn handle(&mut self, msg: InsertTrack, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.insert_track(msg.0)
    }
}

pub struct ReadTrack(pub RecordId);

impl Message for ReadTrack {
    type Result = Result<Option<Track>>;
}

impl Handler<ReadTrack> for RedisExecutor {
    type Result = Result<Option<Track>>;

    fn handle(&mut self, msg: ReadTrack, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.find_track(msg.0)
    }
}

pub struct ReadTrackIds;

impl Message for ReadTrackIds {
    type Result = Result<Vec<RecordId>>;
}

impl Handler<ReadTrackIds> for RedisExecutor {
    type Result = Result<Vec<RecordId>>;

    fn handle(&mut self, _msg: ReadTrackIds, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.track_ids()
    }
}

pub struct CountTracks;

impl Message for CountTracks {
    type Result = Result<usize>;
}

impl Handler<CountTracks> for RedisExecutor {
    type Result = Result<usize>;

    fn handle(&mut self, _msg: CountTracks, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.count_tracks()
    }
}

pub struct DeleteAllTracks;

impl Message for DeleteAllTracks {
    type Result = Result<usize>;
}

impl Handler<DeleteAllTracks> for RedisExecutor {
    type Result = Result<usize>;

    fn handle(&mut self, _msg: DeleteAllTracks, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;

        info!("Deleting all tracks from redis…");
        let count = conn.delete_all_tracks()?;
        info!("Deleted {} tracks from redis", count);

        Ok(count)
    }
}

pub struct ReadTicker {
    pub cap: usize,
    pub since: i64,
}

impl Message for ReadTicker {
    type Result = Result<Option<Ticker>>;
}

impl Handler<ReadTicker> for RedisExecutor {
    type Result = Result<Option<Ticker>>;

    fn handle(&mut self, msg: ReadTicker, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        ticker::since(&mut *conn, msg.cap, msg.since)
    }
}

pub struct ReadLatestTimestamp;

impl Message for ReadLatestTimestamp {
    type Result = Result<Option<i64>>;
}

impl Handler<ReadLatestTimestamp> for RedisExecutor {
    type Result = Result<Option<i64>>;

    fn handle(&mut self, _msg: ReadLatestTimestamp, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        ticker::latest(&mut *conn)
    }
}
