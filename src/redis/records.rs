use anyhow::Result;
use bincode::deserialize;
use chrono::Utc;
use log::error;
use r2d2_redis::redis::{pipe, Commands, Connection};
use serde::de::DeserializeOwned;

use crate::ids::RecordId;

/// Current unix time in seconds, the time part of new ids.
pub fn now() -> u32 {
    Utc::now().timestamp() as u32
}

/// Creates a new id from the time and the sequence counter at `sequence_key`.
pub fn next_id(conn: &mut Connection, sequence_key: &str) -> Result<RecordId> {
    let sequence: u64 = conn.incr(sequence_key, 1)?;
    Ok(RecordId::new(now(), sequence))
}

/// Drops the claim on `url` in the hash at `urls_key`, for inserts that
/// claimed the URL but could not store their record.
pub fn release_url(conn: &mut Connection, urls_key: &str, url: &str) {
    if let Err(err) = conn.hdel::<_, _, ()>(urls_key, url) {
        error!("Could not release {} in {}: {}", url, urls_key, err);
    }
}

/// Reads the id list at `key`, in list order.
pub fn read_ids(conn: &mut Connection, key: &str) -> Result<Vec<RecordId>> {
    let raw: Vec<String> = conn.lrange(key, 0, -1)?;

    let mut ids = Vec::with_capacity(raw.len());
    for id in raw {
        ids.push(id.parse()?);
    }

    Ok(ids)
}

pub fn read_record<T: DeserializeOwned>(conn: &mut Connection, key: &str) -> Result<Option<T>> {
    let value: Option<Vec<u8>> = conn.get(key)?;
    match value {
        Some(bytes) => Ok(Some(deserialize(&bytes)?)),
        None => Ok(None),
    }
}

/// Reads many records in a single round trip. Missing keys yield `None`.
pub fn read_records<T: DeserializeOwned>(
    conn: &mut Connection,
    keys: &[String],
) -> Result<Vec<Option<T>>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut pipeline = pipe();
    for key in keys {
        pipeline.get(key);
    }

    let values: Vec<Option<Vec<u8>>> = pipeline.query(conn)?;

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        records.push(match value {
            Some(bytes) => Some(deserialize(&bytes)?),
            None => None,
        });
    }

    Ok(records)
}

/// Connection to database `db` of a redis server on localhost, emptied
/// before it is handed out.
#[cfg(test)]
pub fn scratch_connection(db: u8) -> Connection {
    let url = format!("redis://127.0.0.1/{}", db);
    let client = r2d2_redis::redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_connection().unwrap();
    r2d2_redis::redis::cmd("FLUSHDB").query::<()>(&mut conn).unwrap();
    conn
}
