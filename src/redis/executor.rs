use actix::prelude::*;
use anyhow::Result;
use log::info;
use r2d2_redis::r2d2::Pool;
use r2d2_redis::RedisConnectionManager;

/// Synchronous actor owning the redis connection pool.
///
/// Runs on a `SyncArbiter`, the message handlers live next to the data they
/// operate on (`tracks.rs`, `webhooks.rs`).
pub struct RedisExecutor {
    pub pool: Pool<RedisConnectionManager>,
}

impl RedisExecutor {
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        RedisExecutor { pool }
    }
}

impl Actor for RedisExecutor {
    type Context = SyncContext<Self>;
}

pub fn create_pool(url: &str) -> Result<Pool<RedisConnectionManager>> {
    info!("Connecting to redis at {}…", url);
    let manager = RedisConnectionManager::new(url)?;
    Ok(Pool::builder().build(manager)?)
}
