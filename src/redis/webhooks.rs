use std::fmt::Display;

use actix::prelude::*;
use anyhow::Result;
use bincode::serialize;
use log::warn;
use r2d2_redis::redis::{cmd, pipe, Commands, Connection};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;
use crate::models::{NewWebhook, Webhook};
use crate::redis::executor::RedisExecutor;
use crate::redis::records::*;
use crate::store::{DuplicateUrl, WebhookStore};
use crate::webhook::{self, Notification};

const WEBHOOK_IDS: &str = "webhooks";
const WEBHOOK_URLS: &str = "webhook-urls";
const WEBHOOK_SEQUENCE: &str = "webhook-sequence";

fn webhook_key(id: impl Display) -> String {
    format!("webhook:{}", id)
}

#[derive(Serialize, Deserialize, Debug)]
struct RedisWebhookRecord {
    url: String,
    min_trigger_value: u64,
    cursor: u64,
}

impl RedisWebhookRecord {
    fn into_webhook(self, id: RecordId) -> Webhook {
        Webhook {
            id,
            url: self.url,
            min_trigger_value: self.min_trigger_value as usize,
            cursor: self.cursor as usize,
        }
    }
}

impl WebhookStore for Connection {
    fn insert_webhook(&mut self, webhook: NewWebhook) -> Result<Webhook> {
        let id = next_id(self, WEBHOOK_SEQUENCE)?;

        let value = serialize(&RedisWebhookRecord {
            url: webhook.url.clone(),
            min_trigger_value: webhook.min_trigger_value as u64,
            cursor: webhook.cursor as u64,
        })?;

        let claimed: bool = self.hset_nx(WEBHOOK_URLS, &webhook.url, id.to_string())?;
        if !claimed {
            return Err(DuplicateUrl {
                kind: "webhook",
                url: webhook.url,
            }
            .into());
        }

        let stored = pipe()
            .atomic()
            .set(webhook_key(id), value)
            .ignore()
            .rpush(WEBHOOK_IDS, id.to_string())
            .ignore()
            .query::<()>(self);

        if let Err(error) = stored {
            release_url(self, WEBHOOK_URLS, &webhook.url);
            return Err(error.into());
        }

        Ok(Webhook::from_new(id, webhook))
    }

    fn find_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
        Ok(read_record::<RedisWebhookRecord>(self, &webhook_key(id))?
            .map(|record| record.into_webhook(id)))
    }

    fn delete_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
        let webhook = match self.find_webhook(id)? {
            Some(webhook) => webhook,
            None => return Ok(None),
        };

        pipe()
            .atomic()
            .del(webhook_key(id))
            .ignore()
            .lrem(WEBHOOK_IDS, 0, id.to_string())
            .ignore()
            .hdel(WEBHOOK_URLS, &webhook.url)
            .ignore()
            .query::<()>(self)?;

        Ok(Some(webhook))
    }

    fn webhooks(&mut self) -> Result<Vec<Webhook>> {
        let ids = read_ids(self, WEBHOOK_IDS)?;
        let keys: Vec<String> = ids.iter().map(webhook_key).collect();
        let records = read_records::<RedisWebhookRecord>(self, &keys)?;

        Ok(ids
            .into_iter()
            .zip(records)
            .filter_map(|(id, record)| record.map(|record| record.into_webhook(id)))
            .collect())
    }

    fn claim_webhook_batch(&mut self, id: RecordId, from: usize, to: usize) -> Result<bool> {
        let key = webhook_key(id);

        cmd("WATCH").arg(&key).query::<()>(self)?;

        let claimed = try_claim(self, &key, from, to);
        if !matches!(claimed, Ok(true)) {
            // EXEC was not reached or did not succeed, the WATCH must not
            // leak into later transactions on this pooled connection
            if let Err(error) = cmd("UNWATCH").query::<()>(self) {
                warn!("Could not unwatch {}: {}", key, error);
            }
        }

        claimed
    }
}

/// Runs with `key` watched: a concurrent claim or unsubscribe aborts the
/// transaction and nothing is written.
fn try_claim(conn: &mut Connection, key: &str, from: usize, to: usize) -> Result<bool> {
    let mut record = match read_record::<RedisWebhookRecord>(conn, key)? {
        Some(record) if record.cursor == from as u64 => record,
        _ => return Ok(false),
    };

    record.cursor = to as u64;

    let committed: Option<()> = pipe()
        .atomic()
        .set(key, serialize(&record)?)
        .ignore()
        .query(conn)?;

    Ok(committed.is_some())
}

pub struct InsertWebhook {
    pub url: String,
    pub min_trigger_value: usize,
}

impl Message for InsertWebhook {
    type Result = Result<Webhook>;
}

impl Handler<InsertWebhook> for RedisExecutor {
    type Result = Result<Webhook>;

    fn handle(&mut self, msg: InsertWebhook, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        webhook::subscribe(&mut *conn, msg.url, msg.min_trigger_value)
    }
}

pub struct ReadWebhook(pub RecordId);

impl Message for ReadWebhook {
    type Result = Result<Option<Webhook>>;
}

impl Handler<ReadWebhook> for RedisExecutor {
    type Result = Result<Option<Webhook>>;

    fn handle(&mut self, msg: ReadWebhook, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.find_webhook(msg.0)
    }
}

pub struct DeleteWebhook(pub RecordId);

impl Message for DeleteWebhook {
    type Result = Result<Option<Webhook>>;
}

impl Handler<DeleteWebhook> for RedisExecutor {
    type Result = Result<Option<Webhook>>;

    fn handle(&mut self, msg: DeleteWebhook, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        conn.delete_webhook(msg.0)
    }
}

/// Claims the batches that are due, see `webhook::collect_due()`.
pub struct ClaimDueWebhooks;

impl Message for ClaimDueWebhooks {
    type Result = Result<Vec<Notification>>;
}

impl Handler<ClaimDueWebhooks> for RedisExecutor {
    type Result = Result<Vec<Notification>>;

    fn handle(&mut self, _msg: ClaimDueWebhooks, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.pool.get()?;
        webhook::collect_due(&mut *conn)
    }
}
