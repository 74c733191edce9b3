use anyhow::Result;
use thiserror::Error;

use crate::ids::RecordId;
use crate::models::{NewTrack, NewWebhook, Track, Webhook};

#[cfg(test)]
pub mod memory;

/// Raised by the stores when a unique URL is inserted a second time.
///
/// Travels inside `anyhow::Error`, callers find it again via `downcast_ref()`.
#[derive(Debug, Error, PartialEq)]
#[error("{kind} with URL {url} already exists")]
pub struct DuplicateUrl {
    pub kind: &'static str,
    pub url: String,
}

pub trait TrackStore {
    /// Stores a new track and returns it together with its generated id.
    fn insert_track(&mut self, track: NewTrack) -> Result<Track>;

    fn find_track(&mut self, id: RecordId) -> Result<Option<Track>>;

    fn count_tracks(&mut self) -> Result<usize>;

    /// All track ids in scan (insertion) order.
    fn track_ids(&mut self) -> Result<Vec<RecordId>>;

    /// Tracks created strictly after `timestamp`, in scan order.
    fn tracks_since(&mut self, timestamp: i64) -> Result<Vec<Track>>;

    /// The most recently inserted track.
    fn latest_track(&mut self) -> Result<Option<Track>>;

    /// Removes every track and returns how many there were.
    fn delete_all_tracks(&mut self) -> Result<usize>;
}

pub trait WebhookStore {
    fn insert_webhook(&mut self, webhook: NewWebhook) -> Result<Webhook>;

    fn find_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>>;

    /// Removes the webhook and returns it, if it existed.
    fn delete_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>>;

    /// All webhooks in subscription order.
    fn webhooks(&mut self) -> Result<Vec<Webhook>>;

    /// Moves the cursor from `from` to `to`, but only if it still is at
    /// `from` and the webhook still exists. Returns whether the move happened.
    fn claim_webhook_batch(&mut self, id: RecordId, from: usize, to: usize) -> Result<bool>;
}
