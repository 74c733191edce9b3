use std::collections::HashMap;

use anyhow::Result;

use crate::ids::RecordId;
use crate::models::{NewTrack, NewWebhook, Track, Webhook};
use crate::store::{DuplicateUrl, TrackStore, WebhookStore};

/// `Vec`-backed store with a manually controlled clock.
pub struct MemoryStore {
    now: u32,
    sequence: u64,
    tracks: Vec<Track>,
    webhooks: Vec<Webhook>,
}

impl MemoryStore {
    pub fn new(now: u32) -> Self {
        MemoryStore {
            now,
            sequence: 0,
            tracks: Vec::new(),
            webhooks: Vec::new(),
        }
    }

    pub fn advance(&mut self, seconds: u32) {
        self.now += seconds;
    }

    fn next_id(&mut self) -> RecordId {
        self.sequence += 1;
        RecordId::new(self.now, self.sequence)
    }
}

impl TrackStore for MemoryStore {
    fn insert_track(&mut self, track: NewTrack) -> Result<Track> {
        if self.tracks.iter().any(|it| it.track_src_url == track.track_src_url) {
            return Err(DuplicateUrl {
                kind: "track",
                url: track.track_src_url,
            }
            .into());
        }

        let track = Track::from_new(self.next_id(), track);
        self.tracks.push(track.clone());
        Ok(track)
    }

    fn find_track(&mut self, id: RecordId) -> Result<Option<Track>> {
        Ok(self.tracks.iter().find(|it| it.id == id).cloned())
    }

    fn count_tracks(&mut self) -> Result<usize> {
        Ok(self.tracks.len())
    }

    fn track_ids(&mut self) -> Result<Vec<RecordId>> {
        Ok(self.tracks.iter().map(|it| it.id).collect())
    }

    fn tracks_since(&mut self, timestamp: i64) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .iter()
            .filter(|it| it.id.timestamp() > timestamp)
            .cloned()
            .collect())
    }

    fn latest_track(&mut self) -> Result<Option<Track>> {
        Ok(self.tracks.last().cloned())
    }

    fn delete_all_tracks(&mut self) -> Result<usize> {
        let count = self.tracks.len();
        self.tracks.clear();
        Ok(count)
    }
}

impl WebhookStore for MemoryStore {
    fn insert_webhook(&mut self, webhook: NewWebhook) -> Result<Webhook> {
        if self.webhooks.iter().any(|it| it.url == webhook.url) {
            return Err(DuplicateUrl {
                kind: "webhook",
                url: webhook.url,
            }
            .into());
        }

        let webhook = Webhook::from_new(self.next_id(), webhook);
        self.webhooks.push(webhook.clone());
        Ok(webhook)
    }

    fn find_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
        Ok(self.webhooks.iter().find(|it| it.id == id).cloned())
    }

    fn delete_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
        let index = self.webhooks.iter().position(|it| it.id == id);
        Ok(index.map(|index| self.webhooks.remove(index)))
    }

    fn webhooks(&mut self) -> Result<Vec<Webhook>> {
        Ok(self.webhooks.clone())
    }

    fn claim_webhook_batch(&mut self, id: RecordId, from: usize, to: usize) -> Result<bool> {
        match self.webhooks.iter_mut().find(|it| it.id == id) {
            Some(webhook) if webhook.cursor == from => {
                webhook.cursor = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::MemoryStore;
    use crate::models::{NewTrack, NewWebhook};
    use crate::store::{DuplicateUrl, TrackStore, WebhookStore};

    fn new_track(url: &str) -> NewTrack {
        NewTrack {
            date: NaiveDate::from_ymd_opt(2018, 10, 8).unwrap(),
            pilot: "Pilot".to_string(),
            glider: "ASW 28".to_string(),
            glider_id: "D-2828".to_string(),
            track_length: 3.,
            track_src_url: url.to_string(),
        }
    }

    #[test]
    fn test_duplicate_track_url() {
        let mut store = MemoryStore::new(1_539_000_000);
        let first = store.insert_track(new_track("http://a.igc")).unwrap();

        let error = store.insert_track(new_track("http://a.igc")).unwrap_err();
        let duplicate = error.downcast_ref::<DuplicateUrl>().unwrap();
        assert_eq!(duplicate.kind, "track");
        assert_eq!(duplicate.url, "http://a.igc");

        assert_eq!(store.count_tracks().unwrap(), 1);
        assert_eq!(store.track_ids().unwrap(), vec![first.id]);
    }

    #[test]
    fn test_ids_increase_with_time() {
        let mut store = MemoryStore::new(1_539_000_000);
        let first = store.insert_track(new_track("http://a.igc")).unwrap();
        store.advance(2);
        let second = store.insert_track(new_track("http://b.igc")).unwrap();

        assert!(first.id < second.id);
        assert_eq!(store.latest_track().unwrap(), Some(second));
    }

    #[test]
    fn test_delete_all_keeps_webhooks() {
        let mut store = MemoryStore::new(1_539_000_000);
        store.insert_track(new_track("http://a.igc")).unwrap();
        store.insert_track(new_track("http://b.igc")).unwrap();
        let webhook = store
            .insert_webhook(NewWebhook {
                url: "http://hook".to_string(),
                min_trigger_value: 1,
                cursor: 2,
            })
            .unwrap();

        assert_eq!(store.delete_all_tracks().unwrap(), 2);
        assert_eq!(store.count_tracks().unwrap(), 0);
        assert_eq!(store.latest_track().unwrap(), None);
        assert_eq!(store.find_webhook(webhook.id).unwrap().unwrap().cursor, 2);
    }

    #[test]
    fn test_delete_webhook() {
        let mut store = MemoryStore::new(1_539_000_000);
        let webhook = store
            .insert_webhook(NewWebhook {
                url: "http://hook".to_string(),
                min_trigger_value: 2,
                cursor: 0,
            })
            .unwrap();

        assert_eq!(store.delete_webhook(webhook.id).unwrap(), Some(webhook.clone()));
        assert_eq!(store.delete_webhook(webhook.id).unwrap(), None);
        assert!(!store.claim_webhook_batch(webhook.id, 0, 2).unwrap());
    }

    #[test]
    fn test_claim_needs_current_cursor() {
        let mut store = MemoryStore::new(1_539_000_000);
        let webhook = store
            .insert_webhook(NewWebhook {
                url: "http://hook".to_string(),
                min_trigger_value: 1,
                cursor: 0,
            })
            .unwrap();

        assert!(store.claim_webhook_batch(webhook.id, 0, 1).unwrap());
        assert!(store.claim_webhook_batch(webhook.id, 1, 2).unwrap());

        // an outdated cursor never moves it back
        assert!(!store.claim_webhook_batch(webhook.id, 0, 1).unwrap());
        assert_eq!(store.find_webhook(webhook.id).unwrap().unwrap().cursor, 2);
    }
}
