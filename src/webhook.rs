use std::time::{Duration, Instant};

use actix::Addr;
use actix_web::client::Client;
use anyhow::{anyhow, bail, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::ids::RecordId;
use crate::models::{NewWebhook, Webhook};
use crate::redis::{ClaimDueWebhooks, RedisExecutor};
use crate::store::{TrackStore, WebhookStore};

/// A batch of new tracks that is due for one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub webhook_id: RecordId,
    pub url: String,
    pub t_latest: i64,
    pub tracks: Vec<RecordId>,
    /// Time spent collecting the batch in milliseconds
    pub processing: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Payload {
    pub text: String,
}

impl Notification {
    pub fn payload(&self) -> Payload {
        Payload {
            text: format!(
                "Latest timestamp: {}, {} new tracks are: {} (processing: {}ms)",
                self.t_latest,
                self.tracks.len(),
                self.tracks.iter().join(", "),
                self.processing,
            ),
        }
    }
}

/// Registers a new subscriber.
///
/// The cursor starts at the current number of tracks, so tracks that exist
/// before the subscription are never delivered.
pub fn subscribe<S>(store: &mut S, url: String, min_trigger_value: usize) -> Result<Webhook>
where
    S: TrackStore + WebhookStore,
{
    if min_trigger_value == 0 {
        bail!("min_trigger_value must be at least 1");
    }

    let cursor = store.count_tracks()?;
    store.insert_webhook(NewWebhook {
        url,
        min_trigger_value,
        cursor,
    })
}

/// Collects the batches that are due and advances the cursors past them.
///
/// A subscriber is due once at least `min_trigger_value` tracks were added
/// after its cursor. Only one batch per subscriber is claimed per call. The
/// cursor moves regardless of whether the later delivery succeeds.
///
/// A batch is only returned if this call moved the cursor past it, so
/// concurrent sweeps never hand out the same batch twice.
pub fn collect_due<S>(store: &mut S) -> Result<Vec<Notification>>
where
    S: TrackStore + WebhookStore,
{
    let webhooks = store.webhooks()?;
    if webhooks.is_empty() {
        return Ok(Vec::new());
    }

    let ids = store.track_ids()?;
    let total = ids.len();

    let mut notifications = Vec::new();
    for webhook in webhooks {
        let started = Instant::now();

        let end = webhook.cursor + webhook.min_trigger_value;
        if end > total {
            continue;
        }

        let t_latest = match store.latest_track()? {
            Some(track) => track.id.timestamp(),
            None => break,
        };

        // another sweep may have claimed this batch since `webhooks()` was read
        if !store.claim_webhook_batch(webhook.id, webhook.cursor, end)? {
            debug!("Batch of webhook {} was already claimed", webhook.id);
            continue;
        }

        let tracks = ids[webhook.cursor..end].to_vec();

        notifications.push(Notification {
            webhook_id: webhook.id,
            url: webhook.url,
            t_latest,
            tracks,
            processing: started.elapsed().as_millis() as u64,
        });
    }

    Ok(notifications)
}

/// Sends a single notification. Only the response status is looked at.
pub async fn deliver(client: &Client, notification: &Notification, timeout: Duration) -> Result<()> {
    let response = client
        .post(&notification.url)
        .timeout(timeout)
        .send_json(&notification.payload())
        .await
        .map_err(|error| anyhow!("request failed: {}", error))?;

    let status = response.status();
    if !status.is_success() {
        bail!("unexpected response status {}", status);
    }

    Ok(())
}

/// Delivers the notifications one after the other and returns how many
/// succeeded.
///
/// Failures are logged and never propagate, a failed delivery does not stop
/// the remaining ones.
pub async fn deliver_all(
    client: &Client,
    notifications: Vec<Notification>,
    timeout: Duration,
) -> usize {
    let mut delivered = 0;

    for notification in notifications {
        debug!(
            "Notifying webhook {} about {} new tracks",
            notification.webhook_id,
            notification.tracks.len()
        );

        match deliver(client, &notification, timeout).await {
            Ok(()) => {
                info!("Invoked webhook {}", notification.webhook_id);
                delivered += 1;
            }
            Err(error) => warn!(
                "Could not invoke webhook {} ({}): {}",
                notification.webhook_id, notification.url, error
            ),
        }
    }

    delivered
}

/// Runs one dispatch sweep over all subscribers.
pub async fn dispatch(redis: &Addr<RedisExecutor>, client: &Client, timeout: Duration) {
    let notifications = match redis.send(ClaimDueWebhooks).await {
        Ok(Ok(notifications)) => notifications,
        Ok(Err(error)) => {
            warn!("Could not collect due webhooks: {}", error);
            return;
        }
        Err(error) => {
            warn!("Could not reach the redis executor: {}", error);
            return;
        }
    };

    deliver_all(client, notifications, timeout).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::client::Client;
    use actix_web::{test, web, App, HttpResponse};
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{NewTrack, Track};
    use crate::store::memory::MemoryStore;
    use crate::store::DuplicateUrl;

    const START: u32 = 1_539_000_000;

    fn add_track(store: &mut MemoryStore, url: &str) -> RecordId {
        store.advance(2);
        store
            .insert_track(NewTrack {
                date: NaiveDate::from_ymd_opt(2018, 10, 8).unwrap(),
                pilot: "Pilot".to_string(),
                glider: "LS4".to_string(),
                glider_id: "D-1234".to_string(),
                track_length: 42.,
                track_src_url: url.to_string(),
            })
            .unwrap()
            .id
    }

    /// Reports a fixed list of webhooks, like a sweep that read them before
    /// another sweep claimed their batches.
    struct OutdatedWebhooks {
        store: MemoryStore,
        webhooks: Vec<Webhook>,
    }

    impl TrackStore for OutdatedWebhooks {
        fn insert_track(&mut self, track: NewTrack) -> Result<Track> {
            self.store.insert_track(track)
        }

        fn find_track(&mut self, id: RecordId) -> Result<Option<Track>> {
            self.store.find_track(id)
        }

        fn count_tracks(&mut self) -> Result<usize> {
            self.store.count_tracks()
        }

        fn track_ids(&mut self) -> Result<Vec<RecordId>> {
            self.store.track_ids()
        }

        fn tracks_since(&mut self, timestamp: i64) -> Result<Vec<Track>> {
            self.store.tracks_since(timestamp)
        }

        fn latest_track(&mut self) -> Result<Option<Track>> {
            self.store.latest_track()
        }

        fn delete_all_tracks(&mut self) -> Result<usize> {
            self.store.delete_all_tracks()
        }
    }

    impl WebhookStore for OutdatedWebhooks {
        fn insert_webhook(&mut self, webhook: NewWebhook) -> Result<Webhook> {
            self.store.insert_webhook(webhook)
        }

        fn find_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
            self.store.find_webhook(id)
        }

        fn delete_webhook(&mut self, id: RecordId) -> Result<Option<Webhook>> {
            self.store.delete_webhook(id)
        }

        fn webhooks(&mut self) -> Result<Vec<Webhook>> {
            Ok(self.webhooks.clone())
        }

        fn claim_webhook_batch(&mut self, id: RecordId, from: usize, to: usize) -> Result<bool> {
            self.store.claim_webhook_batch(id, from, to)
        }
    }

    /// `/hook` counts its calls, `/broken` always fails.
    fn hook_server(hits: Arc<AtomicUsize>) -> test::TestServer {
        test::start(move || {
            let hits = hits.clone();

            App::new()
                .route(
                    "/hook",
                    web::post().to(move || {
                        let hits = hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            HttpResponse::Ok().finish()
                        }
                    }),
                )
                .route(
                    "/broken",
                    web::post().to(|| async { HttpResponse::InternalServerError().finish() }),
                )
        })
    }

    fn notification(tracks: Vec<RecordId>, url: String) -> Notification {
        Notification {
            webhook_id: RecordId::new(START, 1),
            url,
            t_latest: 1_539_000_010,
            tracks,
            processing: 2,
        }
    }

    #[test]
    fn test_payload() {
        let tracks = vec![RecordId::new(START, 1), RecordId::new(START, 2)];
        let payload = notification(tracks, "http://example.com".to_string()).payload();
        assert_eq!(
            payload.text,
            "Latest timestamp: 1539000010, 2 new tracks are: \
             5bbb46c00000000000000001, 5bbb46c00000000000000002 (processing: 2ms)"
        );
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "text": payload.text })
        );
    }

    #[test]
    fn test_subscribe_starts_at_current_count() {
        let mut store = MemoryStore::new(START);
        add_track(&mut store, "http://a.igc");
        add_track(&mut store, "http://b.igc");

        let webhook = subscribe(&mut store, "http://hook".to_string(), 1).unwrap();
        assert_eq!(webhook.cursor, 2);
        assert_eq!(webhook.min_trigger_value, 1);

        // no backlog
        assert!(collect_due(&mut store).unwrap().is_empty());
    }

    #[test]
    fn test_subscribe_rejects_zero_trigger() {
        let mut store = MemoryStore::new(START);
        assert!(subscribe(&mut store, "http://hook".to_string(), 0).is_err());
        assert!(store.webhooks().unwrap().is_empty());
    }

    #[test]
    fn test_subscribe_duplicate_url() {
        let mut store = MemoryStore::new(START);
        subscribe(&mut store, "http://hook".to_string(), 1).unwrap();

        let error = subscribe(&mut store, "http://hook".to_string(), 3).unwrap_err();
        assert!(error.downcast_ref::<DuplicateUrl>().is_some());
        assert_eq!(store.webhooks().unwrap().len(), 1);
    }

    #[test]
    fn test_fires_at_threshold() {
        let mut store = MemoryStore::new(START);
        let webhook = subscribe(&mut store, "http://hook".to_string(), 2).unwrap();

        let first = add_track(&mut store, "http://a.igc");
        assert!(collect_due(&mut store).unwrap().is_empty());

        let second = add_track(&mut store, "http://b.igc");
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].webhook_id, webhook.id);
        assert_eq!(notifications[0].url, "http://hook");
        assert_eq!(notifications[0].tracks, vec![first, second]);
        assert_eq!(notifications[0].t_latest, second.timestamp());

        // the batch was claimed
        assert!(collect_due(&mut store).unwrap().is_empty());
        assert_eq!(store.find_webhook(webhook.id).unwrap().unwrap().cursor, 2);
    }

    #[test]
    fn test_next_batch_needs_threshold_more_tracks() {
        let mut store = MemoryStore::new(START);
        subscribe(&mut store, "http://hook".to_string(), 2).unwrap();

        add_track(&mut store, "http://a.igc");
        add_track(&mut store, "http://b.igc");
        assert_eq!(collect_due(&mut store).unwrap().len(), 1);

        let third = add_track(&mut store, "http://c.igc");
        assert!(collect_due(&mut store).unwrap().is_empty());

        let fourth = add_track(&mut store, "http://d.igc");
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].tracks, vec![third, fourth]);
    }

    #[test]
    fn test_one_batch_per_sweep() {
        let mut store = MemoryStore::new(START);
        let webhook = subscribe(&mut store, "http://hook".to_string(), 1).unwrap();

        let ids: Vec<_> = ["http://a.igc", "http://b.igc", "http://c.igc"]
            .iter()
            .map(|url| add_track(&mut store, url))
            .collect();

        for id in ids {
            let notifications = collect_due(&mut store).unwrap();
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].tracks, vec![id]);
        }

        assert!(collect_due(&mut store).unwrap().is_empty());
        assert_eq!(store.find_webhook(webhook.id).unwrap().unwrap().cursor, 3);
    }

    #[test]
    fn test_subscribers_are_independent() {
        let mut store = MemoryStore::new(START);
        let eager = subscribe(&mut store, "http://eager".to_string(), 1).unwrap();
        let patient = subscribe(&mut store, "http://patient".to_string(), 3).unwrap();

        add_track(&mut store, "http://a.igc");
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].webhook_id, eager.id);

        add_track(&mut store, "http://b.igc");
        add_track(&mut store, "http://c.igc");
        let notifications = collect_due(&mut store).unwrap();
        let ids: Vec<_> = notifications.iter().map(|it| it.webhook_id).collect();
        assert_eq!(ids, vec![eager.id, patient.id]);
        assert_eq!(notifications[1].tracks.len(), 3);
    }

    #[test]
    fn test_claimed_batch_is_not_handed_out_again() {
        let mut store = MemoryStore::new(START);
        let webhook = subscribe(&mut store, "http://hook".to_string(), 1).unwrap();
        let first = add_track(&mut store, "http://a.igc");
        let second = add_track(&mut store, "http://b.igc");

        let outdated = store.webhooks().unwrap();
        assert_eq!(outdated[0].cursor, 0);

        assert_eq!(collect_due(&mut store).unwrap()[0].tracks, vec![first]);
        assert_eq!(collect_due(&mut store).unwrap()[0].tracks, vec![second]);

        let mut store = OutdatedWebhooks {
            store,
            webhooks: outdated,
        };
        assert!(collect_due(&mut store).unwrap().is_empty());

        // the cursor never moves backwards
        assert_eq!(store.find_webhook(webhook.id).unwrap().unwrap().cursor, 2);
    }

    #[test]
    fn test_unsubscribed_webhook_is_skipped() {
        let mut store = MemoryStore::new(START);
        subscribe(&mut store, "http://hook".to_string(), 1).unwrap();
        add_track(&mut store, "http://a.igc");

        let outdated = store.webhooks().unwrap();
        store.delete_webhook(outdated[0].id).unwrap();

        let mut store = OutdatedWebhooks {
            store,
            webhooks: outdated,
        };
        assert!(collect_due(&mut store).unwrap().is_empty());
        assert!(store.store.webhooks().unwrap().is_empty());
    }

    #[test]
    fn test_no_webhooks() {
        let mut store = MemoryStore::new(START);
        add_track(&mut store, "http://a.igc");
        assert!(collect_due(&mut store).unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_deliver() {
        let server = test::start(|| {
            App::new().route(
                "/hook",
                web::post().to(|body: web::Json<serde_json::Value>| async move {
                    if body["text"].as_str().map_or(false, |it| it.contains("1 new tracks")) {
                        HttpResponse::Ok().finish()
                    } else {
                        HttpResponse::BadRequest().finish()
                    }
                }),
            )
        });

        let client = Client::default();
        let notification = notification(vec![RecordId::new(START, 1)], server.url("/hook"));
        let result = deliver(&client, &notification, Duration::from_secs(5)).await;
        assert!(result.is_ok(), "{:?}", result);
    }

    #[actix_rt::test]
    async fn test_deliver_error_status() {
        let server = test::start(|| {
            App::new().route(
                "/hook",
                web::post().to(|| async { HttpResponse::InternalServerError().finish() }),
            )
        });

        let client = Client::default();
        let notification = notification(vec![RecordId::new(START, 1)], server.url("/hook"));
        assert!(deliver(&client, &notification, Duration::from_secs(5))
            .await
            .is_err());
    }

    #[actix_rt::test]
    async fn test_deliver_unreachable() {
        let client = Client::default();
        let notification = notification(vec![], "http://127.0.0.1:1/hook".to_string());
        assert!(deliver(&client, &notification, Duration::from_secs(1))
            .await
            .is_err());
    }

    #[actix_rt::test]
    async fn test_deliver_all_continues_after_failures() {
        let hits = Arc::new(AtomicUsize::new(0));
        let server = hook_server(hits.clone());
        let tracks = vec![RecordId::new(START, 1)];

        let notifications = vec![
            notification(tracks.clone(), "http://127.0.0.1:1/hook".to_string()),
            notification(tracks.clone(), server.url("/broken")),
            notification(tracks, server.url("/hook")),
        ];

        let client = Client::default();
        let delivered = deliver_all(&client, notifications, Duration::from_secs(1)).await;

        assert_eq!(delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_rt::test]
    async fn test_threshold_delivery_end_to_end() {
        let hits = Arc::new(AtomicUsize::new(0));
        let server = hook_server(hits.clone());
        let client = Client::default();
        let timeout = Duration::from_secs(5);

        let mut store = MemoryStore::new(START);
        subscribe(&mut store, server.url("/hook"), 2).unwrap();

        add_track(&mut store, "http://a.igc");
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(deliver_all(&client, notifications, timeout).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        add_track(&mut store, "http://b.igc");
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].tracks.len(), 2);
        assert_eq!(deliver_all(&client, notifications, timeout).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // nothing new, nothing delivered
        let notifications = collect_due(&mut store).unwrap();
        assert_eq!(deliver_all(&client, notifications, timeout).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
