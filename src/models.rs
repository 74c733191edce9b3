use chrono::NaiveDate;

use crate::ids::RecordId;

/// A track as submitted to the store, before it got its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub date: NaiveDate,
    pub pilot: String,
    pub glider: String,
    pub glider_id: String,
    pub track_length: f64,
    pub track_src_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: RecordId,
    pub date: NaiveDate,
    pub pilot: String,
    pub glider: String,
    pub glider_id: String,
    pub track_length: f64,
    pub track_src_url: String,
}

impl Track {
    pub fn from_new(id: RecordId, track: NewTrack) -> Track {
        Track {
            id,
            date: track.date,
            pilot: track.pilot,
            glider: track.glider,
            glider_id: track.glider_id,
            track_length: track.track_length,
            track_src_url: track.track_src_url,
        }
    }

    /// Returns a single field by its public (JSON) name.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "H_date" => Some(self.date.to_string()),
            "pilot" => Some(self.pilot.clone()),
            "glider" => Some(self.glider.clone()),
            "glider_id" => Some(self.glider_id.clone()),
            "track_length" => Some(self.track_length.to_string()),
            "track_src_url" => Some(self.track_src_url.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhook {
    pub url: String,
    pub min_trigger_value: usize,
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Webhook {
    pub id: RecordId,
    pub url: String,
    pub min_trigger_value: usize,
    /// Number of tracks that were already handed to this subscriber
    pub cursor: usize,
}

impl Webhook {
    pub fn from_new(id: RecordId, webhook: NewWebhook) -> Webhook {
        Webhook {
            id,
            url: webhook.url,
            min_trigger_value: webhook.min_trigger_value,
            cursor: webhook.cursor,
        }
    }
}
