use actix_web::{web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};

use crate::api::parse_id;
use crate::app::AppState;
use crate::error::Error;
use crate::ids::RecordId;
use crate::ingest::validate_url;
use crate::models::Webhook;
use crate::redis::{DeleteWebhook, InsertWebhook, ReadWebhook};

#[derive(Deserialize, Debug)]
pub struct WebhookRequest {
    #[serde(rename = "webhook_URL")]
    url: Option<String>,
    min_trigger_value: Option<i64>,
}

#[derive(Serialize)]
struct IdResponse {
    id: RecordId,
}

#[derive(Serialize)]
struct WebhookResponse<'a> {
    #[serde(rename = "webhook_URL")]
    url: &'a str,
    min_trigger_value: usize,
}

impl<'a> From<&'a Webhook> for WebhookResponse<'a> {
    fn from(webhook: &'a Webhook) -> Self {
        WebhookResponse {
            url: &webhook.url,
            min_trigger_value: webhook.min_trigger_value,
        }
    }
}

impl WebhookRequest {
    fn into_message(self) -> Result<InsertWebhook, Error> {
        let url = self.url.unwrap_or_default();
        validate_url(&url)?;

        let min_trigger_value = match self.min_trigger_value {
            None => 1,
            Some(value) if value >= 1 => value as usize,
            Some(value) => {
                return Err(Error::BadRequest(format!(
                    "min_trigger_value must be at least 1, got {}",
                    value
                )))
            }
        };

        Ok(InsertWebhook { url, min_trigger_value })
    }
}

pub async fn post(
    state: web::Data<AppState>,
    body: web::Json<WebhookRequest>,
) -> Result<HttpResponse, Error> {
    let msg = body.into_inner().into_message()?;
    let webhook = state.redis.send(msg).await??;

    info!(
        "Registered webhook {} for {} (every {} tracks)",
        webhook.id, webhook.url, webhook.min_trigger_value
    );

    Ok(HttpResponse::Ok().json(IdResponse { id: webhook.id }))
}

pub async fn get(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse, Error> {
    let id = parse_id(&id)?;

    match state.redis.send(ReadWebhook(id)).await?? {
        Some(webhook) => Ok(HttpResponse::Ok().json(WebhookResponse::from(&webhook))),
        None => Err(Error::NotFound(format!("webhook {} not found", id))),
    }
}

pub async fn delete(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let id = parse_id(&id)?;

    match state.redis.send(DeleteWebhook(id)).await?? {
        Some(webhook) => {
            info!("Deleted webhook {} for {}", webhook.id, webhook.url);
            Ok(HttpResponse::Ok().json(WebhookResponse::from(&webhook)))
        }
        None => Err(Error::NotFound(format!("webhook {} not found", id))),
    }
}
