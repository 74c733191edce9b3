use crate::error::Error;
use crate::ids::RecordId;

pub mod admin;
pub mod info;
pub mod ticker;
pub mod tracks;
pub mod webhooks;

fn parse_id(raw: &str) -> Result<RecordId, Error> {
    raw.parse()
        .map_err(|error| Error::BadRequest(format!("{}", error)))
}

fn plain_text(body: String) -> actix_web::HttpResponse {
    actix_web::HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(body)
}
