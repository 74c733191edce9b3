use std::time::Duration;

use actix_web::client::Client;
use anyhow::{anyhow, bail, Result};
use log::debug;

mod parser;

pub use crate::igc::parser::{parse, IgcTrack};

/// Upper bound for downloaded IGC files
const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Downloads and parses the IGC file at `url`.
///
/// Network failures and malformed files are both reported as errors, the
/// caller cannot tell them apart.
pub async fn download(client: &Client, url: &str, timeout: Duration) -> Result<IgcTrack> {
    debug!("Downloading IGC file from {}…", url);

    let mut response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|error| anyhow!("could not download {}: {}", url, error))?;

    let status = response.status();
    if !status.is_success() {
        bail!("could not download {}: status {}", url, status);
    }

    let body = response
        .body()
        .limit(MAX_FILE_SIZE)
        .await
        .map_err(|error| anyhow!("could not read {}: {}", url, error))?;

    parse(&String::from_utf8_lossy(&body))
}
