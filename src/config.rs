use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{App, Arg, ArgMatches};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub redis_threads: usize,
    /// Maximum number of tracks in a single ticker response
    pub ticker_cap: usize,
    /// Applies to each IGC download and webhook delivery
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<Config> {
        Ok(Config {
            host: value(matches, "host")?,
            port: value(matches, "port")?,
            redis_url: value(matches, "redis-url")?,
            redis_threads: value(matches, "redis-threads")?,
            ticker_cap: value(matches, "ticker-cap")?,
            http_timeout: Duration::from_secs(value(matches, "http-timeout")?),
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn app() -> App<'static, 'static> {
    App::new("paragliding-tracker")
        .about("Collects IGC tracks and notifies webhooks about new ones")
        .arg(
            Arg::with_name("host")
                .long("host")
                .env("LISTEN_HOST")
                .default_value("127.0.0.1")
                .help("Address to listen on"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .env("PORT")
                .default_value("8080")
                .help("Port to listen on"),
        )
        .arg(
            Arg::with_name("redis-url")
                .long("redis-url")
                .env("REDIS_URL")
                .default_value("redis://127.0.0.1/")
                .help("Connection URL of the redis server"),
        )
        .arg(
            Arg::with_name("redis-threads")
                .long("redis-threads")
                .default_value("3")
                .help("Number of redis executor threads"),
        )
        .arg(
            Arg::with_name("ticker-cap")
                .long("ticker-cap")
                .env("TICKER_CAP")
                .default_value("5")
                .help("Maximum number of tracks per ticker response"),
        )
        .arg(
            Arg::with_name("http-timeout")
                .long("http-timeout")
                .env("HTTP_TIMEOUT")
                .default_value("5")
                .help("Timeout in seconds for IGC downloads and webhook calls"),
        )
}

fn value<T>(matches: &ArgMatches<'_>, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing value for --{}", name))?;

    raw.parse()
        .map_err(|error| anyhow!("invalid value {:?} for --{}: {}", raw, name, error))
}
