use std::error::Error;
use std::process::ExitCode;

use gbfs_client::feed::{FeedTransport, MockTransport};
use gbfs_client::{ClientConfig, GbfsClient};
use tracing_subscriber::EnvFilter;

/// Topics the binary can print.
const TOPICS: &[&str] = &[
    "discovery",
    "languages",
    "station_status",
    "station_information",
    "complete",
];

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Ok(feed_url) = std::env::var("GBFS_FEED_URL") else {
        eprintln!("GBFS_FEED_URL not set: point it at a system's gbfs.json");
        return ExitCode::FAILURE;
    };
    let language = std::env::var("GBFS_LANGUAGE").unwrap_or_else(|_| "en".to_string());
    let topic = std::env::args().nth(1).unwrap_or_else(|| "complete".to_string());

    let mut config = ClientConfig::new(&feed_url);
    if let Ok(value) = std::env::var("GBFS_TIMEOUT_SECS") {
        match parse_timeout(&value) {
            Ok(secs) => config = config.with_timeout(secs),
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::FAILURE;
            }
        }
    }

    // GBFS_MOCK_DIR serves feeds from local JSON files instead of the network,
    // with URLs resolved relative to the directory of GBFS_FEED_URL.
    let result = match std::env::var("GBFS_MOCK_DIR") {
        Ok(dir) => {
            let base_url = feed_url.rsplit_once('/').map_or(feed_url.as_str(), |(base, _)| base);
            MockTransport::from_dir(base_url, dir)
                .map_err(Into::into)
                .and_then(|mock| {
                    let client = GbfsClient::with_transport(config, mock);
                    render(&client, &topic, &language)
                })
        }
        Err(_) => GbfsClient::new(config)
            .map_err(Into::into)
            .and_then(|client| render(&client, &topic, &language)),
    };

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Parse the `GBFS_TIMEOUT_SECS` value.
fn parse_timeout(value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("GBFS_TIMEOUT_SECS must be a whole number of seconds, got {value:?}"))
}

/// Fetch `topic` and render it as pretty-printed JSON.
fn render<T: FeedTransport>(
    client: &GbfsClient<T>,
    topic: &str,
    language: &str,
) -> Result<String, Box<dyn Error>> {
    let json = match topic {
        "discovery" => serde_json::to_string_pretty(&*client.auto_discovery()?)?,
        "languages" => serde_json::to_string_pretty(&*client.supported_languages()?)?,
        "station_status" => serde_json::to_string_pretty(&*client.station_status(language)?)?,
        "station_information" => {
            serde_json::to_string_pretty(&*client.station_information(language)?)?
        }
        "complete" => serde_json::to_string_pretty(&*client.complete_snapshot(language)?)?,
        other => {
            return Err(format!("unknown topic {other:?}, expected one of {TOPICS:?}").into());
        }
    };
    Ok(json)
}
