//! event-dispatch
//!
//! Delivers one event read from a file, the way a controller would for a
//! single work item.
//!
//! ```text
//!  event.json ──▶ destination ──response──▶ reply
//!                      │ failure              │ failure
//!                      ▼                      ▼
//!                 dead letter            dead letter
//! ```

use std::path::PathBuf;

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use event_dispatch::config::{load_config, DispatcherConfig};
use event_dispatch::observability::logging;
use event_dispatch::{Event, EventMessage, HttpMessageDispatcher, MessageDispatcher, MessageRef, Target};

const REQUEST_ID: &str = "x-request-id";

#[derive(Parser)]
#[command(name = "event-dispatch")]
#[command(about = "Deliver a CloudEvent with reply forwarding and dead-letter fallback", long_about = None)]
struct Cli {
    /// Dispatcher configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event in JSON format.
    #[arg(short, long)]
    event: PathBuf,

    /// Destination URL or host.
    #[arg(short, long)]
    destination: Option<Target>,

    /// Reply sink URL or host.
    #[arg(short, long)]
    reply: Option<Target>,

    /// Dead-letter sink URL or host.
    #[arg(long)]
    dead_letter: Option<Target>,

    /// Extra request header, `name=value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(HeaderName, HeaderValue)>,

    /// Send in binary mode instead of structured.
    #[arg(long)]
    binary: bool,
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatcherConfig::default(),
    };

    logging::init(&config.observability.log_level)?;

    let event = Event::from_json(&std::fs::read(&cli.event)?)?;
    tracing::info!(
        id = %event.id,
        ty = %event.ty,
        source = %event.source,
        binary = cli.binary,
        "Event loaded"
    );

    let message: MessageRef = if cli.binary {
        std::sync::Arc::new(EventMessage::binary(event))
    } else {
        std::sync::Arc::new(EventMessage::structured(event))
    };

    let mut headers = HeaderMap::new();
    for (name, value) in cli.headers {
        headers.append(name, value);
    }
    if !headers.contains_key(REQUEST_ID) {
        let request_id = uuid::Uuid::new_v4().to_string();
        headers.insert(REQUEST_ID, HeaderValue::from_str(&request_id)?);
    }

    let dispatcher = HttpMessageDispatcher::new(&config)?;
    dispatcher
        .dispatch(message, &headers, cli.destination, cli.reply, cli.dead_letter)
        .await?;

    tracing::info!("Dispatch complete");
    Ok(())
}
