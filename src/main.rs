//! operserv - OperServ X-line gateway.
//!
//! Reads JSON-lines events from stdin (or a file given as the second
//! argument) and writes the resulting network actions to stdout.

use slircd_operserv::gateway::{Gateway, JsonLinesOutput};
use slircd_operserv::{Collaborators, Config, OperServ, XLineRegistry, metrics, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "operserv.toml".to_string());
    let events_path = args.next();

    let config = if std::path::Path::new(&config_path).exists() {
        Config::load_validated(&config_path)
    } else {
        Ok(Config::default())
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(&Default::default());
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };

    telemetry::init_tracing(&config.log);
    metrics::init();

    info!(
        config = %config_path,
        client = %config.operserv.client,
        caps = ?config.protocol,
        "Starting OperServ gateway"
    );

    let output = Arc::new(JsonLinesOutput::new(std::io::stdout()));
    let collab = Collaborators::new(output.clone(), output.clone());
    let mut os = OperServ::new(&config, XLineRegistry::standard(), collab);
    let gateway = Gateway::new(output);

    let input: Box<dyn AsyncRead + Unpin + Send> = match events_path {
        Some(path) => Box::new(tokio::fs::File::open(&path).await?),
        None => Box::new(tokio::io::stdin()),
    };
    let mut input = BufReader::new(input);
    // Survives a cancelled read: partial bytes stay here until the newline arrives.
    let mut buf = Vec::new();

    let mut expiry = tokio::time::interval(Duration::from_secs(config.xlines.expire_interval));
    expiry.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    if !buf.is_empty() {
                        gateway.handle_bytes(&mut os, &buf);
                    }
                    info!("Input closed");
                    break;
                }
                Ok(_) => {
                    gateway.handle_bytes(&mut os, &buf);
                    buf.clear();
                }
                Err(e) => {
                    error!(error = %e, "Failed to read input");
                    break;
                }
            },
            _ = expiry.tick() => {
                os.expire_xlines();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    os.shutdown();
    tracing::debug!(metrics = %metrics::gather_metrics(), "Final metrics");
    Ok(())
}
