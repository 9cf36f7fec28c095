// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::future::Future;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use datadog_log_shipper::{logger, LogShipper, PassSummary, ShipperConfig, ShipperError};

#[tokio::main]
pub async fn main() {
    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to start log forwarder: {e}");
            std::process::exit(1);
        }
    };

    let (shipper, scheduler_task) = match LogShipper::start(config) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("Unable to start log forwarder: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logger::init(&shipper) {
        eprintln!("{e}");
    }
    debug!("Logging subsystem enabled");

    let config = shipper.config();
    if config.api_key.is_empty() {
        error!("DD_API_KEY not set, the intake will reject every log");
    }
    info!(
        "Forwarding stdin to {} (buffer size {}, timeout {}s, flush interval {}s)",
        config.intake_base(),
        config.buffer_size,
        config.timeout_secs,
        config.flush_interval_secs
    );

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt, shutting down"),
            Err(e) => {
                error!("Unable to listen for interrupts: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let stdin = BufReader::new(io::stdin());
    match forward(&shipper, stdin, config.flush_interval(), interrupted).await {
        Ok(Some(summary)) if summary.retained > 0 => {
            error!("{} logs could not be delivered before exit", summary.retained);
        }
        Ok(_) => {}
        Err(e) => error!("Failed to flush logs on shutdown: {e}"),
    }
    if let Err(e) = scheduler_task.await {
        error!("Log scheduler task failed: {e}");
    }
}

/// Pushes every non-blank line of `input` as one record, flushing pending records
/// every `every` until the input ends or `shutdown` resolves. Finishes with a
/// final flush and stops the shipper's scheduler.
async fn forward<R, S>(
    shipper: &LogShipper,
    input: R,
    every: Duration,
    shutdown: S,
) -> Result<Option<PassSummary>, ShipperError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut flush_interval = interval(every);
    flush_interval.tick().await; // discard first tick, which is instantaneous
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        shipper.push(line);
                    }
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            },
            _ = flush_interval.tick() => {
                if shipper.pending() > 0 {
                    debug!("Flushing {} buffered logs", shipper.pending());
                    if let Err(e) = shipper.flush().await {
                        error!("Failed to flush logs: {e}");
                    }
                }
            }
            () = &mut shutdown => break,
        }
    }

    shipper.shutdown().await
}
