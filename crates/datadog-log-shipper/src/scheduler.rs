// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::buffer::EventBuffer;
use crate::state::TransmissionState;
use crate::transmitter::{PassSummary, Transmit};
use crate::writer::FlushSignal;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a pass now and report how it went. A pass that panicked reports `None`.
    Flush(oneshot::Sender<Option<PassSummary>>),
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub async fn flush(&self) -> Result<Option<PassSummary>, String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::Flush(response_tx))
            .map_err(|e| format!("Failed to send flush command: {}", e))?;

        response_rx
            .await
            .map_err(|e| format!("Failed to receive flush response: {}", e))
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.tx.send(SchedulerCommand::Shutdown)
    }
}

/// The single background consumer of the event buffer.
///
/// Signals and commands are handled one at a time and each pass runs to
/// completion before the next one is picked up, so at most one transmission is
/// ever in flight.
pub struct FlushScheduler {
    buffer: Arc<EventBuffer>,
    state: Arc<TransmissionState>,
    transmitter: Arc<dyn Transmit>,
    signal_rx: mpsc::Receiver<FlushSignal>,
    command_rx: mpsc::UnboundedReceiver<SchedulerCommand>,
    cancel_token: CancellationToken,
}

impl FlushScheduler {
    pub fn new(
        buffer: Arc<EventBuffer>,
        state: Arc<TransmissionState>,
        transmitter: Arc<dyn Transmit>,
        signal_rx: mpsc::Receiver<FlushSignal>,
        cancel_token: CancellationToken,
    ) -> (Self, SchedulerHandle) {
        let (tx, command_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            buffer,
            state,
            transmitter,
            signal_rx,
            command_rx,
            cancel_token,
        };

        (scheduler, SchedulerHandle { tx })
    }

    pub async fn run(mut self) {
        debug!("LOGS | Flush scheduler started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!("LOGS | Flush scheduler cancelled");
                    break;
                }
                command = self.command_rx.recv() => match command {
                    Some(SchedulerCommand::Flush(response_tx)) => {
                        let summary =
                            run_pass(&self.buffer, &self.state, self.transmitter.as_ref()).await;
                        if response_tx.send(summary).is_err() {
                            error!("LOGS | Failed to send flush response - receiver dropped");
                        }
                    }
                    Some(SchedulerCommand::Shutdown) | None => {
                        debug!("LOGS | Flush scheduler shutting down");
                        break;
                    }
                },
                signal = self.signal_rx.recv() => match signal {
                    Some(FlushSignal) => {
                        run_pass(&self.buffer, &self.state, self.transmitter.as_ref()).await;
                    }
                    None => break,
                },
            }
        }

        debug!("LOGS | Flush scheduler stopped");
    }
}

/// Runs one transmission pass. The transmission flag is held for the whole pass
/// and released however it ends, a panic included.
async fn run_pass(
    buffer: &EventBuffer,
    state: &TransmissionState,
    transmitter: &dyn Transmit,
) -> Option<PassSummary> {
    // While the flag reads idle, size() counts live records only.
    let (result, reclaimed) = {
        let _transmitting = state.begin();
        let result = AssertUnwindSafe(transmitter.transmit(buffer))
            .catch_unwind()
            .await;
        (result, buffer.compact())
    };

    match result {
        Ok(summary) => {
            debug!(
                "LOGS | Flushed {} logs, {} rejected, {} retained ({} slots reclaimed)",
                summary.delivered, summary.rejected, summary.retained, reclaimed
            );
            Some(summary)
        }
        Err(panic) => {
            error!(
                "LOGS | Panic occurred while sending logs: {}",
                panic_message(&*panic)
            );
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
