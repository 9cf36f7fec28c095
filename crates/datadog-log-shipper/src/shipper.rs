// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::buffer::{EventBuffer, LogRecord};
use crate::config::ShipperConfig;
use crate::error::ShipperError;
use crate::scheduler::{FlushScheduler, SchedulerHandle};
use crate::state::TransmissionState;
use crate::transmitter::{HttpTransmitter, PassSummary, Transmit};
use crate::writer::LogWriter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a running log shipper.
///
/// Owns the buffer, the transmission flag and the configuration shared by every
/// [`LogWriter`] and by the background [`FlushScheduler`]. Cloning the handle is
/// cheap and every clone drives the same shipper; separate `LogShipper`s are
/// fully independent.
#[derive(Clone, Debug)]
pub struct LogShipper {
    config: Arc<ShipperConfig>,
    writer: LogWriter,
    state: Arc<TransmissionState>,
    scheduler: SchedulerHandle,
    cancel_token: CancellationToken,
}

impl LogShipper {
    /// Builds a shipper posting to the configured Datadog intake. The returned
    /// scheduler must be spawned for anything to be sent.
    pub fn new(config: ShipperConfig) -> Result<(FlushScheduler, Self), ShipperError> {
        config.validate()?;
        let transmitter = Arc::new(HttpTransmitter::new(&config)?);
        Self::with_transmitter(config, transmitter)
    }

    pub fn with_transmitter(
        config: ShipperConfig,
        transmitter: Arc<dyn Transmit>,
    ) -> Result<(FlushScheduler, Self), ShipperError> {
        config.validate()?;

        let buffer = Arc::new(EventBuffer::new());
        let state = Arc::new(TransmissionState::new());
        // Room for a single pending signal: producers drop theirs once it is taken.
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let cancel_token = CancellationToken::new();

        let (scheduler, scheduler_handle) = FlushScheduler::new(
            Arc::clone(&buffer),
            Arc::clone(&state),
            transmitter,
            signal_rx,
            cancel_token.clone(),
        );
        let writer = LogWriter::new(buffer, Arc::clone(&state), signal_tx, config.buffer_size);

        let shipper = Self {
            config: Arc::new(config),
            writer,
            state,
            scheduler: scheduler_handle,
            cancel_token,
        };

        Ok((scheduler, shipper))
    }

    /// Builds the shipper and spawns its scheduler on the current Tokio runtime.
    pub fn start(config: ShipperConfig) -> Result<(Self, JoinHandle<()>), ShipperError> {
        let (scheduler, shipper) = Self::new(config)?;
        debug!(
            "LOGS | Starting log shipper for {}",
            shipper.config.intake_base()
        );
        let task = tokio::spawn(scheduler.run());
        Ok((shipper, task))
    }

    pub fn config(&self) -> &ShipperConfig {
        &self.config
    }

    /// A writer feeding this shipper, for loggers that take an `io::Write` or a
    /// `MakeWriter`.
    pub fn writer(&self) -> LogWriter {
        self.writer.clone()
    }

    pub fn push(&self, record: impl Into<LogRecord>) {
        self.writer.push(record);
    }

    /// Records buffered and not yet delivered.
    pub fn pending(&self) -> usize {
        self.writer.buffer().pending()
    }

    pub fn is_flushing(&self) -> bool {
        self.state.is_flushing()
    }

    /// Runs a pass right away, queued behind any pass already in progress.
    /// Returns `None` if the pass panicked.
    pub async fn flush(&self) -> Result<Option<PassSummary>, ShipperError> {
        self.scheduler.flush().await.map_err(|e| {
            debug!("LOGS | {}", e);
            ShipperError::NotRunning
        })
    }

    /// Stops the scheduler without flushing. Buffered records are dropped with
    /// the shipper.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Flushes what is buffered, then stops the scheduler.
    pub async fn shutdown(&self) -> Result<Option<PassSummary>, ShipperError> {
        let summary = self.flush().await?;
        self.scheduler
            .shutdown()
            .map_err(|_| ShipperError::NotRunning)?;
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    struct DrainingTransmitter;

    #[async_trait]
    impl Transmit for DrainingTransmitter {
        async fn transmit(&self, buffer: &EventBuffer) -> PassSummary {
            let mut summary = PassSummary::default();
            for index in 0..buffer.size() {
                if buffer.delete(index) {
                    summary.attempted += 1;
                    summary.delivered += 1;
                }
            }
            summary
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ShipperConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            LogShipper::new(config),
            Err(ShipperError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_threshold_flush_through_shipper() {
        let config = ShipperConfig {
            buffer_size: 2,
            ..Default::default()
        };
        let (scheduler, shipper) =
            LogShipper::with_transmitter(config, Arc::new(DrainingTransmitter)).unwrap();
        let task = tokio::spawn(scheduler.run());

        shipper.push("one");
        assert_eq!(shipper.pending(), 1);
        shipper.push("two");

        timeout(Duration::from_secs(2), async {
            while shipper.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shipper.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_flushes_remaining_records() {
        let config = ShipperConfig {
            buffer_size: 100,
            ..Default::default()
        };
        let (scheduler, shipper) =
            LogShipper::with_transmitter(config, Arc::new(DrainingTransmitter)).unwrap();
        let task = tokio::spawn(scheduler.run());

        shipper.push("one");
        shipper.push("two");
        let summary = shipper.shutdown().await.unwrap().unwrap();

        assert_eq!(summary.delivered, 2);
        assert_eq!(shipper.pending(), 0);
        task.await.unwrap();
        assert!(matches!(
            shipper.flush().await,
            Err(ShipperError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_independent_instances() {
        let (first_scheduler, first) =
            LogShipper::with_transmitter(ShipperConfig::default(), Arc::new(DrainingTransmitter))
                .unwrap();
        let (_second_scheduler, second) =
            LogShipper::with_transmitter(ShipperConfig::default(), Arc::new(DrainingTransmitter))
                .unwrap();
        let task = tokio::spawn(first_scheduler.run());

        first.push("first");
        second.push("second");
        first.flush().await.unwrap();

        assert_eq!(first.pending(), 0);
        assert_eq!(second.pending(), 1);

        first.stop();
        task.await.unwrap();
    }
}
