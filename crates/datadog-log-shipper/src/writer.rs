// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer side of the shipper.
//!
//! [`LogWriter`] is what log call sites hold. Pushing a record appends it to the
//! shared [`EventBuffer`] and, once the buffer reaches the configured threshold,
//! nudges the flush scheduler. The nudge goes through a channel with room for a
//! single signal and is sent with `try_send`, so a producer never waits on the
//! network or on the scheduler: if a flush is already requested or running the
//! signal is simply dropped.

use crate::buffer::{EventBuffer, LogRecord};
use crate::state::TransmissionState;
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

/// Request for the scheduler to run a transmission pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushSignal;

/// Cloneable handle appending records to the shipper's buffer.
#[derive(Debug, Clone)]
pub struct LogWriter {
    buffer: Arc<EventBuffer>,
    state: Arc<TransmissionState>,
    signal_tx: mpsc::Sender<FlushSignal>,
    threshold: usize,
}

impl LogWriter {
    pub fn new(
        buffer: Arc<EventBuffer>,
        state: Arc<TransmissionState>,
        signal_tx: mpsc::Sender<FlushSignal>,
        threshold: usize,
    ) -> Self {
        Self {
            buffer,
            state,
            signal_tx,
            threshold,
        }
    }

    /// Buffers one record. Never blocks on transmission and never fails.
    pub fn push(&self, record: impl Into<LogRecord>) {
        let size = self.buffer.append(record.into());
        if size >= self.threshold && !self.state.is_flushing() {
            // Full: a flush is already pending. Closed: the scheduler stopped and
            // records stay buffered until someone flushes explicitly.
            let _ = self.signal_tx.try_send(FlushSignal);
        }
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }
}

/// Each `write` call is one record. Formatters such as `tracing_subscriber::fmt`
/// render a whole event before writing it, so one event maps to one record.
impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() {
            self.push(Bytes::copy_from_slice(buf));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
