// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered, non-blocking log shipping to the Datadog HTTP log intake.
//!
//! Log lines are appended to an in-memory buffer by any number of producers and
//! posted, one request per record, by a single background scheduler once the
//! buffer reaches a size threshold. At most one transmission pass runs at any
//! time. Delivery is best effort: the buffer lives in memory only.
//!
//! ```text
//!   LogWriter::push ──> EventBuffer ──[threshold]──> FlushScheduler
//!                            ^                            │
//!                            │                            v
//!                            └──── delete delivered ── Transmitter ──> intake
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod error;
pub mod http;
pub mod layer;
pub mod logger;
pub mod scheduler;
pub mod shipper;
pub mod state;
pub mod transmitter;
pub mod writer;

pub use buffer::{EventBuffer, LogRecord};
pub use config::ShipperConfig;
pub use error::ShipperError;
pub use layer::ShipperLayer;
pub use shipper::LogShipper;
pub use transmitter::{HttpTransmitter, PassSummary, Transmit};
pub use writer::LogWriter;
