// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Global logger setup.
//!
//! [`init`] installs a subscriber that mirrors every event to the console and
//! ships it through a [`LogShipper`]. Console lines use [`Formatter`]:
//!
//! ```text
//! DD_LOG_SHIPPER | LEVEL | target: message {event_fields} {span_fields}
//! ```
//!
//! Span fields trail the event's own fields, root span first, mirroring how
//! [`ShipperLayer`] merges them into the shipped record. Span names are left out:
//! the shipped record does not carry them either.
//!
//! The shipper's own diagnostics and the HTTP stack's events are printed but
//! never shipped, otherwise every failed post would enqueue a new record about
//! itself.

use crate::error::ShipperError;
use crate::layer::ShipperLayer;
use crate::shipper::LogShipper;
use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Targets whose events stay local.
const LOCAL_ONLY_TARGETS: [&str; 6] = [
    "datadog_log_shipper",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
];

const CONSOLE_PREFIX: &str = "DD_LOG_SHIPPER";

/// Console formatter prefixing every line with `DD_LOG_SHIPPER`, the level and
/// the event target.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "{CONSOLE_PREFIX} | {} | {}: ",
            metadata.level(),
            metadata.target()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        for span in ctx.event_scope().into_iter().flat_map(|scope| scope.from_root()) {
            let ext = span.extensions();
            match ext.get::<FormattedFields<N>>() {
                Some(fields) if !fields.is_empty() => write!(writer, " {{{fields}}}")?,
                _ => {}
            }
        }

        writeln!(writer)
    }
}

/// Whether events from `target` may be shipped.
pub fn is_shippable(target: &str) -> bool {
    !LOCAL_ONLY_TARGETS.iter().any(|local| {
        target == *local
            || target
                .strip_prefix(local)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Installs the global subscriber: console output for everything at or above
/// `log_level`, and shipping through `shipper` for application events.
pub fn init(shipper: &LogShipper) -> Result<(), ShipperError> {
    let log_level = shipper.config().log_level.as_str();
    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");
    let env_filter =
        EnvFilter::try_new(env_filter).map_err(|e| ShipperError::Subscriber(e.to_string()))?;

    let console = tracing_subscriber::fmt::layer()
        .event_format(Formatter)
        .with_writer(std::io::stdout);
    let shipping = ShipperLayer::new(shipper.writer(), shipper.config())
        .with_filter(filter_fn(|metadata| is_shippable(metadata.target())));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(shipping)
        .try_init()
        .map_err(|e| ShipperError::Subscriber(e.to_string()))
}
