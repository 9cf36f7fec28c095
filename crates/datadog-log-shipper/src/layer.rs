// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `tracing` layer rendering events as Datadog JSON log records.
//!
//! Every event becomes one record made of, in increasing priority:
//! 1. the standard tags from [`ShipperConfig::standard_tags`]
//! 2. the fields of every enclosing span, root first
//! 3. the event's own fields
//! 4. `level`, `logger.name` and `timestamp` (epoch milliseconds)
//!
//! Span fields are how externally supplied correlation data reaches the record:
//! a tracer or web middleware that records `dd.trace_id` / `dd.span_id` (or
//! request metadata such as `http_method`) on a span gets them attached to every
//! log line emitted inside it. This layer never creates spans itself.

use crate::config::ShipperConfig;
use crate::writer::LogWriter;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_core::field::{Field, Visit};
use tracing_core::span::{Attributes, Id, Record};
use tracing_core::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

pub struct ShipperLayer {
    writer: LogWriter,
    tags: Map<String, Value>,
}

impl ShipperLayer {
    pub fn new(writer: LogWriter, config: &ShipperConfig) -> Self {
        Self {
            writer,
            tags: config.standard_tags(),
        }
    }

    fn render<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> Map<String, Value>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let mut record = self.tags.clone();

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    record.extend(fields.0.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        event.record(&mut JsonVisitor(&mut record));

        let metadata = event.metadata();
        record.insert(
            "level".to_string(),
            Value::String(metadata.level().to_string().to_lowercase()),
        );
        record.insert(
            "logger.name".to_string(),
            Value::String(metadata.target().to_string()),
        );
        record.insert("timestamp".to_string(), Value::from(epoch_millis()));
        record
    }
}

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut JsonVisitor(&mut fields.0));
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut JsonVisitor(&mut fields.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let record = self.render(event, &ctx);
        // A map of JSON values always serializes; nothing to report otherwise.
        if let Ok(bytes) = serde_json::to_vec(&record) {
            self.writer.push(bytes);
        }
    }
}

/// Fields recorded on a span, kept in the span's extensions.
#[derive(Debug, Default)]
struct SpanFields(Map<String, Value>);

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.0.insert(field.name().to_string(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
