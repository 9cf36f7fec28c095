// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur when starting or driving the log shipper.
///
/// Nothing on the shipping path itself surfaces here: failed deliveries are
/// logged by the scheduler and never reach the code that emitted the log line.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Log shipper not running")]
    NotRunning,

    #[error("Failed to install log subscriber: {0}")]
    Subscriber(String),
}
