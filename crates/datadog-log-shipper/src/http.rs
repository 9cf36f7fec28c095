// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client used to reach the log intake.
//!
//! The per-request timeout is applied on each request by the transmitter, the
//! client itself only carries connection level settings:
//! - Connection pooling with a 270s idle timeout
//! - TCP keep-alive (120s)
//! - HTTPS proxy from `DD_PROXY_HTTPS` / `HTTPS_PROXY`, falling back to a direct
//!   connection when the proxy URL cannot be parsed

use crate::config::ShipperConfig;
use crate::error::ShipperError;
use core::time::Duration;
use tracing::error;

/// Creates the HTTP client for the given configuration.
///
/// An invalid proxy is logged and ignored; only a client that cannot be built
/// at all is reported as an error.
pub fn get_client(config: &ShipperConfig) -> Result<reqwest::Client, ShipperError> {
    match build_client(config, true) {
        Ok(client) => Ok(client),
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            build_client(config, false).map_err(|e| ShipperError::HttpClient(e.to_string()))
        }
    }
}

fn build_client(
    config: &ShipperConfig,
    allow_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut client = reqwest::Client::builder()
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.https_proxy {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    client.build()
}
