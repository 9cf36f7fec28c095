// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether a transmission pass is currently running.
///
/// Written by the flush scheduler, read by every producer to avoid requesting a
/// flush while one is already underway.
#[derive(Debug, Default)]
pub struct TransmissionState {
    flushing: AtomicBool,
}

impl TransmissionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Marks a pass as started. The state goes back to idle when the returned
    /// guard is dropped, whichever way the pass ends.
    #[must_use = "the state is reset as soon as the guard is dropped"]
    pub fn begin(&self) -> TransmissionGuard<'_> {
        self.flushing.store(true, Ordering::Release);
        TransmissionGuard { state: self }
    }
}

pub struct TransmissionGuard<'a> {
    state: &'a TransmissionState,
}

impl Drop for TransmissionGuard<'_> {
    fn drop(&mut self) {
        self.state.flushing.store(false, Ordering::Release);
    }
}
