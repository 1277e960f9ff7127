// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-request cookie overlay

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use crate::http::{CookieJar, Transport};

/// Installs a copy of the transport's jar plus extra cookies for one request.
///
/// Dropping the guard puts the original jar back, including when the request
/// fails or its future is cancelled. The overlay lock is held for the
/// guard's whole life and released only after the restore.
pub struct CookieOverlay<T: Transport> {
    transport: Arc<T>,
    original: Option<CookieJar>,
    _permit: OwnedMutexGuard<()>,
}

impl<T: Transport> CookieOverlay<T> {
    pub(crate) fn install(
        transport: Arc<T>,
        cookies: &[(String, String)],
        permit: OwnedMutexGuard<()>,
    ) -> Self {
        let overlay = transport.cookie_jar().snapshot();
        overlay.extend_pairs(cookies.iter().cloned());
        let original = transport.replace_cookie_jar(overlay);
        tracing::trace!(extra = cookies.len(), "cookie overlay installed");

        Self {
            transport,
            original: Some(original),
            _permit: permit,
        }
    }

    /// The jar in effect while the guard lives
    pub fn jar(&self) -> CookieJar {
        self.transport.cookie_jar()
    }
}

impl<T: Transport> Drop for CookieOverlay<T> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.transport.replace_cookie_jar(original);
            tracing::trace!("cookie overlay removed");
        }
    }
}
