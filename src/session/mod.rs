// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session lifecycle
//!
//! A [`Session`] owns at most one transport. It is created on first use,
//! replaced when it is found closed or its runtime has shut down, and
//! released by [`Session::close`]. A request after `close` simply creates a
//! new one.
//!
//! Two async locks are involved. The creation lock guards the transport slot,
//! so concurrent first use produces exactly one transport. The overlay lock
//! serializes per-request cookie overlays.

mod overlay;
mod watch;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

pub use overlay::CookieOverlay;
use watch::RuntimeWatch;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ReqwestTransport, Transport};

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Transports created, including replacements
    pub transports_created: u64,
    /// Transports replaced because they went stale
    pub transports_recreated: u64,
    /// Explicit closes that released a transport
    pub closes: u64,
    /// Cookie overlays installed
    pub overlays: u64,
    /// Whether a transport is currently held
    pub active: bool,
}

struct SessionHandle<T> {
    transport: Arc<T>,
    watch: RuntimeWatch,
}

impl<T: Transport> SessionHandle<T> {
    fn is_usable(&mut self) -> bool {
        !self.transport.is_closed() && self.watch.is_alive()
    }
}

/// Lazily created, self-healing transport holder
pub struct Session<T: Transport = ReqwestTransport> {
    config: ClientConfig,
    slot: Mutex<Option<SessionHandle<T>>>,
    overlay_lock: Arc<Mutex<()>>,
    stats: RwLock<SessionStats>,
}

impl<T: Transport> Session<T> {
    /// Create a session; no transport exists until the first [`acquire`](Self::acquire)
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
            overlay_lock: Arc::new(Mutex::new(())),
            stats: RwLock::new(SessionStats::default()),
        }
    }

    /// Configuration every transport is created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Live transport, creating or replacing it as needed
    pub async fn acquire(&self) -> Result<Arc<T>> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_mut() {
            if handle.is_usable() {
                return Ok(handle.transport.clone());
            }
        }
        // the old transport may belong to a dead runtime, so it is dropped
        // rather than closed
        let stale = slot.take().is_some();
        if stale {
            tracing::debug!("discarding stale transport");
        }

        let transport = Arc::new(T::create(&self.config).await?);
        *slot = Some(SessionHandle {
            transport: transport.clone(),
            watch: RuntimeWatch::current(),
        });

        let mut stats = self.stats.write();
        stats.transports_created += 1;
        if stale {
            stats.transports_recreated += 1;
        }
        stats.active = true;
        tracing::debug!(created = stats.transports_created, recreated = stale, "transport created");

        Ok(transport)
    }

    /// Close and release the transport. Safe to call repeatedly.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.take() {
            handle.transport.close().await;

            let mut stats = self.stats.write();
            stats.closes += 1;
            stats.active = false;
            tracing::debug!("session closed");
        }
    }

    /// Install a cookie overlay on `transport`, waiting for any overlay in
    /// progress to finish first
    pub async fn overlay(&self, transport: Arc<T>, cookies: &[(String, String)]) -> CookieOverlay<T> {
        let permit = self.overlay_lock.clone().lock_owned().await;
        self.stats.write().overlays += 1;
        CookieOverlay::install(transport, cookies, permit)
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        self.stats.read().clone()
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
