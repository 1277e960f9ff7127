// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Recording transport used by unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use super::cookie::CookieJar;
use super::request::PreparedRequest;
use super::response::TransportResponse;
use super::transport::Transport;
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// One request as the transport saw it
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub request: PreparedRequest,
    /// Cookie header the jar produced at send time
    pub cookies: Option<String>,
}

/// Answers every request with `200 ok`, except `/fail` (transport error)
/// and `/set-cookie` (sets `srv=1`). Records everything it is asked to send.
pub(crate) struct RecordingTransport {
    pub config: ClientConfig,
    pub sent: Mutex<Vec<Sent>>,
    jar: RwLock<CookieJar>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn last(&self) -> Sent {
        self.sent.lock().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn create(config: &ClientConfig) -> Result<Self> {
        // widen the window for concurrent creation
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(Self {
            config: config.clone(),
            sent: Mutex::new(Vec::new()),
            jar: RwLock::new(CookieJar::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let jar = self.cookie_jar();
        let url = request.url.clone();
        self.sent.lock().push(Sent {
            cookies: jar.get_cookie_header(&url),
            request,
        });
        tokio::task::yield_now().await;

        match url.path() {
            "/fail" => Err(Error::other("connection reset")),
            "/set-cookie" => {
                jar.add_from_header("srv=1", &url);
                Ok(TransportResponse::from_bytes(StatusCode::OK, HeaderMap::new(), url, "ok"))
            }
            _ => Ok(TransportResponse::from_bytes(StatusCode::OK, HeaderMap::new(), url, "ok")),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn cookie_jar(&self) -> CookieJar {
        self.jar.read().clone()
    }

    fn replace_cookie_jar(&self, jar: CookieJar) -> CookieJar {
        std::mem::replace(&mut *self.jar.write(), jar)
    }
}
