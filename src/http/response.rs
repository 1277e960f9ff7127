// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP response types
//!
//! The body is read at most once: every reader takes the response by value,
//! so the connection goes back to the pool as soon as the body is drained or
//! the response is dropped.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use super::request::RequestInfo;
use crate::error::{Error, Result};

/// Body chunks as they arrive from the transport
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// What a transport returns
pub struct TransportResponse {
    /// Response status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Final URL (after redirects)
    pub url: Url,
    /// Unread body
    pub body: BodyStream,
}

impl TransportResponse {
    /// Response with an in-memory body
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, url: Url, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            headers,
            url,
            body: stream::once(async move { Ok(body) }).boxed(),
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

/// HTTP response handed to callers
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    request_info: RequestInfo,
    body: BodyStream,
}

impl Response {
    pub(crate) fn new(response: TransportResponse, request_info: RequestInfo) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            url: response.url,
            request_info,
            body: response.body,
        }
    }

    /// Response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get status code as u16
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if status is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get content length
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// Final URL (after redirects)
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the final URL differs from the requested one
    pub fn redirected(&self) -> bool {
        self.url != self.request_info.url
    }

    /// What was sent
    pub fn request_info(&self) -> &RequestInfo {
        &self.request_info
    }

    /// Turn 4xx/5xx into an error
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(Error::other(format!(
                "{} returned {}",
                self.url, self.status
            )))
        } else {
            Ok(self)
        }
    }

    /// Read the whole body and release the connection
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the body as UTF-8 text
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Other(e.to_string()))
    }

    /// Read the body as text, replacing invalid UTF-8
    pub async fn text_lossy(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Error::from)
    }

    /// Discard the body without reading it
    pub fn release(self) {
        tracing::trace!(url = %self.url, "response released unread");
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
