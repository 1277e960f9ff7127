// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP layer
//!
//! The request orchestrator, request/response types, the cookie jar and the
//! transport seam.

mod client;
mod cookie;
#[cfg(test)]
pub(crate) mod mock;
mod request;
mod response;
mod transport;

pub use client::Client;
pub use cookie::{Cookie, CookieJar};
pub use request::{Data, Hook, PreparedRequest, RedirectPolicy, RequestInfo, RequestOptions};
pub use response::{BodyStream, Response, TransportResponse};
pub use transport::{ReqwestTransport, Transport, ROUTE_CACHE_CAPACITY};
