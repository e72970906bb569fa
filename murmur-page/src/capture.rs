//! Passive capture of the page's own comment traffic.
//!
//! The page performs its requests through whatever [`Fetch`] sits in its
//! [`PageContext`]. [`install`] wraps that implementation so that every comment listing
//! flowing through it is also published on the page's [`EventBus`], without the page
//! ever noticing: responses and errors are handed back untouched.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bytes::Bytes;
use murmur_api::{CaptureEvent, Endpoint};
use serde_json::Value;

use crate::EventBus;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchRequest {
    pub url: String,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> FetchRequest {
        FetchRequest { url: url.into() }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchResponse {
    pub status: u16,

    /// Shared buffer, cloning it does not copy the body
    pub body: Bytes,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Bytes>) -> FetchResponse {
        FetchResponse {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, req: FetchRequest) -> anyhow::Result<FetchResponse>;
}

pub struct PageContext {
    fetch: parking_lot::RwLock<Arc<dyn Fetch>>,
    events: EventBus,
    capture_installed: AtomicBool,
}

impl PageContext {
    pub fn new(fetch: Arc<dyn Fetch>) -> PageContext {
        PageContext {
            fetch: parking_lot::RwLock::new(fetch),
            events: EventBus::new(),
            capture_installed: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// What the page itself calls for every request
    pub async fn fetch(&self, req: FetchRequest) -> anyhow::Result<FetchResponse> {
        let fetch = self.fetch.read().clone();
        fetch.fetch(req).await
    }

    /// Returns the previous implementation
    pub fn replace_fetch(&self, fetch: Arc<dyn Fetch>) -> Arc<dyn Fetch> {
        std::mem::replace(&mut *self.fetch.write(), fetch)
    }

    pub fn capture_installed(&self) -> bool {
        self.capture_installed.load(Ordering::SeqCst)
    }
}

/// Returns `false` if capture was already installed on this page
pub fn install(ctx: &PageContext) -> bool {
    if ctx.capture_installed.swap(true, Ordering::SeqCst) {
        tracing::debug!("capture already installed");
        return false;
    }
    let mut slot = ctx.fetch.write();
    let shim = CaptureShim {
        inner: slot.clone(),
        events: ctx.events.clone(),
    };
    *slot = Arc::new(shim);
    tracing::info!("capture installed");
    true
}

pub struct CaptureShim {
    inner: Arc<dyn Fetch>,
    events: EventBus,
}

impl CaptureShim {
    fn capture(&self, url: String, resp: &FetchResponse) {
        if !resp.is_success() {
            tracing::debug!(%url, status = resp.status, "not capturing failed listing");
            return;
        }
        let body = resp.body.clone();
        match serde_json::from_slice::<Value>(&body) {
            Ok(body) => self.events.publish(CaptureEvent::now(url, body)),
            Err(err) => tracing::debug!(?err, %url, "listing body is not json"),
        }
    }
}

#[async_trait::async_trait]
impl Fetch for CaptureShim {
    async fn fetch(&self, req: FetchRequest) -> anyhow::Result<FetchResponse> {
        let url = Endpoint::classify(&req.url).map(|_| req.url.clone());
        let resp = self.inner.fetch(req).await?;
        if let Some(url) = url {
            self.capture(url, &resp);
        }
        Ok(resp)
    }
}
