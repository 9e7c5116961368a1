//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::transport::{InboundResponse, OutboundRequest, Transport, TransportError};

type Scripted = Result<InboundResponse, TransportError>;

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Scripted>>,
    fallback: HashMap<String, Scripted>,
    requests: Vec<OutboundRequest>,
    fresh_contexts: usize,
}

/// Replays queued responses per URL, then the URL's fallback. Fresh
/// contexts share the same script.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, response: Scripted) -> &Self {
        self.script
            .lock()
            .queued
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn fallback(&self, url: &str, response: Scripted) -> &Self {
        self.script
            .lock()
            .fallback
            .insert(url.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.script.lock().requests.clone()
    }

    pub fn requests_to(&self, url: &str) -> usize {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn fresh_contexts(&self) -> usize {
        self.script.lock().fresh_contexts
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let mut script = self.script.lock();
        let url = request.url.clone();
        script.requests.push(request);

        if let Some(next) = script.queued.get_mut(&url).and_then(VecDeque::pop_front) {
            return next;
        }
        script
            .fallback
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Network(format!("unscripted {url}"))))
    }

    fn fresh_context(&self) -> Result<Arc<dyn Transport>, TransportError> {
        self.script.lock().fresh_contexts += 1;
        Ok(Arc::new(self.clone()))
    }
}

pub(crate) fn json_ok(body: Value) -> Scripted {
    Ok(InboundResponse {
        status: 200,
        set_cookies: Vec::new(),
        body: body.to_string(),
    })
}

pub(crate) fn with_cookies(status: u16, cookies: &[&str]) -> Scripted {
    Ok(InboundResponse {
        status,
        set_cookies: cookies.iter().map(|c| c.to_string()).collect(),
        body: "{}".to_string(),
    })
}

pub(crate) fn status(status: u16) -> Scripted {
    with_cookies(status, &[])
}
