//! Scripted transport for adapter tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::SourceClient;
use crate::config::{AdmissionConfig, RateBudget, SourcesConfig};
use crate::failsafe::AdmissionController;
use crate::transport::HttpTransport;
use crate::{Error, Result};

/// One scripted answer
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Status(u16),
    RateLimited(Option<&'static str>),
}

/// A request seen by the mock
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// Answers requests whose URL contains a registered fragment.
///
/// Each route replays its replies in order and repeats the last one.
/// Unrouted URLs answer 404.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, fragment: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock();
            match routes.iter_mut().find(|(f, _)| f == fragment) {
                Some((_, replies)) => replies.push_back(reply),
                None => routes.push((fragment.to_string(), VecDeque::from([reply]))),
            }
        }
        self
    }

    pub fn json(self, fragment: &str, body: Value) -> Self {
        self.route(fragment, Reply::Json(body))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.url.clone()).collect()
    }

    fn answer(&self, method: &'static str, url: &str, body: Option<&Value>) -> Result<Value> {
        self.calls.lock().push(Call {
            method,
            url: url.to_string(),
            body: body.cloned(),
        });

        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .and_then(|(_, replies)| {
                    if replies.len() > 1 {
                        replies.pop_front()
                    } else {
                        replies.front().cloned()
                    }
                })
        };

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(Error::Upstream {
                url: url.to_string(),
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Reply::RateLimited(retry_after)) => Err(Error::RateLimited {
                url: url.to_string(),
                retry_after: retry_after.map(str::to_string),
            }),
            None => Err(Error::Upstream {
                url: url.to_string(),
                status: 404,
                message: "no route".to_string(),
            }),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.answer("GET", url, None)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        self.answer("POST", url, Some(body))
    }
}

/// Upstream base URLs pointing at distinct fake hosts
pub(crate) fn sources() -> SourcesConfig {
    SourcesConfig {
        llama_url: "http://llama.test".to_string(),
        yields_url: "http://yields.test".to_string(),
        safety_url: "http://safety.test/v1".to_string(),
        santiment_url: "http://santiment.test/graphql".to_string(),
        snapshot_url: "http://snapshot.test/graphql".to_string(),
        tally_url: "http://tally.test/query".to_string(),
        prices_url: "http://prices.test/api/v3".to_string(),
    }
}

/// Client over `mock` with budgets loose enough never to wait
pub(crate) fn client(mock: &Arc<MockTransport>) -> SourceClient {
    let admission = AdmissionConfig {
        default: RateBudget {
            max_requests: 1_000,
            window: Duration::from_secs(60),
        },
        domains: Default::default(),
        max_retries: 3,
        default_retry_after: Duration::from_secs(60),
    };
    SourceClient::new(
        mock.clone(),
        Arc::new(AdmissionController::new(admission)),
    )
}
