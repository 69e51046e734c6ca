use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cronlink_core::{FunctionInvoker, InvocationResult, ScheduleCandidate};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tokio::sync::mpsc;
use tracing::warn;

use crate::auth::BasicAuth;

/// Value sent in `X-Connector` so functions can tell who triggered them.
pub const CONNECTOR_NAME: &str = "cronlink";

/// Invokes functions through the gateway and publishes every outcome.
pub struct GatewayInvoker {
    client: reqwest::Client,
    gateway_url: String,
    async_by_default: bool,
    content_type: String,
    credentials: Option<BasicAuth>,
    responses: mpsc::UnboundedSender<InvocationResult>,
}

impl GatewayInvoker {
    pub fn new(
        client: reqwest::Client,
        gateway_url: impl Into<String>,
        responses: mpsc::UnboundedSender<InvocationResult>,
    ) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            async_by_default: false,
            content_type: cronlink_core::config::DEFAULT_CONTENT_TYPE.to_string(),
            credentials: None,
            responses,
        }
    }

    /// Send every invocation to the async route, whatever the annotation says.
    pub fn with_async_by_default(mut self, enabled: bool) -> Self {
        self.async_by_default = enabled;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Option<BasicAuth>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Target URL for `candidate`.
    pub fn route(&self, candidate: &ScheduleCandidate) -> String {
        let path = if candidate.is_async || self.async_by_default {
            "async-function"
        } else {
            "function"
        };
        format!("{}/{}/{}", self.gateway_url, path, candidate.qualified_name())
    }

    async fn call(&self, candidate: &ScheduleCandidate) -> InvocationResult {
        let topic = candidate.topic().map(str::to_string);
        let started = Instant::now();

        // Trigger only: the schedule carries no payload.
        let mut req = self
            .client
            .post(self.route(candidate))
            .header(CONTENT_TYPE, &self.content_type)
            .header("X-Connector", CONNECTOR_NAME)
            .body(Vec::<u8>::new());
        if let Some(ref topic) = topic {
            req = req.header("X-Topic", topic);
        }
        if let Some(ref creds) = self.credentials {
            req = creds.apply(req);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                return failed(
                    candidate,
                    topic,
                    None,
                    started.elapsed(),
                    format!("unable to invoke {}: {e}", candidate.qualified_name()),
                );
            }
        };

        let status = resp.status().as_u16();
        let headers = collect_headers(resp.headers());
        match resp.bytes().await {
            Ok(body) => InvocationResult {
                function: candidate.name.clone(),
                namespace: candidate.namespace.clone(),
                topic,
                status: Some(status),
                duration: started.elapsed(),
                error: None,
                body: Some(body.to_vec()),
                headers: Some(headers),
            },
            Err(e) => failed(
                candidate,
                topic,
                Some(status),
                started.elapsed(),
                format!("unable to read response from {}: {e}", candidate.qualified_name()),
            ),
        }
    }
}

#[async_trait]
impl FunctionInvoker for GatewayInvoker {
    /// One attempt, no retry: the next scheduled firing is the retry.
    async fn invoke(&self, candidate: &ScheduleCandidate) -> InvocationResult {
        let result = self.call(candidate).await;
        // Unbounded, so this never blocks the firing task.
        if self.responses.send(result.clone()).is_err() {
            warn!(function = %candidate.qualified_name(), "result channel closed, result dropped");
        }
        result
    }
}

fn failed(
    candidate: &ScheduleCandidate,
    topic: Option<String>,
    status: Option<u16>,
    duration: Duration,
    error: String,
) -> InvocationResult {
    InvocationResult {
        function: candidate.name.clone(),
        namespace: candidate.namespace.clone(),
        topic,
        status,
        duration,
        error: Some(error),
        body: None,
        headers: None,
    }
}

/// Non-UTF-8 header values are kept lossily.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = String::from_utf8_lossy(v.as_bytes()).into_owned();
            (k.to_string(), value)
        })
        .collect()
}
