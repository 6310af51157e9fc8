//! HTTP client abstraction for the registration flow.
//!
//! Both backends (the collection-point API and the public localities API)
//! are reached through the [`HttpClient`] trait, so the flow can be driven
//! end to end in tests without a network.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ColetaError, Result};

/// Response from an HTTP request.
///
/// The status is carried for logging but never decides success on its own:
/// the point-creation endpoint encodes rejection in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A binary file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Multipart field name the file is sent under.
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Transport-agnostic multipart form body.
///
/// Built by the submission builder and handed to the client whole, so mocks
/// can record and inspect exactly what would have gone on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    /// Plain text fields in append order.
    pub fields: Vec<(String, String)>,
    /// Optional file part.
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Attach the file part.
    pub fn file(mut self, part: FilePart) -> Self {
        self.file = Some(part);
        self
    }

    /// Look up a text field by name (first match).
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Trait for executing HTTP requests against the two services.
///
/// Implementations return `Ok` for any response the server produced,
/// whatever its status; `Err` means the request never completed (connection
/// refused, DNS failure, broken transfer).
///
/// # Example
///
/// ```ignore
/// let client = ReqwestHttpClient::new();
/// let response = client.get("http://localhost:3333/items").await?;
/// println!("status {}", response.status);
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync + Clone {
    /// Execute a GET request and return the raw response.
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Post a multipart form and return the raw response.
    async fn post_form(&self, url: &str, form: MultipartForm) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
///
/// No timeouts are configured here; requests run to transport completion.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!(url = %url, "Executing GET request");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(
            url = %url,
            status = status,
            response_length = body.len(),
            "GET request completed"
        );

        Ok(HttpResponse { status, body })
    }

    async fn post_form(&self, url: &str, form: MultipartForm) -> Result<HttpResponse> {
        tracing::debug!(
            url = %url,
            field_count = form.fields.len(),
            has_file = form.has_file(),
            "Executing multipart POST request"
        );

        let mut multipart = reqwest::multipart::Form::new();
        for (name, value) in form.fields {
            multipart = multipart.text(name, value);
        }
        if let Some(file) = form.file {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            multipart = multipart.part(file.name, part);
        }

        let response = self.client.post(url).multipart(multipart).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(
            url = %url,
            status = status,
            response_length = body.len(),
            "Multipart POST request completed"
        );

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// A recorded call made through the mock client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub url: String,
    /// Present for POST calls; the exact form the caller built.
    pub form: Option<MultipartForm>,
}

enum MockResponse {
    /// Response returned immediately.
    Immediate(Result<HttpResponse>),
    /// Response that waits for a trigger before returning, for tests that
    /// need a request held in flight.
    Triggered {
        response: Result<HttpResponse>,
        trigger: oneshot::Receiver<()>,
    },
}

/// Mock HTTP client for testing.
///
/// Responses are keyed by `"METHOD url"` and consumed in FIFO order per key.
/// Every call is recorded for inspection.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

/// Guard that decrements the in-flight counter on drop, even when the
/// response future is cancelled.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `key` (formatted as `"METHOD url"`).
    pub fn add_response(&self, key: impl Into<String>, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .entry(key.into())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Queue a response that is held until the returned sender fires.
    pub fn add_response_with_trigger(
        &self,
        key: impl Into<String>,
        response: Result<HttpResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.into())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: rx,
            });
        tx
    }

    /// All calls made so far, in order.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls whose `"METHOD url"` key matches.
    pub fn call_count(&self, key: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| format!("{} {}", call.method, call.url) == key)
            .count()
    }

    /// Number of requests currently held in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn respond(
        &self,
        method: &str,
        url: &str,
        form: Option<MultipartForm>,
    ) -> Result<HttpResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            method: method.to_string(),
            url: url.to_string(),
            form,
        });

        let key = format!("{} {}", method, url);
        let next = {
            let mut responses = self.responses.lock();
            match responses.get_mut(&key) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                // Hold the request until the test releases it.
                let _ = trigger.await;
                response
            }
            None => Err(ColetaError::Other(anyhow::anyhow!(
                "No mock response configured for {}",
                key
            ))),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.respond("GET", url, None).await
    }

    async fn post_form(&self, url: &str, form: MultipartForm) -> Result<HttpResponse> {
        self.respond("POST", url, Some(form)).await
    }
}
