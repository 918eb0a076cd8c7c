// HTTP transport seam
// Adapters only describe requests; the transport performs them

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{header::{HeaderMap, HeaderName, HeaderValue}, Client, Method};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{AIError, AIResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Fully described HTTP request produced by an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl WireRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response whose body arrives as raw byte chunks
pub struct StreamingResponse {
    pub status: u16,
    pub body: BoxStream<'static, AIResult<Vec<u8>>>,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into a string (used for error payloads)
    pub async fn collect_body(self) -> AIResult<String> {
        let mut bytes = Vec::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: WireRequest) -> AIResult<WireResponse>;

    async fn send_stream(&self, request: WireRequest) -> AIResult<StreamingResponse>;
}

/// Default transport backed by a shared reqwest client
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &WireRequest) -> AIResult<reqwest::RequestBuilder> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AIError::InvalidConfig(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| AIError::InvalidConfig("Invalid header value".to_string()))?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(method, &request.url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> AIResult<WireResponse> {
        let response = self.build(&request)?.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(WireResponse { status, body })
    }

    async fn send_stream(&self, request: WireRequest) -> AIResult<StreamingResponse> {
        let response = self.build(&request)?.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(AIError::from))
            .boxed();
        Ok(StreamingResponse { status, body })
    }
}

/// Canned reply for [`StubTransport`]
#[derive(Debug, Clone)]
pub enum StubReply {
    Body { status: u16, body: String },
    Stream { status: u16, chunks: Vec<Vec<u8>> },
    Fail(String),
}

impl StubReply {
    pub fn json(body: Value) -> Self {
        StubReply::Body { status: 200, body: body.to_string() }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        StubReply::Body { status, body: body.into() }
    }

    pub fn sse<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        StubReply::Stream {
            status: 200,
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
        }
    }
}

/// Scripted transport for tests and offline hosts
///
/// Replies are consumed in order; every request is recorded. Running out of
/// replies yields `ConnectionFailed`.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<StubReply>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = StubReply>) -> Self {
        let stub = Self::new();
        for reply in replies {
            stub.push_reply(reply);
        }
        stub
    }

    pub fn push_reply(&self, reply: StubReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_reply(&self, request: WireRequest) -> AIResult<StubReply> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| AIError::ConnectionFailed("no scripted reply".to_string()))
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: WireRequest) -> AIResult<WireResponse> {
        match self.next_reply(request)? {
            StubReply::Body { status, body } => Ok(WireResponse { status, body }),
            StubReply::Stream { status, chunks } => Ok(WireResponse {
                status,
                body: String::from_utf8_lossy(&chunks.concat()).into_owned(),
            }),
            StubReply::Fail(message) => Err(AIError::ConnectionFailed(message)),
        }
    }

    async fn send_stream(&self, request: WireRequest) -> AIResult<StreamingResponse> {
        match self.next_reply(request)? {
            StubReply::Stream { status, chunks } => Ok(StreamingResponse {
                status,
                body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
            }),
            StubReply::Body { status, body } => Ok(StreamingResponse {
                status,
                body: stream::iter(vec![Ok(body.into_bytes())]).boxed(),
            }),
            StubReply::Fail(message) => Err(AIError::ConnectionFailed(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_stub_replays_in_order_and_records() {
        let stub = StubTransport::with_replies(vec![
            StubReply::json(json!({"ok": true})),
            StubReply::status(500, "boom"),
        ]);

        let first = stub.send(WireRequest::get("https://a.test/1")).await.unwrap();
        assert!(first.is_success());
        let second = stub.send(WireRequest::get("https://a.test/2")).await.unwrap();
        assert_eq!(second.status, 500);
        assert!(stub.send(WireRequest::get("https://a.test/3")).await.is_err());

        let urls: Vec<String> = stub.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
    }

    #[tokio::test]
    async fn test_stub_stream_collects_body() {
        let stub = StubTransport::with_replies(vec![StubReply::sse(["ab", "cd"])]);
        let response = stub.send_stream(WireRequest::get("https://a.test")).await.unwrap();
        assert_eq!(response.collect_body().await.unwrap(), "abcd");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = WireRequest::post("https://a.test", json!({})).header("X-Api-Key", "k");
        assert_eq!(request.header_value("x-api-key"), Some("k"));
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
    }
}
