//! Request client seam / HTTP请求客户端
//!
//! Adapters never talk to reqwest directly; they go through `RequestClient`
//! so the transport (timeouts, TLS, proxies) stays outside storage logic.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

use super::error::{ProviderError, ProviderResult};
use super::response::{ResponseWrapper, UploadStream};

/// Request body / 请求体
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Stream(UploadStream),
}

/// One outgoing request / 单个HTTP请求
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge headers; later values override earlier ones / 合并请求头
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn stream(mut self, upload: UploadStream) -> Self {
        self.body = RequestBody::Stream(upload);
        self
    }
}

/// Asynchronous request/response client / 异步请求客户端
#[async_trait]
pub trait RequestClient: Send + Sync {
    /// Perform the request. Transport failures come back as `ProviderError::Transport`.
    async fn send(&self, request: HttpRequest) -> ProviderResult<ResponseWrapper>;
}

/// reqwest-backed client / 基于reqwest的客户端
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> ProviderResult<ResponseWrapper> {
        let HttpRequest { method, url, headers, body } = request;
        tracing::debug!("HTTP {} {}", method, strip_query(&url));

        let builder = self.client.request(method, &url).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Stream(upload) => builder.body(stream_body(upload)),
        };

        let resp = builder.send().await.map_err(ProviderError::transport)?;
        Ok(ResponseWrapper::from_reqwest(resp))
    }
}

/// reqwest needs a `Sync` stream; forward chunks through a bounded channel / 通过有界通道转发分块
fn stream_body(upload: UploadStream) -> reqwest::Body {
    let (mut tx, rx) = futures::channel::mpsc::channel::<std::io::Result<Bytes>>(2);
    let mut source = upload.into_stream();
    tokio::spawn(async move {
        while let Some(chunk) = source.next().await {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });
    reqwest::Body::wrap_stream(rx)
}

/// Signed URLs carry their signature in the query; keep it out of logs
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
pub mod mock {
    //! Scripted in-memory client for adapter tests.

    use std::sync::Arc;

    use parking_lot::Mutex;
    use reqwest::StatusCode;

    use super::*;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: String,
        pub headers: HeaderMap,
        pub body: Option<Bytes>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }

        /// Value of a query parameter / 查询参数
        pub fn query(&self, key: &str) -> Option<String> {
            let url = url::Url::parse(&self.url).ok()?;
            let value = url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned());
            value
        }
    }

    pub struct MockResponse {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Bytes,
        delay: Option<Duration>,
        fail: bool,
    }

    impl MockResponse {
        pub fn status(status: u16) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: Bytes::new(),
                delay: None,
                fail: false,
            }
        }

        pub fn json(status: u16, value: serde_json::Value) -> Self {
            Self::status(status).body(value.to_string())
        }

        pub fn transport_error() -> Self {
            Self { fail: true, ..Self::status(0) }
        }

        pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
            self.headers.push((name, value.into()));
            self
        }

        pub fn body(mut self, body: impl Into<Bytes>) -> Self {
            self.body = body.into();
            self
        }

        pub fn delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    type Handler = dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync;

    pub struct MockClient {
        handler: Box<Handler>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockClient {
        pub fn new<F>(handler: F) -> Arc<Self>
        where
            F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
        {
            Arc::new(Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        pub fn count(&self, method: Method) -> usize {
            self.requests.lock().iter().filter(|r| r.method == method).count()
        }
    }

    #[async_trait]
    impl RequestClient for MockClient {
        async fn send(&self, request: HttpRequest) -> ProviderResult<ResponseWrapper> {
            let body = match request.body {
                RequestBody::Empty => None,
                RequestBody::Json(value) => Some(Bytes::from(value.to_string())),
                RequestBody::Stream(upload) => {
                    let mut stream = upload.into_stream();
                    let mut buf = Vec::new();
                    while let Some(chunk) = stream.next().await {
                        buf.extend_from_slice(&chunk?);
                    }
                    Some(Bytes::from(buf))
                }
            };
            let recorded = RecordedRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body,
            };
            let response = (self.handler)(&recorded);
            self.requests.lock().push(recorded);

            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }
            if response.fail {
                return Err(ProviderError::transport(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }

            let mut headers = HeaderMap::new();
            for (name, value) in response.headers {
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(HeaderName::from_static(name), value);
                }
            }
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Ok(ResponseWrapper::from_bytes(status, headers, response.body))
        }
    }
}
