//! Response wrapper and upload source / 响应包装与上传数据源
//!
//! `ResponseWrapper` is the uniform `(status, headers, body, size)` view every
//! provider hands back, whether the bytes came from HTTP or from disk.

use std::fmt;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};

use super::error::{ProviderError, ProviderResult};

/// Streaming body type shared by responses and uploads / 流式数据体
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

const MAX_PREALLOC: u64 = 64 * 1024;

/// Normalized view of one response / 统一响应视图
pub struct ResponseWrapper {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyStream,
    size: Option<u64>,
}

impl ResponseWrapper {
    /// Size is taken from `Content-Length` when present / 大小取自Content-Length
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        Self { status, headers, body, size }
    }

    pub fn from_bytes(status: StatusCode, mut headers: HeaderMap, data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let size = data.len() as u64;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        Self {
            status,
            headers,
            body: stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed(),
            size: Some(size),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: stream::empty().boxed(),
            size: Some(0),
        }
    }

    /// Wrap a reqwest response without buffering its body / 包装reqwest响应（不缓冲）
    pub fn from_reqwest(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let headers = resp.headers().clone();
        let size = resp.content_length();
        let body = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .boxed();
        Self { status, headers, body, size }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as string, if present and valid UTF-8 / 获取头部字符串值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Fail with `UnexpectedStatus` unless the status is in `expected` / 校验状态码
    pub fn expect(self, expected: &[u16]) -> ProviderResult<Self> {
        let actual = self.status_code();
        if expected.contains(&actual) {
            Ok(self)
        } else {
            Err(ProviderError::UnexpectedStatus {
                expected: expected.to_vec(),
                actual,
            })
        }
    }

    pub fn into_stream(self) -> BodyStream {
        self.body
    }

    pub fn into_reader(self) -> impl AsyncRead + Unpin + Send {
        StreamReader::new(self.body)
    }

    /// Drain the body into memory / 读取全部数据
    pub async fn bytes(self) -> std::io::Result<Bytes> {
        // Content-Length is untrusted; cap the up-front allocation
        let mut buf = match self.size {
            Some(size) => BytesMut::with_capacity(size.min(MAX_PREALLOC) as usize),
            None => BytesMut::new(),
        };
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn json<T: DeserializeOwned>(self) -> ProviderResult<T> {
        let data = self.bytes().await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl fmt::Debug for ResponseWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWrapper")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Byte stream with a declared size, consumed by `upload` / 带声明大小的上传流
pub struct UploadStream {
    body: BodyStream,
    size: u64,
}

impl UploadStream {
    pub fn new(body: BodyStream, size: u64) -> Self {
        Self { body, size }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let size = data.len() as u64;
        Self {
            body: stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed(),
            size,
        }
    }

    /// Stream a local file / 从本地文件读取
    pub async fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(Self {
            body: ReaderStream::new(file).boxed(),
            size,
        })
    }

    /// Re-upload another provider's download; its size must be known / 从其他提供者的下载响应构建
    pub fn from_response(resp: ResponseWrapper) -> ProviderResult<Self> {
        let size = resp
            .size()
            .ok_or_else(|| ProviderError::unavailable("Source response has no declared size"))?;
        Ok(Self {
            body: resp.into_stream(),
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_stream(self) -> BodyStream {
        self.body
    }
}

impl fmt::Debug for UploadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
