//! Cloud Files provider core / Cloud Files 提供者核心实现
//!
//! - Token and endpoint are fetched once and shared by concurrent callers
//! - Downloads and uploads go through signed temp URLs
//! - Listing uses `prefix` + `delimiter=/` to emulate folders

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use tokio::sync::OnceCell;
use url::Url;

use crate::storage::{
    Capability, Download, EntryMetadata, HttpRequest, Metadata, ProviderError, ProviderResult,
    ReqwestClient, RequestClient, ResponseWrapper, StorageProvider, UploadStream,
};
use crate::utils::{is_folder_key, normalize_key};
use super::config::CloudFilesConfig;
use super::signer;
use super::types::*;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Largest page the object store returns per listing request / 单页最大条目数
const LISTING_PAGE_LIMIT: usize = 10_000;

/// Authenticated session: token plus regional endpoint / 认证会话
struct Session {
    token: String,
    endpoint: Url,
}

/// Cloud Files provider
pub struct CloudFilesProvider {
    config: CloudFilesConfig,
    client: Arc<dyn RequestClient>,
    session: OnceCell<Session>,
    temp_url_key: OnceCell<String>,
    /// Entries requested per listing page / 每页列表条目数
    page_limit: usize,
}

impl CloudFilesProvider {
    /// Create a provider with its own HTTP client / 创建提供者实例
    pub fn new(config: CloudFilesConfig) -> ProviderResult<Self> {
        config.validate()?;
        let client = ReqwestClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: CloudFilesConfig, client: Arc<dyn RequestClient>) -> Self {
        Self {
            config,
            client,
            session: OnceCell::new(),
            temp_url_key: OnceCell::new(),
            page_limit: LISTING_PAGE_LIMIT,
        }
    }

    /// Request a token and service catalog from the identity service / 获取令牌
    async fn get_token(&self) -> ProviderResult<TokenResponse> {
        let request = HttpRequest::new(Method::POST, self.config.identity_url.as_str())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(auth_body(&self.config.username, &self.config.api_key));

        let resp = self.client.send(request).await?.expect(&[200, 203])?;
        resp.json().await
    }

    /// Authenticate once; concurrent callers wait for the same attempt.
    /// A failed attempt leaves the session unset so the next call retries. / 确保已认证
    async fn ensure_connection(&self) -> ProviderResult<&Session> {
        self.session
            .get_or_try_init(|| async {
                let data = self.get_token().await?;
                let endpoint = extract_endpoint(&data.access.service_catalog, &self.config.region)
                    .ok_or_else(|| {
                        ProviderError::unavailable(format!(
                            "No {} endpoint for region {}",
                            STORAGE_SERVICE, self.config.region
                        ))
                    })?;
                let endpoint = Url::parse(endpoint).map_err(|e| {
                    ProviderError::unavailable(format!("Invalid endpoint {}: {}", endpoint, e))
                })?;

                tracing::info!("Cloud Files authenticated: region={}, endpoint={}", self.config.region, endpoint);
                Ok::<_, ProviderError>(Session {
                    token: data.access.token.id,
                    endpoint,
                })
            })
            .await
    }

    fn default_headers(&self, session: &Session) -> ProviderResult<HeaderMap> {
        let token = HeaderValue::from_str(&session.token)
            .map_err(|_| ProviderError::unavailable("Auth token is not a valid header value"))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Temp URL secret from account metadata, fetched once / 获取临时URL密钥
    async fn temp_url_key(&self, session: &Session) -> ProviderResult<&str> {
        let key = self
            .temp_url_key
            .get_or_try_init(|| async {
                let request = HttpRequest::new(Method::HEAD, session.endpoint.as_str())
                    .headers(self.default_headers(session)?);
                let resp = self.client.send(request).await?.expect(&[200, 204])?;

                match resp.header(TEMP_URL_KEY_HEADER) {
                    Some(key) => Ok::<_, ProviderError>(key.to_string()),
                    None => Err(ProviderError::unavailable("No temp url key is available")),
                }
            })
            .await?;
        Ok(key.as_str())
    }

    fn object_url(&self, session: &Session, key: &str) -> ProviderResult<Url> {
        let mut url = session.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProviderError::unavailable("Endpoint URL cannot carry a path"))?;
            segments.pop_if_empty().push(&self.config.container);
            if !key.is_empty() {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }

    /// Object URL under the configured container / 构建对象URL
    pub async fn build_url(&self, path: &str) -> ProviderResult<String> {
        let session = self.ensure_connection().await?;
        let key = normalize_key(path)?;
        Ok(self.object_url(session, &key)?.into())
    }

    /// Signed temp URL valid for `method` during `seconds` / 生成签名临时URL
    pub async fn generate_url(&self, path: &str, method: Method, seconds: u64) -> ProviderResult<String> {
        let session = self.ensure_connection().await?;
        let key = normalize_key(path)?;
        self.sign(session, &key, &method, seconds).await
    }

    /// Sign `key` for `method`; `expires` is strictly in the future / 签名对象URL
    async fn sign(&self, session: &Session, key: &str, method: &Method, seconds: u64) -> ProviderResult<String> {
        if seconds == 0 {
            return Err(ProviderError::Config("temp url lifetime must be positive".to_string()));
        }
        let expires = i64::try_from(seconds)
            .ok()
            .and_then(|secs| Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| ProviderError::Config(format!("temp url lifetime {}s is out of range", seconds)))?;

        let secret = self.temp_url_key(session).await?;
        let mut url = self.object_url(session, key)?;
        signer::sign_url(&mut url, secret, method.as_str(), expires)?;
        Ok(url.into())
    }

    fn file_key(path: &str) -> ProviderResult<String> {
        let key = normalize_key(path)?;
        if is_folder_key(&key) {
            return Err(ProviderError::invalid_path(path, "expected a file path"));
        }
        Ok(key)
    }
}

#[async_trait]
impl StorageProvider for CloudFilesProvider {
    fn name(&self) -> &str {
        "cloudfiles"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            can_direct_link: true,
            can_stream_upload: true,
            requires_session: true,
        }
    }

    async fn download(&self, path: &str, accept_url: bool) -> ProviderResult<Download> {
        let session = self.ensure_connection().await?;
        let key = Self::file_key(path)?;
        let url = self.sign(session, &key, &Method::GET, self.config.temp_url_secs).await?;

        if accept_url {
            return Ok(Download::Url(url));
        }

        let request = HttpRequest::new(Method::GET, url).headers(self.default_headers(session)?);
        let resp = self.client.send(request).await?;
        if resp.status_code() == 404 {
            return Err(ProviderError::not_found(path));
        }
        Ok(Download::Stream(resp.expect(&[200])?))
    }

    async fn upload(&self, source: UploadStream, path: &str) -> ProviderResult<ResponseWrapper> {
        let session = self.ensure_connection().await?;
        let key = Self::file_key(path)?;
        let url = self.sign(session, &key, &Method::PUT, self.config.temp_url_secs).await?;

        tracing::debug!("Cloud Files upload: key={}, size={}", key, source.size());
        let request = HttpRequest::new(Method::PUT, url)
            .headers(self.default_headers(session)?)
            .header(CONTENT_LENGTH, HeaderValue::from(source.size()))
            .stream(source);

        self.client.send(request).await?.expect(&[200, 201])
    }

    async fn delete(&self, path: &str) -> ProviderResult<ResponseWrapper> {
        let session = self.ensure_connection().await?;
        let key = Self::file_key(path)?;
        let url = self.object_url(session, &key)?;

        tracing::debug!("Cloud Files delete: key={}", key);
        let request = HttpRequest::new(Method::DELETE, url.as_str()).headers(self.default_headers(session)?);
        self.client.send(request).await?.expect(&[204])
    }

    async fn metadata(&self, path: &str) -> ProviderResult<Metadata> {
        let session = self.ensure_connection().await?;
        let key = normalize_key(path)?;

        // Listings are paged; follow `marker` until a short page / 分页获取列表
        let mut listing: Vec<ListingEntry> = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut url = self.object_url(session, "")?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("prefix", &key)
                    .append_pair("delimiter", "/")
                    .append_pair("format", "json")
                    .append_pair("limit", &self.page_limit.to_string());
                if let Some(marker) = &marker {
                    query.append_pair("marker", marker);
                }
            }

            let request = HttpRequest::new(Method::GET, url.as_str()).headers(self.default_headers(session)?);
            let resp = self.client.send(request).await?;
            match resp.status_code() {
                404 if marker.is_none() => return Err(ProviderError::not_found(path)),
                204 => break,
                _ => {}
            }

            let page: Vec<ListingEntry> = resp.expect(&[200])?.json().await?;
            let full = page.len() >= self.page_limit;
            marker = page.last().map(|entry| entry.marker().to_string());
            listing.extend(page);
            if !full || marker.is_none() {
                break;
            }
        }
        if listing.is_empty() {
            return Ok(Metadata::Folder(Vec::new()));
        }

        let entries = listing.into_iter().map(ListingEntry::into_metadata);

        if is_folder_key(&key) {
            // The folder marker object itself is not a child
            let children: Vec<EntryMetadata> = entries.filter(|entry| entry.path != key).collect();
            Ok(Metadata::Folder(children))
        } else {
            entries
                .into_iter()
                .find(|entry| entry.path == key)
                .map(Metadata::File)
                .ok_or_else(|| ProviderError::not_found(path))
        }
    }
}
