//! Cloud Files wire types / Cloud Files 接口数据结构

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::storage::EntryMetadata;
use crate::utils::key_name;

/// Catalog service name of the object store / 对象存储在服务目录中的名称
pub const STORAGE_SERVICE: &str = "cloudFiles";

/// Account metadata header holding the temp URL secret / 临时URL密钥头
pub const TEMP_URL_KEY_HEADER: &str = "X-Account-Meta-Temp-URL-Key";

// ============ Identity / 身份认证 ============

/// Token request body / 令牌请求体
pub fn auth_body(username: &str, api_key: &str) -> Value {
    json!({
        "auth": {
            "RAX-KSKEY:apiKeyCredentials": {
                "username": username,
                "apiKey": api_key,
            }
        }
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: Access,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Access {
    pub token: Token,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<CatalogService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogService {
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// Pick the storage endpoint for `region`.
///
/// The catalog is scanned from the end: when the same region is listed more
/// than once, the entry listed last wins.
pub fn extract_endpoint<'a>(catalog: &'a [CatalogService], region: &str) -> Option<&'a str> {
    catalog
        .iter()
        .rev()
        .filter(|service| service.name == STORAGE_SERVICE)
        .find_map(|service| {
            service
                .endpoints
                .iter()
                .find(|endpoint| endpoint.region.as_deref() == Some(region))
                .map(|endpoint| endpoint.public_url.as_str())
        })
}

// ============ Container listing / 容器列表 ============

/// One entry of a JSON container listing / 容器列表条目
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListingEntry {
    /// Pseudo-folder produced by the delimiter / 由分隔符产生的虚拟目录
    Subdir { subdir: String },
    Object(ObjectEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub bytes: u64,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl ListingEntry {
    /// Name used as `marker` to request the next page / 分页标记
    pub fn marker(&self) -> &str {
        match self {
            ListingEntry::Subdir { subdir } => subdir,
            ListingEntry::Object(obj) => &obj.name,
        }
    }

    pub fn into_metadata(self) -> EntryMetadata {
        match self {
            ListingEntry::Subdir { subdir } => EntryMetadata {
                name: key_name(&subdir).to_string(),
                path: subdir,
                size: 0,
                modified: None,
                is_dir: true,
                content_type: None,
                etag: None,
            },
            ListingEntry::Object(obj) => {
                let is_dir = obj.name.ends_with('/')
                    || obj.content_type.as_deref() == Some("application/directory");
                EntryMetadata {
                    name: key_name(&obj.name).to_string(),
                    path: obj.name,
                    size: obj.bytes,
                    modified: obj.last_modified.map(|raw| normalize_timestamp(&raw)),
                    is_dir,
                    content_type: obj.content_type,
                    etag: obj.hash,
                }
            }
        }
    }
}

/// Listing timestamps are UTC without offset; convert to RFC 3339 / 转换为RFC 3339
fn normalize_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive).to_rfc3339())
        .unwrap_or_else(|_| raw.to_string())
}
