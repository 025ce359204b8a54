use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration item definition / 配置项定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    /// Display title (friendly name) / 显示标题
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigItem {
    pub fn new(name: &str, item_type: &str) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            item_type: item_type.to_string(),
            default: None,
            required: false,
            help: None,
        }
    }

    pub fn title(mut self, val: &str) -> Self {
        self.title = Some(val.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, val: &str) -> Self {
        self.default = Some(val.to_string());
        self
    }

    pub fn help(mut self, val: &str) -> Self {
        self.help = Some(val.to_string());
        self
    }
}

/// Provider description exposed by factories / 提供者描述信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider type name used in configuration / 配置中使用的类型名
    pub provider_type: String,
    /// Display name / 显示名称
    pub name: String,
    /// Provider-specific configuration items / 提供者特有配置项
    pub items: Vec<ConfigItem>,
}

/// Normalized metadata entry / 统一的元数据条目
///
/// `path` is the full storage key; folders end with `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Last modification time (RFC 3339 or backend format) / 修改时间
    pub modified: Option<String>,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Result of a metadata lookup / 元数据查询结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metadata {
    File(EntryMetadata),
    Folder(Vec<EntryMetadata>),
}

impl Metadata {
    /// Children of a folder, or the single file as a one-element list / 转为条目列表
    pub fn into_entries(self) -> Vec<EntryMetadata> {
        match self {
            Metadata::File(entry) => vec![entry],
            Metadata::Folder(entries) => entries,
        }
    }
}

/// Download result: streamed body or a URL the caller fetches itself / 下载结果
#[derive(Debug)]
pub enum Download {
    Stream(ResponseWrapper),
    Url(String),
}

/// Provider capability declaration / 提供者能力声明
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capability {
    /// Can hand out pre-signed URLs for direct download / 支持直链下载
    pub can_direct_link: bool,
    /// Uploads are streamed without buffering / 流式上传
    pub can_stream_upload: bool,
    /// Requires a remote session before any operation / 需要远程会话
    pub requires_session: bool,
}

/// Storage provider contract / 存储提供者接口
///
/// Paths are storage-relative keys. Folder paths end with `/`; the empty
/// path (or `/`) is the provider root.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider name / 提供者名称
    fn name(&self) -> &str;

    /// Provider capabilities / 提供者能力
    fn capabilities(&self) -> Capability;

    /// Download a file. With `accept_url` a provider that supports direct
    /// links returns `Download::Url` and performs no fetch. / 下载文件
    async fn download(&self, path: &str, accept_url: bool) -> ProviderResult<Download>;

    /// Upload a stream to `path`, replacing any existing object / 上传文件
    async fn upload(&self, source: UploadStream, path: &str) -> ProviderResult<ResponseWrapper>;

    /// Delete the object at `path` / 删除文件
    async fn delete(&self, path: &str) -> ProviderResult<ResponseWrapper>;

    /// File metadata, or the children of a folder path / 获取元数据
    async fn metadata(&self, path: &str) -> ProviderResult<Metadata>;
}

pub mod error;
pub mod http;
pub mod local_factory;
pub mod manager;
pub mod response;

pub use error::{ProviderError, ProviderResult};
pub use http::{HttpRequest, ReqwestClient, RequestBody, RequestClient};
pub use local_factory::LocalProviderFactory;
pub use manager::{ProviderBox, ProviderFactory, StorageManager};
pub use response::{BodyStream, ResponseWrapper, UploadStream};
