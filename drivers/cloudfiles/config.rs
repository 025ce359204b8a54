//! Cloud Files provider configuration / Cloud Files 配置

use serde::{Deserialize, Serialize};

use crate::storage::{ProviderError, ProviderResult};

/// Rackspace identity service token endpoint / 身份认证服务地址
pub const IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0/tokens";

/// Cloud Files credentials and options / Cloud Files 凭证与选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFilesConfig {
    /// Account user name / 用户名
    pub username: String,
    /// API key (also accepted as `token`) / API密钥
    #[serde(alias = "token")]
    pub api_key: String,
    /// Region of the storage endpoint, e.g. DFW, ORD, IAD / 区域
    pub region: String,
    /// Target container / 容器名称
    pub container: String,
    /// Identity service URL / 身份认证地址
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    /// Validity of signed URLs in seconds / 签名URL有效期（秒）
    #[serde(default = "default_temp_url_secs")]
    pub temp_url_secs: u64,
    /// HTTP timeout in seconds / 请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_identity_url() -> String {
    IDENTITY_URL.to_string()
}

fn default_temp_url_secs() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

impl CloudFilesConfig {
    pub fn validate(&self) -> ProviderResult<()> {
        let required = [
            ("username", &self.username),
            ("api_key", &self.api_key),
            ("region", &self.region),
            ("container", &self.container),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ProviderError::Config(format!("{} is required", name)));
            }
        }
        if self.temp_url_secs == 0 {
            return Err(ProviderError::Config("temp_url_secs must be positive".to_string()));
        }
        Ok(())
    }
}
