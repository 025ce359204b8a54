//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP client configuration / HTTP客户端配置
    #[serde(default)]
    pub http: HttpConfig,
    /// Mounted providers / 挂载的存储
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

/// HTTP client configuration / HTTP客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Default request timeout in seconds / 默认请求超时（秒）
    pub timeout_secs: u64,
}

/// One mounted provider / 挂载项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Virtual mount path, e.g. `/photos` / 挂载路径
    pub mount_path: String,
    /// Provider type registered by a factory / 提供者类型
    pub provider: String,
    /// Provider specific configuration / 提供者配置
    #[serde(default)]
    pub config: Value,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl MountConfig {
    /// Provider config with the global HTTP timeout filled in where unset / 填充默认超时
    pub fn provider_config(&self, http: &HttpConfig) -> Value {
        let mut config = match &self.config {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        if self.provider != "local" {
            if let Some(obj) = config.as_object_mut() {
                obj.entry("timeout_secs")
                    .or_insert_with(|| Value::from(http.timeout_secs));
            }
        }
        config
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config_to(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    save_config_to(&get_config_path(), config)
}

pub fn save_config_to(config_path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG.set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG.get_or_init(|| {
        let config = load_config().unwrap_or_default();
        Arc::new(RwLock::new(config))
    }).clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_load_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{
            "mounts": [
                {"mount_path": "/", "provider": "local", "config": {"root": "data"}},
                {"mount_path": "/cdn", "provider": "cloudfiles",
                 "config": {"username": "alice", "api_key": "k", "region": "DFW", "container": "c"}}
            ]
        }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[1].provider, "cloudfiles");
    }

    #[test]
    fn test_provider_config_inherits_timeout() {
        let http = HttpConfig { timeout_secs: 5 };
        let remote = MountConfig {
            mount_path: "/cdn".to_string(),
            provider: "cloudfiles".to_string(),
            config: serde_json::json!({"container": "c"}),
        };
        assert_eq!(remote.provider_config(&http)["timeout_secs"], 5);

        let pinned = MountConfig {
            config: serde_json::json!({"timeout_secs": 90}),
            ..remote
        };
        assert_eq!(pinned.provider_config(&http)["timeout_secs"], 90);

        let local = MountConfig {
            mount_path: "/".to_string(),
            provider: "local".to_string(),
            config: serde_json::json!({"root": "data"}),
        };
        assert!(local.provider_config(&http).get("timeout_secs").is_none());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config file"));
    }
}
