use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};
use serde_json::Value;

use super::{ProviderInfo, StorageProvider};
use crate::utils::fix_and_clean_path;

pub type ProviderBox = Arc<dyn StorageProvider>;

/// Provider factory trait / 提供者工厂 trait
pub trait ProviderFactory: Send + Sync {
    /// Provider type name / 提供者类型名称
    fn provider_type(&self) -> &'static str;

    /// Describe configuration items / 描述配置项
    fn provider_info(&self) -> ProviderInfo;

    /// Create a provider instance from JSON config / 创建提供者实例
    fn create_provider(&self, config: Value) -> Result<Box<dyn StorageProvider>>;
}

/// Storage manager (mounted provider instances) / 存储管理器
#[derive(Clone, Default)]
pub struct StorageManager {
    providers: Arc<RwLock<HashMap<String, ProviderBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<dyn ProviderFactory>>>>,
    /// Provider error status (mount -> error message) / 提供者错误状态
    provider_errors: Arc<RwLock<HashMap<String, String>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register provider factory / 注册提供者工厂
    pub async fn register_factory(&self, factory: Box<dyn ProviderFactory>) -> Result<()> {
        let provider_type = factory.provider_type().to_string();

        let mut factories = self.factories.write().await;
        factories.insert(provider_type.clone(), Arc::from(factory));

        tracing::info!("Provider factory registered: {}", provider_type);
        Ok(())
    }

    /// Create and mount a provider (verify on success, record error on failure) / 创建并挂载提供者
    pub async fn create_provider(&self, mount_path: &str, provider_type: &str, config: Value) -> Result<String> {
        let mount = fix_and_clean_path(mount_path);
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(provider_type)
                .cloned()
                .ok_or_else(|| anyhow!("Provider type not found: {}", provider_type))?
        };

        let provider: ProviderBox = match factory.create_provider(config) {
            Ok(provider) => Arc::from(provider),
            Err(e) => {
                let error_msg = e.to_string();
                self.provider_errors.write().await.insert(mount.clone(), error_msg.clone());
                tracing::error!("Provider creation failed: {} ({}) - {}", mount, provider_type, error_msg);
                return Err(e);
            }
        };

        // Verify provider validity: read root metadata / 验证提供者有效性
        let validation = provider.metadata("").await;

        self.providers.write().await.insert(mount.clone(), provider);

        match validation {
            Ok(_) => {
                self.provider_errors.write().await.remove(&mount);
                tracing::info!("Provider mounted and verified: {} ({})", mount, provider_type);
            }
            Err(e) => {
                // Keep the mount; the backend may recover / 保留挂载
                let error_msg = e.to_string();
                self.provider_errors.write().await.insert(mount.clone(), error_msg.clone());
                tracing::warn!("Provider mounted but verification failed: {} ({}) - {}", mount, provider_type, error_msg);
            }
        }

        Ok(mount)
    }

    /// Get provider error status / 获取提供者错误状态
    pub async fn get_provider_error(&self, mount_path: &str) -> Option<String> {
        let errors = self.provider_errors.read().await;
        errors.get(&fix_and_clean_path(mount_path)).cloned()
    }

    /// Get provider instance / 获取提供者实例
    pub async fn get_provider(&self, mount_path: &str) -> Option<ProviderBox> {
        let providers = self.providers.read().await;
        providers.get(&fix_and_clean_path(mount_path)).cloned()
    }

    /// Remove provider instance / 移除提供者实例
    pub async fn remove_provider(&self, mount_path: &str) -> Result<()> {
        let mount = fix_and_clean_path(mount_path);
        self.providers
            .write()
            .await
            .remove(&mount)
            .ok_or_else(|| anyhow!("Provider not found: {}", mount))?;
        self.provider_errors.write().await.remove(&mount);

        tracing::info!("Provider removed: {}", mount);
        Ok(())
    }

    /// List mount paths / 列出所有挂载点
    pub async fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut mounts: Vec<String> = providers.keys().cloned().collect();
        mounts.sort();
        mounts
    }

    /// List all available provider types / 列出所有可用的提供者类型
    pub async fn list_provider_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut types: Vec<String> = factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Describe every registered factory / 获取所有工厂描述
    pub async fn provider_infos(&self) -> Vec<ProviderInfo> {
        let factories = self.factories.read().await;
        factories.values().map(|f| f.provider_info()).collect()
    }

    /// Resolve a virtual path to (provider, storage key) by longest mount prefix.
    /// The key has no leading `/`; a trailing `/` is kept. / 根据路径解析到对应的提供者
    pub async fn resolve_path(&self, path: &str) -> Option<(ProviderBox, String)> {
        let is_folder = path.ends_with('/');
        let normalized = fix_and_clean_path(path);
        let providers = self.providers.read().await;

        let mut best_match: Option<(&String, &ProviderBox)> = None;
        for (mount, provider) in providers.iter() {
            let matches = mount == "/"
                || normalized == *mount
                || normalized.starts_with(&format!("{}/", mount));
            if matches && best_match.map(|(m, _)| m.len() < mount.len()).unwrap_or(true) {
                best_match = Some((mount, provider));
            }
        }

        best_match.map(|(mount, provider)| {
            let relative = if mount == "/" {
                &normalized[1..]
            } else {
                normalized[mount.len()..].trim_start_matches('/')
            };
            let key = if is_folder && !relative.is_empty() {
                format!("{}/", relative)
            } else {
                relative.to_string()
            };
            (provider.clone(), key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalProviderFactory;

    async fn manager_with_mounts(root: &std::path::Path) -> StorageManager {
        let manager = StorageManager::new();
        manager.register_factory(Box::new(LocalProviderFactory)).await.unwrap();
        for mount in ["/", "/data", "/data/archive"] {
            let dir = root.join(mount.trim_start_matches('/').replace('/', "_"));
            manager
                .create_provider(mount, "local", serde_json::json!({ "root": dir }))
                .await
                .unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn test_resolve_longest_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_with_mounts(tmp.path()).await;

        let (provider, key) = manager.resolve_path("/data/archive/2024/a.txt").await.unwrap();
        let archive = manager.get_provider("/data/archive").await.unwrap();
        assert!(Arc::ptr_eq(&provider, &archive));
        assert_eq!(key, "2024/a.txt");

        let (provider, key) = manager.resolve_path("/data/notes/").await.unwrap();
        let data = manager.get_provider("/data").await.unwrap();
        assert!(Arc::ptr_eq(&provider, &data));
        assert_eq!(key, "notes/");

        let (provider, key) = manager.resolve_path("/database.txt").await.unwrap();
        let root = manager.get_provider("/").await.unwrap();
        assert!(Arc::ptr_eq(&provider, &root));
        assert_eq!(key, "database.txt");
    }

    #[tokio::test]
    async fn test_resolve_mount_root() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_with_mounts(tmp.path()).await;

        let (_, key) = manager.resolve_path("/data").await.unwrap();
        assert_eq!(key, "");
        let (_, key) = manager.resolve_path("/").await.unwrap();
        assert_eq!(key, "");
    }

    #[tokio::test]
    async fn test_unknown_provider_type() {
        let manager = StorageManager::new();
        let err = manager
            .create_provider("/x", "nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Provider type not found"));
        assert!(manager.resolve_path("/x/file").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_with_mounts(tmp.path()).await;
        assert_eq!(manager.list_providers().await, vec!["/", "/data", "/data/archive"]);

        manager.remove_provider("/data/archive/").await.unwrap();
        assert_eq!(manager.list_providers().await, vec!["/", "/data"]);
        assert!(manager.remove_provider("/data/archive").await.is_err());
    }

    #[tokio::test]
    async fn test_factory_error_is_recorded() {
        let manager = StorageManager::new();
        manager.register_factory(Box::new(LocalProviderFactory)).await.unwrap();
        assert!(manager.create_provider("/bad", "local", serde_json::json!({})).await.is_err());
        assert!(manager.get_provider_error("/bad").await.is_some());
    }
}
