use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;

use super::{ConfigItem, ProviderFactory, ProviderInfo, StorageProvider};
use crate::drivers::local;

pub struct LocalProviderFactory;

impl ProviderFactory for LocalProviderFactory {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type().to_string(),
            name: "Local".to_string(),
            items: vec![
                ConfigItem::new("root", "string")
                    .title("Root directory")
                    .required()
                    .help("Created if it does not exist / 不存在时自动创建"),
            ],
        }
    }

    fn create_provider(&self, config: Value) -> Result<Box<dyn StorageProvider>> {
        let root_path = config.get("root")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing root config / 缺少 root 配置"))?;

        let root = PathBuf::from(root_path);

        // 同步初始化（工厂方法是同步的）
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        let canonical_root = root.canonicalize()?;

        tracing::info!("Local provider initialized, root: {:?}", canonical_root);

        Ok(Box::new(local::LocalProvider::new(canonical_root)))
    }
}
