// Provider package / 提供者包
pub mod cloudfiles;
pub mod local;

use crate::storage::StorageManager;

/// Register all providers to StorageManager / 注册所有提供者
pub async fn register_all(manager: &StorageManager) -> anyhow::Result<()> {
    // Register local provider (using LocalProviderFactory from storage module) / 注册本地存储
    manager.register_factory(Box::new(crate::storage::LocalProviderFactory)).await?;
    // Register Rackspace Cloud Files provider / 注册Cloud Files对象存储
    manager.register_factory(Box::new(cloudfiles::CloudFilesProviderFactory)).await?;
    Ok(())
}
