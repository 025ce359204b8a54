pub mod config;
pub mod utils;
pub mod storage;

// Provider modules (point to project root drivers via path attribute) / 提供者模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

// Register all storage providers (call unified registration function from drivers module) / 注册所有存储提供者
pub async fn register_storage_providers(manager: &storage::StorageManager) -> anyhow::Result<()> {
    drivers::register_all(manager).await
}
