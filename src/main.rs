use anyhow::{anyhow, bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fileway_backend::config;
use fileway_backend::storage::{Download, ProviderBox, StorageManager, UploadStream};

const USAGE: &str = "Usage: fileway-backend [ls <path> | url <path> | cat <path> | put <local file> <path> | rm <path>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fileway_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        "fileway-backend {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TARGET"),
        env!("BUILD_TIME")
    );

    // Load configuration / 加载配置
    let app_config = config::init_config().map_err(|e| anyhow!(e))?.read().clone();

    let storage_manager = StorageManager::new();
    fileway_backend::register_storage_providers(&storage_manager).await?;

    // Mount configured providers / 挂载配置的存储
    for mount in &app_config.mounts {
        let provider_config = mount.provider_config(&app_config.http);
        if let Err(e) = storage_manager
            .create_provider(&mount.mount_path, &mount.provider, provider_config)
            .await
        {
            tracing::error!("Failed to mount {} ({}): {}", mount.mount_path, mount.provider, e);
        }
    }
    tracing::info!("Mounted: {:?}", storage_manager.list_providers().await);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => Ok(()),
        ["ls", path] => list(&storage_manager, path).await,
        ["url", path] => direct_url(&storage_manager, path).await,
        ["cat", path] => cat(&storage_manager, path).await,
        ["put", local, path] => put(&storage_manager, local, path).await,
        ["rm", path] => remove(&storage_manager, path).await,
        _ => bail!(USAGE),
    }
}

async fn resolve(manager: &StorageManager, path: &str) -> anyhow::Result<(ProviderBox, String)> {
    manager
        .resolve_path(path)
        .await
        .ok_or_else(|| anyhow!("No provider mounted for {}", path))
}

async fn list(manager: &StorageManager, path: &str) -> anyhow::Result<()> {
    let (provider, key) = resolve(manager, path).await?;
    for entry in provider.metadata(&key).await?.into_entries() {
        let kind = if entry.is_dir { "d" } else { "-" };
        println!(
            "{} {:>12} {:<32} {}",
            kind,
            entry.size,
            entry.modified.as_deref().unwrap_or("-"),
            entry.path
        );
    }
    Ok(())
}

async fn direct_url(manager: &StorageManager, path: &str) -> anyhow::Result<()> {
    let (provider, key) = resolve(manager, path).await?;
    match provider.download(&key, true).await? {
        Download::Url(url) => {
            println!("{}", url);
            Ok(())
        }
        Download::Stream(_) => bail!("{} does not support direct links", provider.name()),
    }
}

async fn cat(manager: &StorageManager, path: &str) -> anyhow::Result<()> {
    let (provider, key) = resolve(manager, path).await?;
    let resp = match provider.download(&key, false).await? {
        Download::Stream(resp) => resp,
        Download::Url(url) => bail!("Unexpected direct link: {}", url),
    };
    let mut reader = resp.into_reader();
    let mut stdout = tokio::io::stdout();
    tokio::io::copy(&mut reader, &mut stdout).await?;
    Ok(())
}

async fn put(manager: &StorageManager, local: &str, path: &str) -> anyhow::Result<()> {
    let (provider, key) = resolve(manager, path).await?;
    let source = UploadStream::from_file(local)
        .await
        .with_context(|| format!("Failed to open {}", local))?;
    let size = source.size();
    let resp = provider.upload(source, &key).await?;
    tracing::info!("Uploaded {} bytes to {} (status {})", size, path, resp.status_code());
    Ok(())
}

async fn remove(manager: &StorageManager, path: &str) -> anyhow::Result<()> {
    let (provider, key) = resolve(manager, path).await?;
    let resp = provider.delete(&key).await?;
    tracing::info!("Deleted {} (status {})", path, resp.status_code());
    Ok(())
}
