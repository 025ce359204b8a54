//! Cloud Files provider factory / Cloud Files 提供者工厂

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::storage::{ConfigItem, ProviderFactory, ProviderInfo, StorageProvider};
use super::config::{CloudFilesConfig, IDENTITY_URL};
use super::driver::CloudFilesProvider;

pub struct CloudFilesProviderFactory;

impl ProviderFactory for CloudFilesProviderFactory {
    fn provider_type(&self) -> &'static str {
        "cloudfiles"
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type().to_string(),
            name: "Rackspace Cloud Files".to_string(),
            items: vec![
                ConfigItem::new("username", "string")
                    .title("Username")
                    .required(),
                ConfigItem::new("api_key", "password")
                    .title("API Key")
                    .required(),
                ConfigItem::new("region", "string")
                    .title("Region")
                    .help("Storage region, e.g. DFW, ORD, IAD")
                    .required(),
                ConfigItem::new("container", "string")
                    .title("Container")
                    .required(),
                ConfigItem::new("identity_url", "string")
                    .title("Identity URL")
                    .default(IDENTITY_URL),
                ConfigItem::new("temp_url_secs", "number")
                    .title("Signed URL validity")
                    .help("Seconds a signed download/upload URL stays valid")
                    .default("60"),
                ConfigItem::new("timeout_secs", "number")
                    .title("Request timeout")
                    .default("30"),
            ],
        }
    }

    fn create_provider(&self, config: Value) -> Result<Box<dyn StorageProvider>> {
        let config: CloudFilesConfig = serde_json::from_value(config)
            .map_err(|e| anyhow!("Failed to parse cloudfiles config: {}", e))?;
        Ok(Box::new(CloudFilesProvider::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_from_json() {
        let provider = CloudFilesProviderFactory
            .create_provider(serde_json::json!({
                "username": "alice",
                "api_key": "key",
                "region": "DFW",
                "container": "photos",
            }))
            .unwrap();
        assert_eq!(provider.name(), "cloudfiles");
        assert!(provider.capabilities().can_direct_link);
    }

    #[test]
    fn test_create_provider_rejects_missing_fields() {
        let err = CloudFilesProviderFactory
            .create_provider(serde_json::json!({ "username": "alice" }))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to parse cloudfiles config"));
    }

    #[test]
    fn test_info_lists_required_items() {
        let info = CloudFilesProviderFactory.provider_info();
        let required: Vec<&str> = info.items.iter().filter(|i| i.required).map(|i| i.name.as_str()).collect();
        assert_eq!(required, vec!["username", "api_key", "region", "container"]);
    }
}
