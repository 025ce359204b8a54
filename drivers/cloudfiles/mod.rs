//! Rackspace Cloud Files provider / Rackspace Cloud Files 对象存储提供者
//!
//! Token-authenticated, region-scoped object storage (OpenStack Swift API).
//! Reads and writes use HMAC-signed temp URLs.

mod config;
mod driver;
mod factory;
mod signer;
mod types;

pub use config::{CloudFilesConfig, IDENTITY_URL};
pub use driver::CloudFilesProvider;
pub use factory::CloudFilesProviderFactory;
