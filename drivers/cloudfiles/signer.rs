//! Temp URL signing / 临时URL签名

use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

use crate::storage::{ProviderError, ProviderResult};

type HmacSha1 = Hmac<Sha1>;

/// Hex HMAC-SHA1 digest / HMAC-SHA1 十六进制摘要
pub fn hmac_sha1_hex(key: &str, data: &str) -> ProviderResult<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| ProviderError::unavailable(format!("Invalid temp url key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signature over `METHOD\nexpires\npath` / 计算临时URL签名
pub fn temp_url_signature(key: &str, method: &str, expires: i64, path: &str) -> ProviderResult<String> {
    let body = format!("{}\n{}\n{}", method.to_uppercase(), expires, path);
    hmac_sha1_hex(key, &body)
}

/// Append `temp_url_sig` and `expires` to an object URL.
///
/// The backend verifies against the decoded request path, so the signature
/// is computed over the percent-decoded form of `url.path()`.
pub fn sign_url(url: &mut Url, key: &str, method: &str, expires: i64) -> ProviderResult<()> {
    let path = urlencoding::decode(url.path())
        .map_err(|e| ProviderError::invalid_path(url.path(), e.to_string()))?
        .into_owned();
    let signature = temp_url_signature(key, method, expires, &path)?;

    url.query_pairs_mut()
        .append_pair("temp_url_sig", &signature)
        .append_pair("expires", &expires.to_string());
    Ok(())
}
