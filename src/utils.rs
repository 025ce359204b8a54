//! Path processing utility functions / 路径处理工具函数

use crate::storage::{ProviderError, ProviderResult};

/// Clean and normalize path / 清理和规范化路径
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Ensure path starts with / / 确保路径以 / 开头
/// 3. Clean . and .. in path / 清理路径中的 . 和 ..
pub fn fix_and_clean_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };

    clean_path(&path)
}

/// Clean path, handle ., .. and duplicate / / 清理路径，处理 . 和 .. 和重复的 /
fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Validate a storage key and strip the leading `/` / 校验存储键
///
/// Rejects `.`/`..` segments, empty segments and control characters. A
/// trailing `/` (folder marker) is kept; the root comes back as `""`.
pub fn normalize_key(path: &str) -> ProviderResult<String> {
    let key = path.trim_start_matches('/');
    if key.is_empty() {
        return Ok(String::new());
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(ProviderError::invalid_path(path, "control characters are not allowed"));
    }

    let body = key.strip_suffix('/').unwrap_or(key);
    for segment in body.split('/') {
        match segment {
            "" => return Err(ProviderError::invalid_path(path, "empty path segment")),
            "." | ".." => return Err(ProviderError::invalid_path(path, "relative segments are not allowed")),
            _ => {}
        }
    }

    Ok(key.to_string())
}

/// Last segment of a key, ignoring a trailing `/` / 获取文件名
pub fn key_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Is this key a folder (root or trailing `/`) / 是否为目录键
pub fn is_folder_key(key: &str) -> bool {
    key.is_empty() || key.ends_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_and_clean_path() {
        assert_eq!(fix_and_clean_path(""), "/");
        assert_eq!(fix_and_clean_path("."), "/");
        assert_eq!(fix_and_clean_path(".."), "/");
        assert_eq!(fix_and_clean_path("a/b/c"), "/a/b/c");
        assert_eq!(fix_and_clean_path("a\\b\\c"), "/a/b/c");
        assert_eq!(fix_and_clean_path("/a//b///c"), "/a/b/c");
        assert_eq!(fix_and_clean_path("/a/./b/../c"), "/a/c");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("/").unwrap(), "");
        assert_eq!(normalize_key("/docs/a.txt").unwrap(), "docs/a.txt");
        assert_eq!(normalize_key("docs/").unwrap(), "docs/");
        assert!(normalize_key("docs//a.txt").is_err());
        assert!(normalize_key("docs/../a.txt").is_err());
        assert!(normalize_key("docs/a\n.txt").is_err());
    }

    #[test]
    fn test_key_name() {
        assert_eq!(key_name("docs/a.txt"), "a.txt");
        assert_eq!(key_name("docs/sub/"), "sub");
        assert_eq!(key_name("top"), "top");
        assert!(is_folder_key(""));
        assert!(is_folder_key("docs/"));
        assert!(!is_folder_key("docs/a.txt"));
    }
}
