//! Helpers for `/`-separated container paths

use crate::{Error, Result};

/// Normalize a location path: absolute, no trailing separator except for the root.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for relative paths or empty components.
pub fn normalize(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "path must be absolute"));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    if trimmed[1..].split('/').any(str::is_empty) {
        return Err(Error::invalid_path(path, "empty path component"));
    }
    Ok(trimmed.to_string())
}

/// Join a normalized location and an instance name.
pub fn join(location: &str, name: &str) -> String {
    if name.is_empty() {
        return location.to_string();
    }
    if location == "/" || location.is_empty() {
        format!("/{name}")
    } else {
        format!("{location}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("/acquisition/").unwrap(), "/acquisition");
        assert_eq!(normalize("/a/b").unwrap(), "/a/b");
        assert!(normalize("relative").is_err());
        assert!(normalize("/a//b").is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "x"), "/x");
        assert_eq!(join("/a", "x"), "/a/x");
        assert_eq!(join("/a", ""), "/a");
    }
}
