// Filesystem path utilities.
// Locates the per-application directories and resolves cache entry paths.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Application name used for platform directories.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the base cache directory (~/.cache/apihost on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the configuration directory (~/.config/apihost on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the persisted settings document.
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.json"))
}

/// Path of a cache entry.
///
/// The key is joined verbatim: no sanitizing, no `..` checks. Callers are
/// responsible for handing in keys that are safe file names.
pub fn entry_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_uses_key_verbatim() {
        let dir = Path::new("/var/cache/apihost");
        assert_eq!(
            entry_path(dir, "cover-42.jpg"),
            PathBuf::from("/var/cache/apihost/cover-42.jpg")
        );
        assert!(entry_path(dir, "../escape").ends_with("apihost/../escape"));
    }

    #[test]
    fn test_settings_path_file_name() {
        if let Some(path) = settings_path() {
            assert!(path.ends_with("settings.json"));
        }
    }
}
