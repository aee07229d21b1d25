use crm_core::paths::CRM_DIR;
use std::path::{Path, PathBuf};

/// Resolve the CRM root directory.
///
/// Priority:
/// 1. `--root` flag / `CRM_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.crm/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marker(&cwd).unwrap_or(cwd)
}

fn find_marker(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CRM_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn finds_crm_dir_above() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".crm")).unwrap();
        let deep = dir.path().join("notes/2025");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_marker(&deep).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_marker_found() {
        let dir = TempDir::new().unwrap();
        assert!(find_marker(dir.path()).is_none());
    }
}
