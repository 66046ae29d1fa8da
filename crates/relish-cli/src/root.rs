use relish_core::paths::RELISH_DIR;
use std::path::{Path, PathBuf};

/// Resolve the family root directory.
///
/// Priority:
/// 1. `--root` flag / `RELISH_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.relish/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd).unwrap_or(cwd)
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(RELISH_DIR).is_dir())
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
    fn finds_relish_dir_above_start() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".relish")).unwrap();
        let deep = dir.path().join("kids/ada");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_root_from(&deep).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_relish_dir_finds_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_root_from(dir.path()), None);
    }
}
