use std::path::{Component, Path, PathBuf};

/// Resolves `relpath` against the directory containing `from_path`, the way
/// the original engine's `abspath` helper does: canonicalize the directory
/// `from_path` lives in (resolving symlinks), then lexically normalize the
/// join with `relpath` (without requiring the target to exist yet).
pub fn abspath(from_path: &Path, relpath: &str) -> PathBuf {
    let from_abs = if from_path.is_absolute() {
        from_path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_default()
            .join(from_path)
    };
    let base_dir = from_abs
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let base_dir = std::fs::canonicalize(&base_dir).unwrap_or(base_dir);
    normalize(&base_dir.join(relpath))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_sibling_path() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("root.yaml");
        std::fs::write(&from, "").unwrap();
        let resolved = abspath(&from, "included.yaml");
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("included.yaml"));
    }

    #[test]
    fn collapses_parent_dir_segments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let from = dir.path().join("sub").join("root.yaml");
        std::fs::write(&from, "").unwrap();
        let resolved = abspath(&from, "../top.yaml");
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("top.yaml"));
    }
}
