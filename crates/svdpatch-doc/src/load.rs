use std::path::Path;

use indexmap::IndexMap;

use crate::error::DocError;
use crate::value::PatchValue;

/// Load a patch document's root YAML file: parse it (rejecting duplicate
/// mapping keys), stamp `_path` with the file's own location, and require
/// an `_svd` key per §6.1.
pub fn load_root(path: &Path) -> Result<IndexMap<String, PatchValue>, DocError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: PatchValue = serde_yaml::from_str(&text).map_err(|source| DocError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut map = match value {
        PatchValue::Mapping(m) => m,
        _ => return Err(DocError::NotAMapping(path.to_path_buf())),
    };
    if !map.contains_key("_svd") {
        return Err(DocError::MissingSvdKey {
            path: path.to_path_buf(),
        });
    }
    map.insert(
        "_path".to_string(),
        PatchValue::String(path.to_string_lossy().into_owned()),
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_svd_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.yaml");
        std::fs::write(&path, "UART0:\n  _modify: {}\n").unwrap();
        let err = load_root(&path).unwrap_err();
        assert!(matches!(err, DocError::MissingSvdKey { .. }));
    }

    #[test]
    fn stamps_path_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.yaml");
        std::fs::write(&path, "_svd: device.svd\n").unwrap();
        let map = load_root(&path).unwrap();
        assert_eq!(map.get("_path").unwrap().as_str(), Some(path.to_str().unwrap()));
    }

    #[test]
    fn rejects_duplicate_keys_with_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.yaml");
        std::fs::write(&path, "_svd: device.svd\na: 1\na: 2\n").unwrap();
        let err = load_root(&path).unwrap_err();
        assert!(matches!(err, DocError::Parse { .. }));
    }
}
