use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::DocError;
use crate::path::abspath;
use crate::value::PatchValue;

/// Recursively merge every key of `child` into `parent`, with `parent`
/// overriding: sequences concatenate, mappings merge recursively, and
/// scalars are left alone when `parent` already has the key. `_path` and
/// `_include` are never merged.
pub fn update_dict(parent: &mut IndexMap<String, PatchValue>, child: &IndexMap<String, PatchValue>) {
    for (key, child_val) in child {
        if key == "_path" || key == "_include" {
            continue;
        }
        match parent.get_mut(key) {
            Some(PatchValue::Sequence(seq)) => {
                if let PatchValue::Sequence(child_seq) = child_val {
                    seq.extend(child_seq.iter().cloned());
                }
            }
            Some(PatchValue::Mapping(map)) => {
                if let PatchValue::Mapping(child_map) = child_val {
                    update_dict(map, child_map);
                }
            }
            Some(_) => {}
            None => {
                parent.insert(key.clone(), child_val.clone());
            }
        }
    }
}

fn path_of(map: &IndexMap<String, PatchValue>) -> Result<PathBuf, DocError> {
    map.get("_path")
        .and_then(PatchValue::as_str)
        .map(PathBuf::from)
        .ok_or(DocError::MissingPathKey)
}

/// Recursively resolve every `_include` entry of `parent` (and of any
/// peripheral-level `_include` nested directly inside it), merging each
/// included document's contents into `parent` via [`update_dict`]. Returns
/// the full list of file paths that were included, transitively, in the
/// order they were first loaded — used verbatim by the dependency-file
/// writer.
///
/// A path already seen while processing `parent`'s own `_include` list is
/// skipped; paths reachable through two different include chains are not
/// deduplicated against each other, matching the original engine.
pub fn resolve_includes(parent: &mut IndexMap<String, PatchValue>) -> Result<Vec<PathBuf>, DocError> {
    let mut included: Vec<PathBuf> = Vec::new();

    let relpaths: Vec<String> = match parent.get("_include").and_then(PatchValue::as_sequence) {
        Some(seq) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        None => Vec::new(),
    };
    if relpaths.is_empty() {
        return Ok(included);
    }

    let from_path = path_of(parent)?;

    for relpath in relpaths {
        let path = abspath(&from_path, &relpath);
        if included.contains(&path) {
            continue;
        }
        tracing::debug!(?path, "including");

        let text = std::fs::read_to_string(&path).map_err(|source| DocError::Io {
            path: path.clone(),
            source,
        })?;
        let mut child_value: PatchValue = serde_yaml::from_str(&text).map_err(|source| DocError::Parse {
            path: path.clone(),
            source,
        })?;
        let child_map = match &mut child_value {
            PatchValue::Mapping(m) => m,
            _ => return Err(DocError::NotAMapping(path.clone())),
        };
        child_map.insert(
            "_path".to_string(),
            PatchValue::String(path.to_string_lossy().into_owned()),
        );
        included.push(path.clone());

        // Peripheral-level includes: any non-directive key whose own value
        // has an `_include` gets stamped with this file's path and resolved
        // first.
        let pspecs: Vec<String> = child_map
            .iter()
            .filter(|(k, v)| !k.starts_with('_') && v.get("_include").is_some())
            .map(|(k, _)| k.clone())
            .collect();
        for pspec in pspecs {
            if let Some(PatchValue::Mapping(pmap)) = child_map.get_mut(&pspec) {
                pmap.insert(
                    "_path".to_string(),
                    PatchValue::String(path.to_string_lossy().into_owned()),
                );
                included.extend(resolve_includes(pmap)?);
            }
        }

        // Top-level includes inside the child itself.
        included.extend(resolve_includes(child_map)?);

        update_dict(parent, child_map);
    }

    Ok(included)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::load_root;

    #[test]
    fn merges_included_peripheral_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("included.yaml"),
            "UART0:\n  _modify:\n    CR1:\n      resetValue: \"0x1\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("root.yaml"),
            "_svd: device.svd\n_include:\n  - included.yaml\n",
        )
        .unwrap();
        let root_path = dir.path().join("root.yaml");
        let mut root = load_root(&root_path).unwrap();
        let included = resolve_includes(&mut root).unwrap();
        assert_eq!(included.len(), 1);
        assert!(root.get("UART0").is_some());
    }

    #[test]
    fn update_dict_concatenates_sequences_and_merges_mappings() {
        let mut parent = IndexMap::new();
        parent.insert(
            "_delete".to_string(),
            PatchValue::Sequence(vec![PatchValue::String("A".into())]),
        );
        let mut parent_mod = IndexMap::new();
        parent_mod.insert("x".to_string(), PatchValue::String("1".into()));
        parent.insert("_modify".to_string(), PatchValue::Mapping(parent_mod));

        let mut child = IndexMap::new();
        child.insert(
            "_delete".to_string(),
            PatchValue::Sequence(vec![PatchValue::String("B".into())]),
        );
        let mut child_mod = IndexMap::new();
        child_mod.insert("y".to_string(), PatchValue::String("2".into()));
        child.insert("_modify".to_string(), PatchValue::Mapping(child_mod));

        update_dict(&mut parent, &child);

        let deletes = parent.get("_delete").unwrap().as_sequence().unwrap();
        assert_eq!(deletes.len(), 2);
        let modify = parent.get("_modify").unwrap().as_mapping().unwrap();
        assert!(modify.contains_key("x"));
        assert!(modify.contains_key("y"));
    }
}
