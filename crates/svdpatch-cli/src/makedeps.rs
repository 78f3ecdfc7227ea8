use std::path::Path;

use anyhow::{Context, Result};
use svdpatch_doc::PatchValue;

/// Parses a root document for dependency listing only: unlike
/// [`svdpatch_doc::load_root`], this does not require an `_svd` key, since
/// `makedeps` never loads the SVD it names.
fn load_for_deps(path: &Path) -> Result<indexmap::IndexMap<String, PatchValue>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: PatchValue =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let mut map = value
        .as_mapping()
        .with_context(|| format!("{} is not a mapping at the document root", path.display()))?
        .clone();
    map.insert(
        "_path".to_string(),
        PatchValue::String(path.to_string_lossy().into_owned()),
    );
    Ok(map)
}

/// Resolves a root patch document's includes and writes a Makefile-style
/// dependency line listing every file transitively reached, without ever
/// touching the SVD it names.
pub fn run(yaml_path: &Path, deps_path: &Path) -> Result<()> {
    let mut doc = load_for_deps(yaml_path)?;
    let deps = svdpatch_doc::resolve_includes(&mut doc)
        .with_context(|| format!("resolving includes for {}", yaml_path.display()))?;

    let line = format!(
        "{}: {}\n",
        deps_path.display(),
        deps.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" "),
    );
    std::fs::write(deps_path, line).with_context(|| format!("writing {}", deps_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_dependency_line_for_transitive_includes() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("test.yaml");
        let inc1 = dir.path().join("inc1.yaml");
        let inc2 = dir.path().join("inc2.yaml");
        let deps = dir.path().join("test.d");

        std::fs::write(&yaml, "_include:\n  - inc1.yaml\n").unwrap();
        std::fs::write(&inc1, "_include:\n  - inc2.yaml\n").unwrap();
        std::fs::write(&inc2, "{}\n").unwrap();

        run(&yaml, &deps).unwrap();

        let contents = std::fs::read_to_string(&deps).unwrap();
        assert_eq!(
            contents,
            format!(
                "{}: {} {}\n",
                deps.display(),
                inc1.canonicalize().unwrap().display(),
                inc2.canonicalize().unwrap().display(),
            )
        );
    }
}
