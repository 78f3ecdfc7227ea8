use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Runs the full device driver pipeline for a root patch document: load,
/// resolve includes, parse the named SVD, apply the patch, and write
/// `<svd>.patched` next to the original file.
pub fn run(yaml_path: &Path) -> Result<PathBuf> {
    let mut doc = svdpatch_doc::load_root(yaml_path)
        .with_context(|| format!("loading {}", yaml_path.display()))?;
    svdpatch_doc::resolve_includes(&mut doc)
        .with_context(|| format!("resolving includes for {}", yaml_path.display()))?;

    let svd_name = doc
        .get("_svd")
        .and_then(svdpatch_doc::PatchValue::as_str)
        .context("patch document is missing its '_svd' key")?;
    let svd_path = svdpatch_doc::abspath(yaml_path, svd_name);

    let mut svd = svdpatch_tree::parse_file(&svd_path)
        .with_context(|| format!("parsing {}", svd_path.display()))?;

    svdpatch_core::process_device(&mut svd, &doc, true)
        .with_context(|| format!("patching {}", svd_path.display()))?;

    let out_path = {
        let mut s = svd_path.clone().into_os_string();
        s.push(".patched");
        PathBuf::from(s)
    };
    svdpatch_tree::write_file(&svd, &out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device>
  <name>TestDevice</name>
  <peripherals>
    <peripheral>
      <name>UART0</name>
      <baseAddress>0x40001000</baseAddress>
      <registers>
        <register>
          <name>CR1</name>
          <addressOffset>0x0</addressOffset>
          <resetValue>0x0</resetValue>
        </register>
      </registers>
    </peripheral>
  </peripherals>
</device>
"#;

    #[test]
    fn patches_svd_and_writes_patched_file() {
        let dir = tempfile::tempdir().unwrap();
        let svd_path = dir.path().join("test.svd");
        let yaml_path = dir.path().join("test.yaml");
        std::fs::write(&svd_path, SVD).unwrap();
        std::fs::write(
            &yaml_path,
            "_svd: test.svd\nUART0:\n  _modify:\n    CR1:\n      resetValue: \"0x1\"\n",
        )
        .unwrap();

        let out_path = run(&yaml_path).unwrap();
        let expected = {
            let mut s = svd_path.canonicalize().unwrap().into_os_string();
            s.push(".patched");
            PathBuf::from(s)
        };
        assert_eq!(out_path, expected);

        let patched = std::fs::read_to_string(&out_path).unwrap();
        assert!(patched.contains("<resetValue>0x1</resetValue>"));
    }
}
