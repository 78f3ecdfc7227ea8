use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use svdpatch_tree::Element;

pub(crate) struct Interrupt {
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) pname: String,
}

pub(crate) fn collect(device: &Element) -> BTreeMap<u32, Interrupt> {
    let mut interrupts = BTreeMap::new();
    let Some(peripherals) = device.child("peripherals") else {
        return interrupts;
    };
    for ptag in peripherals.children_named("peripheral") {
        let pname = ptag.find_text("name").unwrap_or_default().to_string();
        for itag in ptag.children_named("interrupt") {
            let name = itag.find_text("name").unwrap_or_default().to_string();
            let Some(value) = itag.find_text("value").and_then(svdpatch_core::parse_int) else {
                continue;
            };
            let desc = itag.find_text("description").unwrap_or_default().replace('\n', " ");
            interrupts.insert(value, Interrupt { name, desc, pname: pname.clone() });
        }
    }
    interrupts
}

/// Lists every interrupt in `device`, sorted by value, one per line as
/// `"{value} {name}: {description} (in {peripheral})"`. When `gaps` is set,
/// appends a trailing `"Gaps: ..."` line naming the unused values skipped
/// between the lowest and highest interrupt seen.
pub fn format_interrupts(device: &Element, gaps: bool) -> String {
    let interrupts = collect(device);
    let mut missing = Vec::new();
    let mut lastint: i64 = -1;
    let mut lines = Vec::new();

    for (&value, i) in &interrupts {
        for v in (lastint + 1)..(value as i64) {
            missing.push(v);
        }
        lastint = value as i64;
        lines.push(format!("{value} {}: {} (in {})", i.name, i.desc, i.pname));
    }

    if gaps {
        let missing = missing.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
        lines.push(format!("Gaps: {missing}"));
    }

    lines.join("\n")
}

pub fn run(svd_path: &Path, gaps: bool) -> Result<String> {
    let device = svdpatch_tree::parse_file(svd_path)
        .with_context(|| format!("parsing {}", svd_path.display()))?;
    Ok(format_interrupts(&device, gaps))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVD: &str = r#"
<device>
    <name>Test Device</name>
    <peripherals>
        <peripheral>
            <name>PeriphA</name>
            <interrupt>
                <name>INT_A1</name>
                <description>Interrupt A1</description>
                <value>1</value>
            </interrupt>
        </peripheral>
        <peripheral>
            <name>PeriphB</name>
            <interrupt>
                <name>INT_B3</name>
                <description>Interrupt B3</description>
                <value>3</value>
            </interrupt>
        </peripheral>
    </peripherals>
</device>
"#;

    #[test]
    fn lists_interrupts_sorted_with_gaps() {
        let device = svdpatch_tree::parse_str(SVD, Path::new("test.svd")).unwrap();
        let out = format_interrupts(&device, true);
        assert_eq!(
            out,
            "1 INT_A1: Interrupt A1 (in PeriphA)\n3 INT_B3: Interrupt B3 (in PeriphB)\nGaps: 0, 2"
        );
    }

    #[test]
    fn omits_gap_line_when_disabled() {
        let device = svdpatch_tree::parse_str(SVD, Path::new("test.svd")).unwrap();
        let out = format_interrupts(&device, false);
        assert!(!out.contains("Gaps"));
    }
}
