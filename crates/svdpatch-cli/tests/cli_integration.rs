use std::path::PathBuf;
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_svdpatch"))
}

#[test]
fn interrupts_lists_values_with_gaps() {
    let output = bin()
        .args(["interrupts", fixture("interrupts.svd").to_str().unwrap()])
        .output()
        .expect("failed to run svdpatch interrupts");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim_end(),
        "1 INT_A1: Interrupt A1 (in PeriphA)\n3 INT_B3: Interrupt B3 (in PeriphB)\nGaps: 0, 2"
    );
}

#[test]
fn interrupts_no_gaps_omits_trailing_line() {
    let output = bin()
        .args(["interrupts", "--no-gaps", fixture("interrupts.svd").to_str().unwrap()])
        .output()
        .expect("failed to run svdpatch interrupts");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Gaps"));
}

#[test]
fn patch_collects_array_and_writes_patched_svd() {
    let dir = tempfile::tempdir().unwrap();
    let svd_path = dir.path().join("array_collect.svd");
    let yaml_path = dir.path().join("array_collect.yaml");
    std::fs::copy(fixture("array_collect.svd"), &svd_path).unwrap();
    std::fs::copy(fixture("array_collect.yaml"), &yaml_path).unwrap();

    let output = bin()
        .args(["patch", yaml_path.to_str().unwrap()])
        .output()
        .expect("failed to run svdpatch patch");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let patched_path = dir.path().join("array_collect.svd.patched");
    let patched = std::fs::read_to_string(&patched_path).unwrap();
    assert!(patched.contains("<dim>3</dim>"));
    assert!(patched.contains("<dimIncrement>0x10</dimIncrement>"));
    assert!(patched.contains("CH%s_CFG"));
}

#[test]
fn version_prints_crate_version() {
    let output = bin().arg("version").output().expect("failed to run svdpatch version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), env!("CARGO_PKG_VERSION"));
}
