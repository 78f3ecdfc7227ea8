use std::path::Path;

use anyhow::{Context, Result};
use svdpatch_tree::Element;

use crate::interrupts;

/// Walks a parsed device and prints one line per peripheral, register, and
/// field, each prefixed by its absolute address and a letter/indent marking
/// nesting depth, followed by a listing of every interrupt.
pub fn format_mmap(device: &Element) -> String {
    let mut lines = Vec::new();

    if let Some(peripherals) = device.child("peripherals") {
        for ptag in peripherals.children_named("peripheral") {
            let pname = ptag.find_text("name").unwrap_or_default();
            let base = ptag
                .find_text("baseAddress")
                .and_then(svdpatch_core::parse_int)
                .unwrap_or(0);
            lines.push(format!("{base:#010x} A PERIPHERAL {pname}"));

            let Some(registers) = ptag.child("registers") else {
                continue;
            };
            for rtag in registers.children_named("register") {
                let rname = rtag.find_text("name").unwrap_or_default();
                let rdesc = rtag.find_text("description").unwrap_or_default();
                let offset = rtag
                    .find_text("addressOffset")
                    .and_then(svdpatch_core::parse_int)
                    .unwrap_or(0);
                let raddr = base.wrapping_add(offset);
                lines.push(format!("{raddr:#010x} B  REGISTER {rname}: {rdesc}"));

                let Some(fields) = rtag.child("fields") else {
                    continue;
                };
                for ftag in fields.children_named("field") {
                    let fname = ftag.find_text("name").unwrap_or_default();
                    let fdesc = ftag.find_text("description").unwrap_or_default();
                    let bit_offset = ftag
                        .find_text("bitOffset")
                        .and_then(svdpatch_core::parse_int)
                        .unwrap_or(0);
                    let bit_width = ftag
                        .find_text("bitWidth")
                        .and_then(svdpatch_core::parse_int)
                        .unwrap_or(0);
                    lines.push(format!(
                        "{raddr:#010x} C   FIELD {bit_offset:02}w{bit_width:02} {fname}: {fdesc}"
                    ));
                }
            }
        }
    }

    for (value, i) in interrupts::collect(device) {
        lines.push(format!("INTERRUPT {value:03}: {} ({}): {}", i.name, i.pname, i.desc));
    }

    lines.join("\n")
}

pub fn run(svd_path: &Path) -> Result<String> {
    let device = svdpatch_tree::parse_file(svd_path)
        .with_context(|| format!("parsing {}", svd_path.display()))?;
    Ok(format_mmap(&device))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVD: &str = r#"
<device>
    <peripherals>
        <peripheral>
            <name>PeriphA</name>
            <description>Peripheral A</description>
            <baseAddress>0x10000000</baseAddress>
            <interrupt>
                <name>INT_A1</name>
                <description>Interrupt A1</description>
                <value>1</value>
            </interrupt>
            <registers>
                <register>
                    <name>REG1</name>
                    <addressOffset>0x10</addressOffset>
                    <description>Register A1</description>
                    <fields>
                        <field>
                            <name>F1</name>
                            <description>Field 1</description>
                            <bitOffset>5</bitOffset>
                            <bitWidth>2</bitWidth>
                        </field>
                        <field>
                            <name>F2</name>
                            <description>Field 2</description>
                            <bitOffset>10</bitOffset>
                            <bitWidth>1</bitWidth>
                        </field>
                    </fields>
                </register>
                <register>
                    <name>REG2</name>
                    <addressOffset>0x14</addressOffset>
                    <description>Register A2</description>
                    <fields>
                    </fields>
                </register>
            </registers>
        </peripheral>
        <peripheral>
            <name>PeriphB</name>
            <description>Peripheral B</description>
            <baseAddress>0x10010000</baseAddress>
            <interrupt>
                <name>INT_B2</name>
                <description>Interrupt B2</description>
                <value>2</value>
            </interrupt>
            <registers>
                <register>
                    <name>REG1</name>
                    <addressOffset>0x10</addressOffset>
                    <description>Register B1</description>
                    <fields>
                    </fields>
                </register>
            </registers>
        </peripheral>
    </peripherals>
</device>
"#;

    const EXPECTED: &str = "0x10000000 A PERIPHERAL PeriphA\n\
0x10000010 B  REGISTER REG1: Register A1\n\
0x10000010 C   FIELD 05w02 F1: Field 1\n\
0x10000010 C   FIELD 10w01 F2: Field 2\n\
0x10000014 B  REGISTER REG2: Register A2\n\
0x10010000 A PERIPHERAL PeriphB\n\
0x10010010 B  REGISTER REG1: Register B1\n\
INTERRUPT 001: INT_A1 (PeriphA): Interrupt A1\n\
INTERRUPT 002: INT_B2 (PeriphB): Interrupt B2";

    #[test]
    fn prints_peripherals_registers_fields_then_interrupts() {
        let device = svdpatch_tree::parse_str(SVD, Path::new("test.svd")).unwrap();
        assert_eq!(format_mmap(&device), EXPECTED);
    }
}
