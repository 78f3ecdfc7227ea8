//! Device-level operations: everything that mutates the `peripheral`
//! children of the `device` root, plus the top-level dispatcher that walks
//! a whole patch document.

use std::path::Path;

use indexmap::IndexMap;
use svdpatch_doc::PatchValue;
use svdpatch_spec::matchname;
use svdpatch_tree::{sort_recursive, Element};

use crate::error::{PatchError, Result};
use crate::register;

/// Top-level device child tags that may be modified directly by name (as
/// opposed to being treated as a peripheral spec).
const DEVICE_CHILDREN: &[&str] = &[
    "vendor",
    "vendorID",
    "name",
    "series",
    "version",
    "description",
    "licenseText",
    "headerSystemFilename",
    "headerDefinitionsPrefix",
    "addressUnitBits",
    "width",
    "size",
    "access",
    "protection",
    "resetValue",
    "resetMask",
];

fn name_of(el: &Element) -> &str {
    el.find_text("name").unwrap_or("")
}

fn is_derived(peripheral: &Element) -> bool {
    peripheral.attr("derivedFrom").is_some()
}

/// Every `peripheral` child of `device` whose name matches `pspec`, skipping
/// derived peripherals unless `check_derived` is `false`.
pub fn iter_peripherals<'a>(device: &'a Element, pspec: &str, check_derived: bool) -> Vec<&'a Element> {
    device
        .iter_tag("peripheral")
        .into_iter()
        .filter(|p| matchname(name_of(p), pspec))
        .filter(|p| !check_derived || !is_derived(p))
        .collect()
}

fn peripheral_names_matching(device: &Element, pspec: &str, check_derived: bool) -> Vec<String> {
    iter_peripherals(device, pspec, check_derived).into_iter().map(|p| name_of(p).to_string()).collect()
}

fn peripheral_by_name<'a>(device: &'a Element, name: &str) -> Option<&'a Element> {
    device.child("peripherals")?.children_named("peripheral").find(|p| name_of(p) == name)
}

fn peripheral_by_name_mut<'a>(device: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    device.child_mut("peripherals")?.children_named_mut("peripheral").find(|p| name_of(p) == name)
}

/// Sets the text of every direct `device` child tagged `key`.
pub fn modify_child(device: &mut Element, key: &str, val: &PatchValue) {
    for child in device.children_named_mut(key) {
        child.set_text(val.to_string());
    }
}

pub fn modify_cpu(device: &mut Element, modifications: &IndexMap<String, PatchValue>) {
    let cpu = device.ensure_child("cpu");
    for (key, val) in modifications {
        cpu.set_child_text(key, val.to_string());
    }
}

pub fn modify_peripheral(device: &mut Element, pspec: &str, pmod: &IndexMap<String, PatchValue>) {
    let names = peripheral_names_matching(device, pspec, true);
    for name in names {
        if let Some(ptag) = peripheral_by_name_mut(device, &name) {
            for (key, value) in pmod {
                match (key.as_str(), value) {
                    ("addressBlock", PatchValue::Mapping(fields)) => {
                        let ab = ptag.ensure_child("addressBlock");
                        for (ab_key, ab_value) in fields {
                            ab.remove_child(ab_key);
                            ab.append(Element::with_text(ab_key.clone(), ab_value.to_string()));
                        }
                    }
                    ("addressBlocks", PatchValue::Sequence(blocks)) => {
                        ptag.remove_children("addressBlock");
                        for block in blocks {
                            if let PatchValue::Mapping(fields) = block {
                                let mut ab = Element::new("addressBlock");
                                for (ab_key, ab_value) in fields {
                                    ab.append(Element::with_text(ab_key.clone(), ab_value.to_string()));
                                }
                                ptag.append(ab);
                            }
                        }
                    }
                    _ => ptag.set_child_text(key, value.to_string()),
                }
            }
        }
    }
}

/// Appends a brand new peripheral named `pname` built from `padd`.
pub fn add_peripheral(device: &mut Element, pname: &str, padd: &IndexMap<String, PatchValue>) -> Result<()> {
    if peripheral_by_name(device, pname).is_some() {
        return Err(PatchError::NameCollision {
            context: "device".to_string(),
            name: pname.to_string(),
        });
    }
    let mut pnew = Element::new("peripheral");
    if let Some(PatchValue::String(derived)) = padd.get("derivedFrom") {
        pnew.set_attr("derivedFrom", derived.clone());
    }
    pnew.append(Element::with_text("name", pname));
    for (key, value) in padd {
        match key.as_str() {
            "registers" => {
                pnew.append(Element::new("registers"));
                if let PatchValue::Mapping(regs) = value {
                    for (rname, radd) in regs {
                        if let PatchValue::Mapping(radd) = radd {
                            register::add_register(&mut pnew, rname, radd)?;
                        }
                    }
                }
            }
            "interrupts" => {
                if let PatchValue::Mapping(interrupts) = value {
                    for (iname, iadd) in interrupts {
                        if let PatchValue::Mapping(iadd) = iadd {
                            register::add_interrupt(&mut pnew, iname, iadd)?;
                        }
                    }
                }
            }
            "addressBlock" => {
                if let PatchValue::Mapping(fields) = value {
                    let mut ab = Element::new("addressBlock");
                    for (ab_key, ab_value) in fields {
                        ab.append(Element::with_text(ab_key.clone(), ab_value.to_string()));
                    }
                    pnew.append(ab);
                }
            }
            // Bug fix: address blocks are appended to the peripheral being
            // built, not to an unrelated, previously-seen peripheral tag.
            "addressBlocks" => {
                if let PatchValue::Sequence(blocks) = value {
                    for block in blocks {
                        if let PatchValue::Mapping(fields) = block {
                            let mut ab = Element::new("addressBlock");
                            for (ab_key, ab_value) in fields {
                                ab.append(Element::with_text(ab_key.clone(), ab_value.to_string()));
                            }
                            pnew.append(ab);
                        }
                    }
                }
            }
            "derivedFrom" => {}
            _ => pnew.append(Element::with_text(key.clone(), value.to_string())),
        };
    }
    device.ensure_child("peripherals").append(pnew);
    Ok(())
}

pub fn delete_peripheral(device: &mut Element, pspec: &str) {
    let names = peripheral_names_matching(device, pspec, false);
    if let Some(peripherals) = device.child_mut("peripherals") {
        peripherals.remove_matching(|p| p.tag == "peripheral" && names.iter().any(|n| n == name_of(p)));
    }
}

/// Strips a peripheral down to its identity (`name`, `baseAddress`,
/// `interrupt`) and marks it as `derivedFrom` another; every peripheral that
/// already derived from `pname` is repointed at the new source.
pub fn derive_peripheral(device: &mut Element, pname: &str, pderive: &str) -> Result<()> {
    if peripheral_by_name(device, pderive).is_none() {
        return Err(PatchError::MissingPeripheral(pderive.to_string()));
    }
    let ptag = peripheral_by_name_mut(device, pname).ok_or_else(|| PatchError::MissingPeripheral(pname.to_string()))?;
    ptag.children.retain(|c| matches!(c.tag.as_str(), "name" | "baseAddress" | "interrupt"));
    ptag.set_attr("derivedFrom", pderive);

    if let Some(peripherals) = device.child_mut("peripherals") {
        for p in peripherals.children_named_mut("peripheral") {
            if p.attr("derivedFrom") == Some(pname) {
                p.set_attr("derivedFrom", pderive);
            }
        }
    }
    Ok(())
}

/// Copies a peripheral, either from elsewhere in this device (`pmod.from =
/// "name"`) or from another SVD file (`pmod.from = "file:name"`, resolved
/// relative to `path`).
pub fn copy_peripheral(device: &mut Element, pname: &str, pmod: &IndexMap<String, PatchValue>, path: &Path) -> Result<()> {
    let from = pmod
        .get("from")
        .and_then(PatchValue::as_str)
        .ok_or_else(|| PatchError::Other(format!("copy: 'from' not given for peripheral {pname}")))?;
    let parts: Vec<&str> = from.split(':').collect();
    let copy_name = *parts.last().expect("split always yields at least one part");

    let (source_owned, source_is_local);
    let source_ref: &Element;
    if parts.len() == 2 {
        let file_path = svdpatch_doc::abspath(path, parts[0]);
        let other_device = svdpatch_tree::parse_file(&file_path)?;
        let peripherals = other_device
            .child("peripherals")
            .ok_or_else(|| PatchError::MissingPeripheral(copy_name.to_string()))?;
        let found = peripherals
            .children_named("peripheral")
            .find(|p| name_of(p) == copy_name)
            .ok_or_else(|| PatchError::MissingPeripheral(copy_name.to_string()))?
            .deep_clone();
        source_owned = Some(found);
        source_is_local = false;
        source_ref = source_owned.as_ref().unwrap();
    } else {
        source_ref = peripheral_by_name(device, copy_name).ok_or_else(|| PatchError::MissingPeripheral(copy_name.to_string()))?;
        source_is_local = true;
        source_owned = None;
    }

    let mut pcopy = source_ref.deep_clone();
    if source_is_local {
        pcopy.children.retain(|c| !matches!(c.tag.as_str(), "interrupt" | "baseAddress"));
    }
    pcopy.set_child_text("name", pname);

    if let Some(existing) = peripheral_by_name(device, pname) {
        for child in existing.children.iter() {
            if matches!(child.tag.as_str(), "interrupt" | "baseAddress") {
                pcopy.append(child.clone());
            }
        }
        let existing_name = pname.to_string();
        if let Some(peripherals) = device.child_mut("peripherals") {
            peripherals.remove_matching(|p| p.tag == "peripheral" && name_of(p) == existing_name);
        }
    }

    device.ensure_child("peripherals").append(pcopy);
    Ok(())
}

/// Moves every non-identity child of `pold` onto `pnew`, then marks `pold`
/// as derived from `pnew`; repoints anything else that derived from `pold`.
pub fn rebase_peripheral(device: &mut Element, pnew: &str, pold: &str) -> Result<()> {
    if peripheral_by_name(device, pnew).is_none() {
        return Err(PatchError::MissingPeripheral(pnew.to_string()));
    }
    if peripheral_by_name(device, pold).is_none() {
        return Err(PatchError::MissingPeripheral(pold.to_string()));
    }

    let moved = {
        let old = peripheral_by_name_mut(device, pold).expect("checked above");
        let moved: Vec<Element> = old.remove_matching(|c| !matches!(c.tag.as_str(), "name" | "baseAddress" | "interrupt"));
        moved
    };
    let new = peripheral_by_name_mut(device, pnew).expect("checked above");
    new.remove_attr("derivedFrom");
    for child in moved {
        new.append(child);
    }

    let old = peripheral_by_name_mut(device, pold).expect("checked above");
    old.set_attr("derivedFrom", pnew);

    if let Some(peripherals) = device.child_mut("peripherals") {
        for p in peripherals.children_named_mut("peripheral") {
            if p.attr("derivedFrom") == Some(pold) {
                p.set_attr("derivedFrom", pnew);
            }
        }
    }
    Ok(())
}

pub fn clear_fields(device: &mut Element, pspec: &str) {
    let names = peripheral_names_matching(device, pspec, false);
    for name in names {
        if let Some(ptag) = peripheral_by_name_mut(device, &name) {
            register::clear_fields(ptag, "*");
        }
    }
}

/// Works through a whole peripheral body: for derived peripherals, only
/// `_interrupts` sub-directives of `_delete`/`_modify`/`_add` apply; for
/// regular peripherals the full register/cluster/array pipeline runs.
pub fn process_peripheral(
    device: &mut Element,
    pspec: &str,
    peripheral: &IndexMap<String, PatchValue>,
    update_fields: bool,
) -> Result<()> {
    let names = peripheral_names_matching(device, pspec, false);
    if names.is_empty() {
        return Err(PatchError::MissingPeripheral(pspec.to_string()));
    }

    let device_size = device.find_text("size").and_then(crate::helpers::parse_int).unwrap_or(32);

    for name in names {
        let ptag = peripheral_by_name_mut(device, &name).expect("just matched");
        let peripheral_size = ptag.find_text("size").and_then(crate::helpers::parse_int).unwrap_or(device_size);
        if is_derived(ptag) {
            tracing::debug!("{name}: derived peripheral, applying interrupt directives only");
            if let Some(PatchValue::Mapping(deletions)) = peripheral.get("_delete") {
                if let Some(PatchValue::Sequence(ispecs)) = deletions.get("_interrupts") {
                    for ispec in ispecs.iter().filter_map(PatchValue::as_str) {
                        register::delete_interrupt(ptag, ispec);
                    }
                }
            }
            if let Some(PatchValue::Mapping(mods)) = peripheral.get("_modify") {
                if let Some(PatchValue::Mapping(imods)) = mods.get("_interrupts") {
                    for (ispec, imod) in imods {
                        if let PatchValue::Mapping(imod) = imod {
                            register::modify_interrupt(ptag, ispec, imod);
                        }
                    }
                }
            }
            if let Some(PatchValue::Mapping(adds)) = peripheral.get("_add") {
                if let Some(PatchValue::Mapping(iadds)) = adds.get("_interrupts") {
                    for (iname, iadd) in iadds {
                        if let PatchValue::Mapping(iadd) = iadd {
                            register::add_interrupt(ptag, iname, iadd)?;
                        }
                    }
                }
            }
            continue;
        }

        match peripheral.get("_delete") {
            Some(PatchValue::Sequence(list)) => {
                for rspec in list.iter().filter_map(PatchValue::as_str) {
                    register::delete_register(ptag, rspec);
                }
            }
            Some(PatchValue::Mapping(deletions)) => {
                for (rspec, val) in deletions {
                    match rspec.as_str() {
                        "_registers" => {
                            if let PatchValue::Sequence(list) = val {
                                for rspec in list.iter().filter_map(PatchValue::as_str) {
                                    register::delete_register(ptag, rspec);
                                }
                            }
                        }
                        "_interrupts" => {
                            if let PatchValue::Sequence(list) = val {
                                for ispec in list.iter().filter_map(PatchValue::as_str) {
                                    register::delete_interrupt(ptag, ispec);
                                }
                            }
                        }
                        other => register::delete_register(ptag, other),
                    }
                }
            }
            _ => {}
        }

        if let Some(PatchValue::Mapping(mods)) = peripheral.get("_modify") {
            for (rspec, rmod) in mods {
                match rspec.as_str() {
                    "_registers" => {
                        if let PatchValue::Mapping(rmods) = rmod {
                            for (rspec, rmod) in rmods {
                                if let PatchValue::Mapping(rmod) = rmod {
                                    register::modify_register(ptag, rspec, rmod);
                                }
                            }
                        }
                    }
                    "_interrupts" => {
                        if let PatchValue::Mapping(imods) = rmod {
                            for (ispec, imod) in imods {
                                if let PatchValue::Mapping(imod) = imod {
                                    register::modify_interrupt(ptag, ispec, imod);
                                }
                            }
                        }
                    }
                    "_cluster" => {
                        if let PatchValue::Mapping(cmods) = rmod {
                            for (cspec, cmod) in cmods {
                                if let PatchValue::Mapping(cmod) = cmod {
                                    register::modify_cluster(ptag, cspec, cmod);
                                }
                            }
                        }
                    }
                    _ => {
                        if let PatchValue::Mapping(rmod) = rmod {
                            register::modify_register(ptag, rspec, rmod);
                        }
                    }
                }
            }
        }

        if let Some(PatchValue::Sequence(prefixes)) = peripheral.get("_strip") {
            for prefix in prefixes.iter().filter_map(PatchValue::as_str) {
                register::strip(ptag, prefix, false);
            }
        }
        if let Some(PatchValue::Sequence(suffixes)) = peripheral.get("_strip_end") {
            for suffix in suffixes.iter().filter_map(PatchValue::as_str) {
                register::strip(ptag, suffix, true);
            }
        }
        if let Some(PatchValue::Sequence(rspecs)) = peripheral.get("_clear_fields") {
            for rspec in rspecs.iter().filter_map(PatchValue::as_str) {
                register::clear_fields(ptag, rspec);
            }
        }

        if let Some(PatchValue::Mapping(adds)) = peripheral.get("_add") {
            for (rname, radd) in adds {
                match rname.as_str() {
                    "_registers" => {
                        if let PatchValue::Mapping(radds) = radd {
                            for (rname, radd) in radds {
                                if let PatchValue::Mapping(radd) = radd {
                                    register::add_register(ptag, rname, radd)?;
                                }
                            }
                        }
                    }
                    "_interrupts" => {
                        if let PatchValue::Mapping(iadds) = radd {
                            for (iname, iadd) in iadds {
                                if let PatchValue::Mapping(iadd) = iadd {
                                    register::add_interrupt(ptag, iname, iadd)?;
                                }
                            }
                        }
                    }
                    _ => {
                        if let PatchValue::Mapping(radd) = radd {
                            register::add_register(ptag, rname, radd)?;
                        }
                    }
                }
            }
        }

        if let Some(PatchValue::Mapping(derives)) = peripheral.get("_derive") {
            for (rname, rderive) in derives {
                match rname.as_str() {
                    "_registers" => {
                        if let PatchValue::Mapping(rderives) = rderive {
                            for (rname, rderive) in rderives {
                                if let PatchValue::Mapping(rderive) = rderive {
                                    register::derive_register(ptag, rname, rderive)?;
                                }
                            }
                        }
                    }
                    "_interrupts" => {
                        return Err(PatchError::Other(format!(
                            "deriving interrupts not implemented yet: {rname}"
                        )));
                    }
                    _ => {
                        if let PatchValue::Mapping(rderive) = rderive {
                            register::derive_register(ptag, rname, rderive)?;
                        }
                    }
                }
            }
        }

        for (rspec, body) in peripheral {
            if !rspec.starts_with('_') {
                if let PatchValue::Mapping(body) = body {
                    register::process_register(ptag, rspec, body, update_fields)?;
                }
            }
        }

        if let Some(PatchValue::Mapping(arrays)) = peripheral.get("_array") {
            for (rspec, rmod) in arrays {
                if let PatchValue::Mapping(rmod) = rmod {
                    register::collect_in_array(ptag, rspec, rmod, peripheral_size)?;
                }
            }
        }

        if let Some(PatchValue::Mapping(clusters)) = peripheral.get("_cluster") {
            for (cname, cmod) in clusters {
                if let PatchValue::Mapping(cmod) = cmod {
                    register::collect_in_cluster(ptag, cname, cmod, peripheral_size)?;
                }
            }
        }
    }
    Ok(())
}

/// Runs a whole patch document against `svd`, in the exact dispatch order
/// the format mandates: deletions, copies, modifications, field clears,
/// additions, derivations, rebases, then every explicit peripheral body, and
/// finally the schema sort pass.
pub fn process_device(svd: &mut Element, device_doc: &IndexMap<String, PatchValue>, update_fields: bool) -> Result<()> {
    let path = device_doc
        .get("_path")
        .and_then(PatchValue::as_str)
        .map(std::path::PathBuf::from)
        .unwrap_or_default();

    if let Some(PatchValue::Sequence(list)) = device_doc.get("_delete") {
        for pspec in list.iter().filter_map(PatchValue::as_str) {
            delete_peripheral(svd, pspec);
        }
    }

    if let Some(PatchValue::Mapping(copies)) = device_doc.get("_copy") {
        for (pname, pmod) in copies {
            if let PatchValue::Mapping(pmod) = pmod {
                copy_peripheral(svd, pname, pmod, &path)?;
            }
        }
    }

    if let Some(PatchValue::Mapping(mods)) = device_doc.get("_modify") {
        for (key, val) in mods {
            if key == "cpu" {
                if let PatchValue::Mapping(cpu_mod) = val {
                    modify_cpu(svd, cpu_mod);
                }
            } else if key == "_peripherals" {
                if let PatchValue::Mapping(pmods) = val {
                    for (pspec, pmod) in pmods {
                        if let PatchValue::Mapping(pmod) = pmod {
                            modify_peripheral(svd, pspec, pmod);
                        }
                    }
                }
            } else if DEVICE_CHILDREN.contains(&key.as_str()) {
                modify_child(svd, key, val);
            } else if let PatchValue::Mapping(pmod) = val {
                modify_peripheral(svd, key, pmod);
            }
        }
    }

    if let Some(PatchValue::Sequence(list)) = device_doc.get("_clear_fields") {
        for pspec in list.iter().filter_map(PatchValue::as_str) {
            clear_fields(svd, pspec);
        }
    }

    if let Some(PatchValue::Mapping(adds)) = device_doc.get("_add") {
        for (pname, padd) in adds {
            if let PatchValue::Mapping(padd) = padd {
                add_peripheral(svd, pname, padd)?;
            }
        }
    }

    if let Some(PatchValue::Mapping(derives)) = device_doc.get("_derive") {
        for (pname, pderive) in derives {
            if let Some(from) = pderive.as_str() {
                derive_peripheral(svd, pname, from)?;
            }
        }
    }

    if let Some(PatchValue::Mapping(rebases)) = device_doc.get("_rebase") {
        for (pnew, pold) in rebases {
            if let Some(pold) = pold.as_str() {
                rebase_peripheral(svd, pnew, pold)?;
            }
        }
    }

    for (pspec, peripheral) in device_doc {
        if !pspec.starts_with('_') {
            if let PatchValue::Mapping(peripheral) = peripheral {
                process_peripheral(svd, pspec, peripheral, update_fields)?;
            }
        }
    }

    sort_recursive(svd)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_device() -> Element {
        let mut device = Element::new("device");
        device.append(Element::with_text("name", "TESTCHIP"));
        let mut peripherals = Element::new("peripherals");
        let mut p = Element::new("peripheral");
        p.append(Element::with_text("name", "UART0"));
        p.append(Element::with_text("baseAddress", "0x40000000"));
        peripherals.append(p);
        device.append(peripherals);
        device
    }

    #[test]
    fn add_peripheral_rejects_duplicate() {
        let mut device = make_device();
        let padd = IndexMap::new();
        assert!(add_peripheral(&mut device, "UART0", &padd).is_err());
    }

    #[test]
    fn add_peripheral_address_blocks_attach_to_new_peripheral() {
        let mut device = make_device();
        let mut padd = IndexMap::new();
        let mut block = IndexMap::new();
        block.insert("offset".to_string(), PatchValue::Int(0));
        block.insert("size".to_string(), PatchValue::Int(0x400));
        block.insert("usage".to_string(), PatchValue::String("registers".into()));
        padd.insert(
            "addressBlocks".to_string(),
            PatchValue::Sequence(vec![PatchValue::Mapping(block)]),
        );
        add_peripheral(&mut device, "UART1", &padd).unwrap();
        let p = peripheral_by_name(&device, "UART1").unwrap();
        assert_eq!(p.children_named("addressBlock").count(), 1);
    }

    #[test]
    fn derive_peripheral_strips_to_identity_and_sets_attribute() {
        let mut device = make_device();
        let mut padd = IndexMap::new();
        padd.insert("baseAddress".to_string(), PatchValue::String("0x40001000".into()));
        add_peripheral(&mut device, "UART1", &padd).unwrap();
        derive_peripheral(&mut device, "UART1", "UART0").unwrap();
        let p = peripheral_by_name(&device, "UART1").unwrap();
        assert_eq!(p.attr("derivedFrom"), Some("UART0"));
        assert!(p.child("description").is_none());
    }

    #[test]
    fn rebase_peripheral_moves_children_and_marks_old_derived() {
        let mut device = make_device();
        let mut padd = IndexMap::new();
        padd.insert("description".to_string(), PatchValue::String("a new uart".into()));
        add_peripheral(&mut device, "UART1", &padd).unwrap();
        rebase_peripheral(&mut device, "UART1", "UART0").unwrap();
        let old = peripheral_by_name(&device, "UART0").unwrap();
        assert_eq!(old.attr("derivedFrom"), Some("UART1"));
        let new = peripheral_by_name(&device, "UART1").unwrap();
        assert_eq!(new.find_text("baseAddress"), Some("0x40000000"));
    }
}
