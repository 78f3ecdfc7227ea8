//! Peripheral-level operations: everything that mutates the `register`,
//! `cluster`, and `interrupt` children of a single `peripheral` element.

use indexmap::IndexMap;
use svdpatch_doc::PatchValue;
use svdpatch_spec::{matchname, matchsubspec, spec_ind};
use svdpatch_tree::Element;

use crate::error::{PatchError, Result};
use crate::field;
use crate::helpers::{check_bitmasks, check_offsets, register_bitmask, register_size};

fn name_of(el: &Element) -> &str {
    el.find_text("name").unwrap_or("")
}

/// Every `register` descendant (including inside clusters) whose name
/// matches `rspec`.
pub fn iter_registers<'a>(peripheral: &'a Element, rspec: &str) -> Vec<&'a Element> {
    peripheral
        .iter_tag("register")
        .into_iter()
        .filter(|r| matchname(name_of(r), rspec))
        .collect()
}

pub fn iter_registers_with_matches<'a>(
    peripheral: &'a Element,
    rspec: &str,
) -> Vec<(&'a Element, Option<String>)> {
    iter_registers(peripheral, rspec)
        .into_iter()
        .map(|r| (r, matchsubspec(name_of(r), rspec)))
        .collect()
}

pub fn iter_interrupts<'a>(peripheral: &'a Element, ispec: &str) -> Vec<&'a Element> {
    peripheral
        .iter_tag("interrupt")
        .into_iter()
        .filter(|i| matchname(name_of(i), ispec))
        .collect()
}

pub fn iter_clusters<'a>(peripheral: &'a Element, cspec: &str) -> Vec<&'a Element> {
    peripheral
        .iter_tag("cluster")
        .into_iter()
        .filter(|c| matchname(name_of(c), cspec))
        .collect()
}

fn register_names_matching(peripheral: &Element, rspec: &str) -> Vec<String> {
    iter_registers(peripheral, rspec).into_iter().map(|r| name_of(r).to_string()).collect()
}

fn register_by_name<'a>(peripheral: &'a Element, name: &str) -> Option<&'a Element> {
    peripheral.iter_tag("register").into_iter().find(|r| name_of(r) == name)
}

/// Depth-first mutable search for the first descendant of `el` tagged `tag`
/// whose `name` child equals `name`.
fn find_tag_by_name_mut<'a>(el: &'a mut Element, tag: &str, name: &str) -> Option<&'a mut Element> {
    for child in el.children.iter_mut() {
        if child.tag == tag && child.find_text("name") == Some(name) {
            return Some(child);
        }
        if let Some(found) = find_tag_by_name_mut(child, tag, name) {
            return Some(found);
        }
    }
    None
}

fn register_by_name_mut<'a>(peripheral: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    find_tag_by_name_mut(peripheral, "register", name)
}

pub fn add_interrupt(peripheral: &mut Element, iname: &str, iadd: &IndexMap<String, PatchValue>) -> Result<()> {
    if peripheral.iter_tag("interrupt").into_iter().any(|i| name_of(i) == iname) {
        return Err(PatchError::NameCollision {
            context: format!("peripheral {}", name_of(peripheral)),
            name: iname.to_string(),
        });
    }
    let mut inew = Element::new("interrupt");
    inew.append(Element::with_text("name", iname));
    for (key, val) in iadd {
        inew.append(Element::with_text(key.clone(), val.to_string()));
    }
    peripheral.append(inew);
    Ok(())
}

pub fn modify_interrupt(peripheral: &mut Element, ispec: &str, imod: &IndexMap<String, PatchValue>) {
    let names: Vec<String> = iter_interrupts(peripheral, ispec).into_iter().map(|i| name_of(i).to_string()).collect();
    for name in names {
        if let Some(itag) = peripheral.children_named_mut("interrupt").find(|i| name_of(i) == name) {
            for (key, value) in imod {
                match value {
                    PatchValue::String(s) if s.is_empty() => {
                        itag.remove_child(key);
                    }
                    _ => itag.set_child_text(key, value.to_string()),
                }
            }
        }
    }
}

pub fn delete_interrupt(peripheral: &mut Element, ispec: &str) {
    let names: Vec<String> = iter_interrupts(peripheral, ispec).into_iter().map(|i| name_of(i).to_string()).collect();
    peripheral.remove_matching(|c| c.tag == "interrupt" && names.iter().any(|n| n == name_of(c)));
}

pub fn modify_register(peripheral: &mut Element, rspec: &str, rmod: &IndexMap<String, PatchValue>) {
    let names = register_names_matching(peripheral, rspec);
    for name in names {
        if let Some(rtag) = register_by_name_mut(peripheral, &name) {
            for (key, value) in rmod {
                let has_tag = rtag.child(key).is_some();
                match value {
                    PatchValue::String(s) if s.is_empty() && has_tag => {
                        rtag.remove_child(key);
                    }
                    PatchValue::String(s) if s.is_empty() => {}
                    _ => rtag.set_child_text(key, value.to_string()),
                }
            }
        }
    }
}

pub fn add_register(peripheral: &mut Element, rname: &str, radd: &IndexMap<String, PatchValue>) -> Result<()> {
    if register_by_name(peripheral, rname).is_some() {
        return Err(PatchError::NameCollision {
            context: format!("peripheral {}", name_of(peripheral)),
            name: rname.to_string(),
        });
    }
    // Bug fix: the container that receives the new register is always this
    // peripheral's own `registers` element, never an unrelated tag.
    let registers = peripheral.ensure_child("registers");
    let mut rnew = Element::new("register");
    rnew.append(Element::with_text("name", rname));
    for (key, value) in radd {
        if key == "fields" {
            rnew.append(Element::new("fields"));
            if let PatchValue::Mapping(fields) = value {
                for (fname, fadd) in fields {
                    if let PatchValue::Mapping(fadd) = fadd {
                        field::add_field(&mut rnew, fname, fadd)?;
                    }
                }
            }
        } else {
            rnew.append(Element::with_text(key.clone(), value.to_string()));
        }
    }
    registers.append(rnew);
    Ok(())
}

pub fn derive_register(peripheral: &mut Element, rname: &str, rderive: &IndexMap<String, PatchValue>) -> Result<()> {
    let peripheral_name = name_of(peripheral).to_string();
    if register_by_name(peripheral, rname).is_some() {
        return Err(PatchError::NameCollision {
            context: format!("peripheral {peripheral_name}"),
            name: rname.to_string(),
        });
    }
    let srcname = rderive
        .get("_from")
        .and_then(PatchValue::as_str)
        .ok_or_else(|| PatchError::Other(format!("derive: source register not given, please add a _from field to {rname}")))?;
    let source = register_by_name(peripheral, srcname).ok_or_else(|| PatchError::MissingRegister {
        peripheral: peripheral_name.clone(),
        spec: srcname.to_string(),
    })?;
    let mut rcopy = source.deep_clone();
    rcopy.set_child_text("name", rname);
    rcopy.remove_child("displayName");
    for (key, value) in rderive {
        if key == "_from" {
            continue;
        } else if key == "fields" {
            return Err(PatchError::Other("modifying fields in derived register not implemented".to_string()));
        } else {
            rcopy.set_child_text(key, value.to_string());
        }
    }
    peripheral.ensure_child("registers").append(rcopy);
    Ok(())
}

pub fn delete_register(peripheral: &mut Element, rspec: &str) {
    let names = register_names_matching(peripheral, rspec);
    if let Some(registers) = peripheral.child_mut("registers") {
        registers.remove_matching(|r| r.tag == "register" && names.iter().any(|n| n == name_of(r)));
    }
}

pub fn modify_cluster(peripheral: &mut Element, cspec: &str, cmod: &IndexMap<String, PatchValue>) {
    let names: Vec<String> = iter_clusters(peripheral, cspec).into_iter().map(|c| name_of(c).to_string()).collect();
    for name in names {
        if let Some(ctag) = find_tag_by_name_mut(peripheral, "cluster", &name) {
            for (key, value) in cmod {
                match value {
                    PatchValue::String(s) if s.is_empty() => {
                        ctag.remove_child(key);
                    }
                    _ => ctag.set_child_text(key, value.to_string()),
                }
            }
        }
    }
}

/// Deletes `substr` from the start (or end, if `strip_end`) of every
/// register's `name` and `displayName`.
pub fn strip(peripheral: &mut Element, substr: &str, strip_end: bool) {
    peripheral.for_each_tag_mut("register", &mut |rtag| {
        if let Some(name) = rtag.find_text("name") {
            let stripped = svdpatch_spec::strip(name, substr, strip_end);
            rtag.set_child_text("name", stripped);
        }
        if let Some(display) = rtag.find_text("displayName") {
            let stripped = svdpatch_spec::strip(display, substr, strip_end);
            rtag.set_child_text("displayName", stripped);
        }
    });
}

struct Collected {
    name: String,
    stem: String,
    offset: u32,
}

fn collect_matching(peripheral: &Element, rspec: &str, li: usize, ri: usize) -> Vec<Collected> {
    iter_registers(peripheral, rspec)
        .into_iter()
        .map(|r| {
            let name = name_of(r).to_string();
            let stem: String = name
                .chars()
                .skip(li)
                .take(name.chars().count().saturating_sub(li + ri))
                .collect();
            let offset = r.find_text("addressOffset").and_then(crate::helpers::parse_int).unwrap_or(0);
            Collected { name, stem, offset }
        })
        .collect()
}

/// Collects same-shaped registers matching `rspec` into a single array
/// register, verifying constant stride and identical field layout first.
/// `inherited_size` is the register size inherited from the enclosing
/// peripheral (itself inherited from the device), used when a candidate
/// register has no `size` child of its own.
pub fn collect_in_array(
    peripheral: &mut Element,
    rspec: &str,
    rmod: &IndexMap<String, PatchValue>,
    inherited_size: u32,
) -> Result<()> {
    let peripheral_name = name_of(peripheral).to_string();
    let (li, ri) = spec_ind(rspec);
    let li = li.unwrap_or(0);
    let ri = ri.unwrap_or(0);

    let mut entries = collect_matching(peripheral, rspec, li, ri);
    if entries.is_empty() {
        return Err(PatchError::ArrayShapeError {
            peripheral: peripheral_name,
            items: "registers".to_string(),
            spec: rspec.to_string(),
        });
    }
    entries.sort_by_key(|e| e.offset);
    let dim = entries.len();

    let bitmasks: Vec<u64> = entries
        .iter()
        .map(|e| {
            let r = register_by_name(peripheral, &e.name).expect("just matched");
            register_bitmask(r, register_size(r, inherited_size))
        })
        .collect();

    let start_from_zero = matches!(rmod.get("_start_from_zero"), Some(PatchValue::Bool(true)));
    let dim_index = if start_from_zero {
        (0..dim).map(|i| i.to_string()).collect::<Vec<_>>().join(",")
    } else if dim == 1 {
        format!("{0}-{0}", entries[0].stem)
    } else {
        entries.iter().map(|e| e.stem.clone()).collect::<Vec<_>>().join(",")
    };
    let offsets: Vec<u32> = entries.iter().map(|e| e.offset).collect();
    let dim_increment = if dim > 1 { offsets[1].wrapping_sub(offsets[0]) } else { 0 };

    if !(check_offsets(&offsets, dim_increment) && check_bitmasks(&bitmasks, bitmasks[0])) {
        return Err(PatchError::ArrayShapeError {
            peripheral: peripheral_name,
            items: "registers".to_string(),
            spec: rspec.to_string(),
        });
    }

    let rest: Vec<String> = entries[1..].iter().map(|e| e.name.clone()).collect();
    if let Some(registers) = peripheral.child_mut("registers") {
        registers.remove_matching(|r| r.tag == "register" && rest.iter().any(|n| n == name_of(r)));
    }

    let spec_chars: Vec<char> = rspec.chars().collect();
    let total = spec_chars.len();
    let name = rmod.get("name").and_then(PatchValue::as_str).map(str::to_string).unwrap_or_else(|| {
        let prefix: String = spec_chars[..li].iter().collect();
        let suffix: String = spec_chars[total.saturating_sub(ri)..].iter().collect();
        format!("{prefix}%s{suffix}")
    });

    let stem0 = entries[0].stem.clone();
    let first_name = entries[0].name.clone();
    let rtag = register_by_name_mut(peripheral, &first_name).expect("just matched");
    match rmod.get("description") {
        Some(PatchValue::String(desc)) if desc != "_original" => {
            rtag.set_child_text("description", desc.clone());
        }
        None if dim_index.starts_with('0') => {
            if let Some(desc) = rtag.find_text("description") {
                rtag.set_child_text("description", desc.replace(&stem0, "%s"));
            }
        }
        _ => {}
    }
    rtag.set_child_text("name", name.clone());
    process_register(peripheral, &name, rmod, true)?;
    let rtag = register_by_name_mut(peripheral, &name).expect("just renamed");
    rtag.append(Element::with_text("dim", dim.to_string()));
    rtag.append(Element::with_text("dimIncrement", format!("0x{dim_increment:x}")));
    rtag.append(Element::with_text("dimIndex", dim_index));
    tracing::debug!("{peripheral_name}: collected {dim} registers matching '{rspec}' into {name}");
    Ok(())
}

/// Collects several matching groups of registers into a single `cluster`,
/// each becoming one member of the cluster's array. `inherited_size` is
/// threaded down the same way as in [`collect_in_array`].
pub fn collect_in_cluster(
    peripheral: &mut Element,
    cname: &str,
    cmod: &IndexMap<String, PatchValue>,
    inherited_size: u32,
) -> Result<()> {
    let peripheral_name = name_of(peripheral).to_string();
    let rspecs: Vec<&String> = cmod.keys().filter(|k| k.as_str() != "description").collect();

    let mut rdict: IndexMap<String, Vec<Collected>> = IndexMap::new();
    let mut dim = 0usize;
    let mut dim_index = String::new();
    let mut offsets_ref: Vec<u32> = Vec::new();
    let mut dim_increment = 0u32;
    let mut first = true;

    for rspec in &rspecs {
        let matches = iter_registers_with_matches(peripheral, rspec);
        let mut entries = Vec::new();
        for (rtag, matched) in matches {
            let matched = matched.unwrap_or_default();
            let (li, ri) = spec_ind(&matched);
            let li = li.unwrap_or(0);
            let ri = ri.unwrap_or(0);
            let name = name_of(rtag).to_string();
            let stem: String = name.chars().skip(li).take(name.chars().count().saturating_sub(li + ri)).collect();
            let offset = rtag.find_text("addressOffset").and_then(crate::helpers::parse_int).unwrap_or(0);
            entries.push(Collected { name, stem, offset });
        }
        entries.sort_by_key(|e| e.offset);

        let bitmasks: Vec<u64> = entries
            .iter()
            .map(|e| {
                let r = register_by_name(peripheral, &e.name).expect("just matched");
                register_bitmask(r, register_size(r, inherited_size))
            })
            .collect();

        if first {
            dim = entries.len();
            if dim == 0 {
                return Err(PatchError::ArrayShapeError {
                    peripheral: peripheral_name,
                    items: "registers".to_string(),
                    spec: cname.to_string(),
                });
            }
            dim_index = entries.iter().map(|e| e.stem.clone()).collect::<Vec<_>>().join(",");
            offsets_ref = entries.iter().map(|e| e.offset).collect();
            dim_increment = if dim > 1 { offsets_ref[1].wrapping_sub(offsets_ref[0]) } else { 0 };
            if !(check_offsets(&offsets_ref, dim_increment) && check_bitmasks(&bitmasks, bitmasks[0])) {
                return Err(PatchError::ArrayShapeError {
                    peripheral: peripheral_name,
                    items: "registers".to_string(),
                    spec: cname.to_string(),
                });
            }
        } else {
            let this_index = entries.iter().map(|e| e.stem.clone()).collect::<Vec<_>>().join(",");
            let this_offsets: Vec<u32> = entries.iter().map(|e| e.offset).collect();
            if dim != entries.len()
                || dim_index != this_index
                || !check_offsets(&this_offsets, dim_increment)
                || !check_bitmasks(&bitmasks, bitmasks[0])
            {
                return Err(PatchError::ArrayShapeError {
                    peripheral: peripheral_name,
                    items: "registers".to_string(),
                    spec: cname.to_string(),
                });
            }
        }
        first = false;
        rdict.insert((*rspec).clone(), entries);
    }

    let address_offset = rdict.values().map(|entries| entries[0].offset).min().unwrap_or(0);
    let mut ctag = Element::new("cluster");
    ctag.append(Element::with_text("name", cname));
    let description = match cmod.get("description") {
        Some(PatchValue::String(s)) => s.clone(),
        _ => format!("Cluster {cname}, containing {}", rspecs.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")),
    };
    ctag.append(Element::with_text("description", description));
    ctag.append(Element::with_text("addressOffset", format!("0x{address_offset:x}")));

    for rspec in &rspecs {
        let entries = &rdict[rspec.as_str()];
        let rest: Vec<String> = entries[1..].iter().map(|e| e.name.clone()).collect();
        let first_name = entries[0].name.clone();

        let rmod = match cmod.get(rspec.as_str()) {
            Some(PatchValue::Mapping(m)) => m.clone(),
            _ => IndexMap::new(),
        };
        process_register(peripheral, rspec, &rmod, true)?;

        let rtag = register_by_name(peripheral, &first_name).expect("just matched");
        let mut new_rtag = rtag.deep_clone();

        if let Some(registers) = peripheral.child_mut("registers") {
            registers.remove_matching(|r| r.tag == "register" && (name_of(r) == first_name || rest.contains(&name_of(r).to_string())));
        }

        let name = match rmod.get("name") {
            Some(PatchValue::String(s)) => s.clone(),
            _ => {
                let (li, ri) = spec_ind(rspec);
                let li = li.unwrap_or(0);
                let ri = ri.unwrap_or(0);
                let chars: Vec<char> = rspec.chars().collect();
                let total = chars.len();
                let prefix: String = chars[..li].iter().collect();
                let suffix: String = chars[total.saturating_sub(ri)..].iter().collect();
                format!("{prefix}{suffix}")
            }
        };
        new_rtag.set_child_text("name", name);
        if let Some(PatchValue::String(desc)) = rmod.get("description") {
            new_rtag.set_child_text("description", desc.clone());
        }
        let offset = new_rtag.find_text("addressOffset").and_then(crate::helpers::parse_int).unwrap_or(0);
        new_rtag.set_child_text("addressOffset", format!("0x{:x}", offset.wrapping_sub(address_offset)));
        ctag.append(new_rtag);
    }

    ctag.append(Element::with_text("dim", dim.to_string()));
    ctag.append(Element::with_text("dimIncrement", format!("0x{dim_increment:x}")));
    ctag.append(Element::with_text("dimIndex", dim_index));
    peripheral.ensure_child("registers").append(ctag);
    tracing::debug!("{peripheral_name}: collected {} register group(s) into cluster {cname}", rspecs.len());
    Ok(())
}

pub fn clear_fields(peripheral: &mut Element, rspec: &str) {
    let names = register_names_matching(peripheral, rspec);
    for name in names {
        if let Some(rtag) = register_by_name_mut(peripheral, &name) {
            field::clear_field(rtag, "*");
        }
    }
}

/// Works through a single register body: deletions, clears, modifications,
/// additions, merges, splits, strips, field bodies, then field arrays.
pub fn process_register(
    peripheral: &mut Element,
    rspec: &str,
    register: &IndexMap<String, PatchValue>,
    update_fields: bool,
) -> Result<()> {
    let peripheral_name = name_of(peripheral).to_string();
    let names = register_names_matching(peripheral, rspec);
    if names.is_empty() {
        return Err(PatchError::MissingRegister {
            peripheral: peripheral_name,
            spec: rspec.to_string(),
        });
    }

    for name in names {
        if let Some(PatchValue::Sequence(fspecs)) = register.get("_delete") {
            for fspec in fspecs.iter().filter_map(PatchValue::as_str) {
                let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                field::delete_field(rtag, fspec);
            }
        }
        if let Some(PatchValue::Sequence(fspecs)) = register.get("_clear") {
            for fspec in fspecs.iter().filter_map(PatchValue::as_str) {
                let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                field::clear_field(rtag, fspec);
            }
        }
        if let Some(PatchValue::Mapping(mods)) = register.get("_modify") {
            for (fspec, fmod) in mods {
                if let PatchValue::Mapping(fmod) = fmod {
                    let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                    field::modify_field(rtag, fspec, fmod)?;
                }
            }
        }
        if let Some(PatchValue::Mapping(adds)) = register.get("_add") {
            for (fname, fadd) in adds {
                if let PatchValue::Mapping(fadd) = fadd {
                    let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                    field::add_field(rtag, fname, fadd)?;
                }
            }
        }
        if let Some(merges) = register.get("_merge") {
            match merges {
                PatchValue::Mapping(m) => {
                    for (fspec, fmerge) in m {
                        let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                        field::merge_fields(rtag, fspec, Some(fmerge))?;
                    }
                }
                PatchValue::Sequence(list) => {
                    for fspec in list.iter().filter_map(PatchValue::as_str) {
                        let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                        field::merge_fields(rtag, fspec, None)?;
                    }
                }
                _ => {}
            }
        }
        if let Some(splits) = register.get("_split") {
            match splits {
                PatchValue::Mapping(m) => {
                    for (fspec, fsplit) in m {
                        let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                        let fsplit = fsplit.as_mapping();
                        field::split_fields(rtag, fspec, fsplit)?;
                    }
                }
                PatchValue::Sequence(list) => {
                    for fspec in list.iter().filter_map(PatchValue::as_str) {
                        let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                        field::split_fields(rtag, fspec, None)?;
                    }
                }
                _ => {}
            }
        }
        if let Some(PatchValue::Sequence(prefixes)) = register.get("_strip") {
            for prefix in prefixes.iter().filter_map(PatchValue::as_str) {
                let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                field::strip(rtag, prefix, false);
            }
        }
        if let Some(PatchValue::Sequence(suffixes)) = register.get("_strip_end") {
            for suffix in suffixes.iter().filter_map(PatchValue::as_str) {
                let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                field::strip(rtag, suffix, true);
            }
        }
        if update_fields {
            for (fspec, body) in register {
                if !fspec.starts_with('_') {
                    let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                    field::process_field(rtag, &peripheral_name, fspec, body)?;
                }
            }
        }
        if let Some(PatchValue::Mapping(arrays)) = register.get("_array") {
            for (fspec, fmod) in arrays {
                if let PatchValue::Mapping(fmod) = fmod {
                    let rtag = register_by_name_mut(peripheral, &name).expect("just matched");
                    field::collect_fields_in_array(rtag, fspec, fmod)?;
                }
            }
        }
    }
    Ok(())
}

pub fn get_bitmask(register: &Element, inherited_size: u32) -> u64 {
    register_bitmask(register, register_size(register, inherited_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_peripheral() -> Element {
        let mut peripheral = Element::new("peripheral");
        peripheral.append(Element::with_text("name", "TIM1"));
        let mut registers = Element::new("registers");
        for (name, offset) in [("CH0", 0u32), ("CH1", 4)] {
            let mut r = Element::new("register");
            r.append(Element::with_text("name", name));
            r.append(Element::with_text("description", format!("channel {name}")));
            r.append(Element::with_text("addressOffset", format!("0x{offset:x}")));
            let mut fields = Element::new("fields");
            let mut f = Element::new("field");
            f.append(Element::with_text("name", "EN"));
            f.append(Element::with_text("bitOffset", "0"));
            f.append(Element::with_text("bitWidth", "1"));
            fields.append(f);
            r.append(fields);
            registers.append(r);
        }
        peripheral.append(registers);
        peripheral
    }

    #[test]
    fn add_register_appends_to_own_registers_container() {
        let mut peripheral = make_peripheral();
        let radd = IndexMap::new();
        add_register(&mut peripheral, "CH2", &radd).unwrap();
        assert!(register_by_name(&peripheral, "CH2").is_some());
        assert_eq!(peripheral.child("registers").unwrap().children.len(), 3);
    }

    #[test]
    fn add_register_rejects_duplicate_name() {
        let mut peripheral = make_peripheral();
        let radd = IndexMap::new();
        assert!(add_register(&mut peripheral, "CH0", &radd).is_err());
    }

    #[test]
    fn collect_in_array_requires_constant_stride() {
        let mut peripheral = make_peripheral();
        let rmod = IndexMap::new();
        collect_in_array(&mut peripheral, "CH*", &rmod, 32).unwrap();
        let registers = peripheral.child("registers").unwrap();
        assert_eq!(registers.children.len(), 1);
        assert_eq!(registers.children[0].find_text("dim"), Some("2"));
    }

    #[test]
    fn delete_register_removes_matching_names() {
        let mut peripheral = make_peripheral();
        delete_register(&mut peripheral, "CH1");
        assert!(register_by_name(&peripheral, "CH1").is_none());
        assert!(register_by_name(&peripheral, "CH0").is_some());
    }

    fn field_reg(name: &str, offset: u32, field_bit_offset: u32, field_bit_width: u32) -> Element {
        let mut r = Element::new("register");
        r.append(Element::with_text("name", name));
        r.append(Element::with_text("addressOffset", format!("0x{offset:x}")));
        let mut fields = Element::new("fields");
        let mut f = Element::new("field");
        f.append(Element::with_text("name", "F"));
        f.append(Element::with_text("bitOffset", field_bit_offset.to_string()));
        f.append(Element::with_text("bitWidth", field_bit_width.to_string()));
        fields.append(f);
        r.append(fields);
        r
    }

    /// Two groups with different per-group bitmasks (CR has a 1-bit field,
    /// SR has a 2-bit field) must still collect into one cluster: the
    /// bitmask-equality check applies within each group, not across groups.
    #[test]
    fn collect_in_cluster_allows_heterogeneous_bitmasks_across_groups() {
        let mut peripheral = Element::new("peripheral");
        peripheral.append(Element::with_text("name", "TIM"));
        let mut registers = Element::new("registers");
        registers.append(field_reg("TIM0_CR", 0x0, 0, 1));
        registers.append(field_reg("TIM1_CR", 0x10, 0, 1));
        registers.append(field_reg("TIM0_SR", 0x4, 0, 2));
        registers.append(field_reg("TIM1_SR", 0x14, 0, 2));
        peripheral.append(registers);

        let mut cmod = IndexMap::new();
        cmod.insert("TIM?_CR".to_string(), PatchValue::Mapping(IndexMap::new()));
        cmod.insert("TIM?_SR".to_string(), PatchValue::Mapping(IndexMap::new()));

        collect_in_cluster(&mut peripheral, "TIM", &cmod, 32).unwrap();

        let registers = peripheral.child("registers").unwrap();
        let cluster = registers.child("cluster").expect("cluster created");
        assert_eq!(cluster.find_text("dim"), Some("2"));
        assert_eq!(cluster.children_named("register").count(), 2);
    }
}
