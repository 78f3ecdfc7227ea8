//! Register-level operations: everything that mutates the `field` children
//! of a single `register` element (or of a standalone register-shaped
//! cluster member — the two share a `fields` container).

use indexmap::IndexMap;
use svdpatch_doc::PatchValue;
use svdpatch_spec::{matchname, matchsubspec, spec_ind};
use svdpatch_tree::Element;

use crate::builders::{make_derived_enumerated_values, make_enumerated_values, make_write_constraint};
use crate::error::{PatchError, Result};
use crate::helpers::{field_offset_width, sorted_fields};

fn field_name(field: &Element) -> &str {
    field.find_text("name").unwrap_or("")
}

/// Names of the fields inside `register` whose name matches `fspec`, in
/// document order.
pub fn matching_field_names(register: &Element, fspec: &str) -> Vec<String> {
    let Some(fields) = register.child("fields") else {
        return Vec::new();
    };
    fields
        .children_named("field")
        .filter(|f| matchname(field_name(f), fspec))
        .map(|f| field_name(f).to_string())
        .collect()
}

fn field_by_name<'a>(register: &'a Element, name: &str) -> Option<&'a Element> {
    register
        .child("fields")?
        .children_named("field")
        .find(|f| field_name(f) == name)
}

fn field_by_name_mut<'a>(register: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    register
        .child_mut("fields")?
        .children_named_mut("field")
        .find(|f| field_name(f) == name)
}

/// Deletes the substring matched by `substr` from every field's `name` and
/// `displayName`, from the start of the name unless `strip_end`.
pub fn strip(register: &mut Element, substr: &str, strip_end: bool) {
    let Some(fields) = register.child_mut("fields") else {
        return;
    };
    for field in fields.children_named_mut("field") {
        if let Some(name) = field.find_text("name") {
            let stripped = svdpatch_spec::strip(name, substr, strip_end);
            field.set_child_text("name", stripped);
        }
        if let Some(display) = field.find_text("displayName") {
            let stripped = svdpatch_spec::strip(display, substr, strip_end);
            field.set_child_text("displayName", stripped);
        }
    }
}

/// Applies `fmod` to every field matching `fspec`.
pub fn modify_field(
    register: &mut Element,
    fspec: &str,
    fmod: &IndexMap<String, PatchValue>,
) -> Result<()> {
    for name in matching_field_names(register, fspec) {
        let field = field_by_name_mut(register, &name).expect("just matched");
        for (key, value) in fmod {
            let key = if key == "_write_constraint" {
                "writeConstraint"
            } else {
                key.as_str()
            };
            if key == "writeConstraint" {
                field.remove_children("writeConstraint");
                match value {
                    PatchValue::String(s) if s == "none" => {}
                    PatchValue::String(s) if s == "enum" => {
                        let mut wc = Element::new("writeConstraint");
                        wc.append(Element::with_text("useEnumeratedValues", "true"));
                        field.append(wc);
                    }
                    PatchValue::Sequence(range) if range.len() == 2 => {
                        let min = range[0].as_i64().ok_or_else(|| PatchError::MergeError {
                            context: name.clone(),
                            message: "writeConstraint range bounds must be integers".into(),
                        })?;
                        let max = range[1].as_i64().ok_or_else(|| PatchError::MergeError {
                            context: name.clone(),
                            message: "writeConstraint range bounds must be integers".into(),
                        })?;
                        let wc = make_write_constraint((min, max));
                        field.append(wc);
                    }
                    other => {
                        return Err(PatchError::MergeError {
                            context: name.clone(),
                            message: format!("unknown writeConstraint type {other}"),
                        })
                    }
                }
            } else {
                match value {
                    PatchValue::String(s) if s.is_empty() => {
                        field.remove_children(key);
                    }
                    _ => field.set_child_text(key, value.to_string()),
                }
            }
        }
    }
    Ok(())
}

/// Appends a brand new field named `fname` built from `fadd`.
pub fn add_field(register: &mut Element, fname: &str, fadd: &IndexMap<String, PatchValue>) -> Result<()> {
    if field_by_name(register, fname).is_some() {
        return Err(PatchError::NameCollision {
            context: format!("register {}", register.find_text("name").unwrap_or("?")),
            name: fname.to_string(),
        });
    }
    let fields = register.ensure_child("fields");
    let mut fnew = Element::new("field");
    fnew.append(Element::with_text("name", fname));
    for (key, value) in fadd {
        fnew.append(Element::with_text(key.clone(), value.to_string()));
    }
    fields.append(fnew);
    Ok(())
}

pub fn delete_field(register: &mut Element, fspec: &str) {
    let names = matching_field_names(register, fspec);
    if let Some(fields) = register.child_mut("fields") {
        fields.remove_matching(|f| names.iter().any(|n| n == field_name(f)));
    }
}

pub fn clear_field(register: &mut Element, fspec: &str) {
    for name in matching_field_names(register, fspec) {
        if let Some(field) = field_by_name_mut(register, &name) {
            field.remove_children("enumeratedValues");
            field.remove_children("writeConstraint");
        }
    }
}

fn common_prefix(strs: &[&str]) -> String {
    let mut iter = strs.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut prefix_len = first.len();
    for s in iter {
        let common = first
            .chars()
            .zip(s.chars())
            .take_while(|(a, b)| a == b)
            .count();
        prefix_len = prefix_len.min(common);
    }
    first.chars().take(prefix_len).collect()
}

/// Merges several fields into one spanning their combined bit width.
/// `value` selects the merge mode: a single spec string, a list of specs, or
/// `None` to merge everything matching `key` itself (deriving the new name
/// from their common prefix).
pub fn merge_fields(register: &mut Element, key: &str, value: Option<&PatchValue>) -> Result<()> {
    let register_name = register.find_text("name").unwrap_or("?").to_string();
    let (fspecs_owned, name): (Vec<String>, String) = match value {
        Some(PatchValue::String(s)) => (vec![s.clone()], key.to_string()),
        Some(PatchValue::Sequence(list)) => {
            let specs: Vec<String> = list
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            (specs, key.to_string())
        }
        Some(other) => {
            return Err(PatchError::MergeError {
                context: register_name,
                message: format!("invalid usage of merge for {key}: {other}"),
            })
        }
        None => (vec![key.to_string()], String::new()),
    };

    let mut names = Vec::new();
    for fspec in &fspecs_owned {
        names.extend(matching_field_names(register, fspec));
    }
    if names.is_empty() {
        return Err(PatchError::MergeError {
            context: register_name,
            message: format!("could not find any fields to merge {key}"),
        });
    }

    let name = if name.is_empty() {
        let owned: Vec<&str> = names.iter().map(String::as_str).collect();
        common_prefix(&owned)
    } else {
        name
    };

    let fields: Vec<&Element> = names
        .iter()
        .map(|n| field_by_name(register, n).expect("just matched"))
        .collect();
    let desc = fields[0].find_text("description").unwrap_or("").to_string();
    let bitwidth: u32 = fields
        .iter()
        .map(|f| field_offset_width(f).map(|(_, w)| w).unwrap_or(0))
        .sum();
    let bitoffset: u32 = fields
        .iter()
        .map(|f| field_offset_width(f).map(|(o, _)| o).unwrap_or(0))
        .min()
        .unwrap_or(0);

    if let Some(container) = register.child_mut("fields") {
        container.remove_matching(|f| names.iter().any(|n| n == field_name(f)));
    }

    let mut fnew = Element::new("field");
    fnew.append(Element::with_text("name", name));
    fnew.append(Element::with_text("description", desc));
    fnew.append(Element::with_text("bitOffset", bitoffset.to_string()));
    fnew.append(Element::with_text("bitWidth", bitwidth.to_string()));
    register.ensure_child("fields").append(fnew);
    Ok(())
}

/// Splits a single matched field into `bitwidth` one-bit fields.
pub fn split_fields(register: &mut Element, fspec: &str, fsplit: Option<&IndexMap<String, PatchValue>>) -> Result<()> {
    let register_name = register.find_text("name").unwrap_or("?").to_string();
    let names = matching_field_names(register, fspec);
    if names.is_empty() {
        return Err(PatchError::MergeError {
            context: register_name,
            message: format!("could not find any fields to split {fspec}"),
        });
    }

    let owned: Vec<&str> = names.iter().map(String::as_str).collect();
    let name = fsplit
        .and_then(|m| m.get("name"))
        .and_then(PatchValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}%s", common_prefix(&owned)));

    let fields: Vec<&Element> = names
        .iter()
        .map(|n| field_by_name(register, n).expect("just matched"))
        .collect();
    let desc = fsplit
        .and_then(|m| m.get("description"))
        .and_then(PatchValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fields[0].find_text("description").unwrap_or("").to_string());
    let bitoffset = field_offset_width(fields[0]).map(|(o, _)| o).unwrap_or(0);
    let bitwidth: u32 = fields
        .iter()
        .map(|f| field_offset_width(f).map(|(_, w)| w).unwrap_or(0))
        .sum();

    let first_name = names[0].clone();
    if let Some(container) = register.child_mut("fields") {
        container.remove_matching(|f| field_name(f) == first_name);
    }
    let container = register.ensure_child("fields");
    for i in 0..bitwidth {
        let mut fnew = Element::new("field");
        fnew.append(Element::with_text("name", name.replace("%s", &i.to_string())));
        fnew.append(Element::with_text("description", desc.replace("%s", &i.to_string())));
        fnew.append(Element::with_text("bitOffset", (bitoffset + i).to_string()));
        fnew.append(Element::with_text("bitWidth", "1"));
        container.append(fnew);
    }
    Ok(())
}

/// Collects fields matching `fspec` (which must contain a wildcard index
/// marker) into a single `dim`-array field.
pub fn collect_fields_in_array(
    register: &mut Element,
    fspec: &str,
    fmod: &IndexMap<String, PatchValue>,
) -> Result<()> {
    let register_name = register.find_text("name").unwrap_or("?").to_string();
    let (li, ri) = spec_ind(fspec);
    let li = li.unwrap_or(0);
    let ri = ri.unwrap_or(0);

    let mut entries: Vec<(String, String, u32)> = Vec::new();
    for name in matching_field_names(register, fspec) {
        let field = field_by_name(register, &name).expect("just matched");
        let offset = field_offset_width(field).map(|(o, _)| o).unwrap_or(0);
        let stem = name.chars().skip(li).take(name.chars().count().saturating_sub(li + ri)).collect();
        entries.push((name, stem, offset));
    }
    if entries.is_empty() {
        return Err(PatchError::ArrayShapeError {
            peripheral: register_name,
            items: "fields".to_string(),
            spec: fspec.to_string(),
        });
    }
    entries.sort_by_key(|e| e.2);

    let dim = entries.len();
    let start_from_zero = matches!(fmod.get("_start_from_zero"), Some(PatchValue::Bool(true)));
    let dim_index = if start_from_zero {
        (0..dim).map(|i| i.to_string()).collect::<Vec<_>>().join(",")
    } else if dim == 1 {
        format!("{0}-{0}", entries[0].1)
    } else {
        entries.iter().map(|e| e.1.clone()).collect::<Vec<_>>().join(",")
    };
    let offsets: Vec<u32> = entries.iter().map(|e| e.2).collect();
    let dim_increment = if dim > 1 { offsets[1].wrapping_sub(offsets[0]) } else { 0 };

    if !crate::helpers::check_offsets(&offsets, dim_increment) {
        return Err(PatchError::ArrayShapeError {
            peripheral: register_name,
            items: "fields".to_string(),
            spec: fspec.to_string(),
        });
    }

    let rest: Vec<String> = entries[1..].iter().map(|e| e.0.clone()).collect();
    if let Some(container) = register.child_mut("fields") {
        container.remove_matching(|f| rest.iter().any(|n| n == field_name(f)));
    }

    let first_name = entries[0].0.clone();
    let stem0 = entries[0].1.clone();
    let spec_chars: Vec<char> = fspec.chars().collect();
    let total = spec_chars.len();
    let name = fmod
        .get("name")
        .and_then(PatchValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let prefix: String = spec_chars[..li].iter().collect();
            let suffix: String = spec_chars[total.saturating_sub(ri)..].iter().collect();
            format!("{prefix}%s{suffix}")
        });

    let field = field_by_name_mut(register, &first_name).expect("just matched");
    match fmod.get("description") {
        Some(PatchValue::String(desc)) if desc != "_original" => {
            field.set_child_text("description", desc.clone());
        }
        None if dim_index.starts_with('0') => {
            if let Some(desc) = field.find_text("description") {
                field.set_child_text("description", desc.replace(&stem0, "%s"));
            }
        }
        _ => {}
    }
    field.set_child_text("name", name);
    field.append(Element::with_text("dim", dim.to_string()));
    field.append(Element::with_text("dimIndex", dim_index));
    field.append(Element::with_text("dimIncrement", format!("0x{dim_increment:x}")));
    Ok(())
}

/// Dispatches a field body: an enum-shaped mapping (optionally split into
/// `_read`/`_write` usages) or a two-element `[min, max]` range.
pub fn process_field(register: &mut Element, pname: &str, fspec: &str, field: &PatchValue) -> Result<()> {
    match field {
        PatchValue::Mapping(m) => {
            let usages = ["_read", "_write"];
            if !usages.iter().any(|u| m.contains_key(*u)) {
                process_field_enum(register, pname, fspec, m, "read-write")?;
            }
            for usage in usages {
                if let Some(PatchValue::Mapping(sub)) = m.get(usage) {
                    process_field_enum(register, pname, fspec, sub, &usage.replace('_', ""))?;
                }
            }
            Ok(())
        }
        PatchValue::Sequence(range) if range.len() == 2 => process_field_range(register, pname, fspec, range),
        _ => Ok(()),
    }
}

fn usage_of_enumerated_values(ev: &Element) -> Option<&str> {
    ev.find_text("usage")
}

/// Attaches an `enumeratedValues` block (or a reference deriving from one
/// already attached to a sibling field) to every field matching `fspec`.
pub fn process_field_enum(
    register: &mut Element,
    pname: &str,
    fspec: &str,
    field: &IndexMap<String, PatchValue>,
    usage: &str,
) -> Result<()> {
    let (field, replace_if_exists) = match field.get("_replace_enum") {
        Some(PatchValue::Mapping(inner)) => (inner, true),
        _ => (field, false),
    };

    let register_name = register.find_text("name").unwrap_or("?").to_string();
    let names = matching_field_names(register, fspec);
    if names.is_empty() {
        return Err(PatchError::MissingField {
            peripheral: pname.to_string(),
            register: register_name,
            spec: fspec.to_string(),
        });
    }
    let field_refs: Vec<&Element> = names.iter().map(|n| field_by_name(register, n).unwrap()).collect();
    let ordered_names: Vec<String> = sorted_fields(field_refs)
        .into_iter()
        .map(field_name)
        .map(str::to_string)
        .collect();

    let derived_from = field.get("_derivedFrom").and_then(PatchValue::as_str);
    let mut derived: Option<String> = derived_from.map(str::to_string);
    let mut enum_name: Option<String> = None;
    let mut enum_usage: Option<String> = None;
    let mut enum_el: Option<Element> = None;

    for name in &ordered_names {
        if derived.is_none() {
            if enum_el.is_none() {
                let built = make_enumerated_values(name, field, usage)?;
                enum_name = built.find_text("name").map(str::to_string);
                enum_usage = built.find_text("usage").map(str::to_string);
                enum_el = Some(built);
            }

            let existing_conflicts = {
                let ftag = field_by_name(register, name).expect("just matched");
                let mut conflicts = Vec::new();
                for (idx, ev) in ftag.children_named("enumeratedValues").enumerate() {
                    let ev_usage = if !ev.children.is_empty() {
                        usage_of_enumerated_values(ev).unwrap_or("read-write").to_string()
                    } else {
                        let derived_name = ev.attr("derivedFrom").unwrap_or("").to_string();
                        let matches: Vec<&Element> = register
                            .iter_tag("enumeratedValues")
                            .into_iter()
                            .filter(|e| e.find_text("name") == Some(derived_name.as_str()))
                            .collect();
                        match matches.len() {
                            0 => {
                                return Err(PatchError::MissingField {
                                    peripheral: pname.to_string(),
                                    register: register_name.clone(),
                                    spec: format!("{name}: derives enumeratedValues {derived_name} which could not be found"),
                                })
                            }
                            1 => matches[0].find_text("usage").unwrap_or("read-write").to_string(),
                            _ => {
                                return Err(PatchError::MissingField {
                                    peripheral: pname.to_string(),
                                    register: register_name.clone(),
                                    spec: format!("{name}: derives enumeratedValues {derived_name} which was found multiple times"),
                                })
                            }
                        }
                    };
                    if ev_usage == *enum_usage.as_deref().unwrap_or("") || ev_usage == "read-write" {
                        conflicts.push(idx);
                    }
                }
                conflicts
            };

            if !existing_conflicts.is_empty() {
                if replace_if_exists {
                    let ftag = field_by_name_mut(register, name).expect("just matched");
                    let mut kept = 0usize;
                    ftag.remove_matching(|c| {
                        let is_ev = c.tag == "enumeratedValues";
                        let hit = is_ev && existing_conflicts.contains(&kept);
                        if is_ev {
                            kept += 1;
                        }
                        hit
                    });
                } else {
                    return Err(PatchError::EnumConflict {
                        peripheral: pname.to_string(),
                        field: name.clone(),
                        usage: enum_usage.clone().unwrap_or_default(),
                    });
                }
            }

            let ftag = field_by_name_mut(register, name).expect("just matched");
            ftag.append(enum_el.clone().expect("built above"));
            derived = enum_name.clone();
        } else {
            let ftag = field_by_name_mut(register, name).expect("just matched");
            ftag.append(make_derived_enumerated_values(derived.as_deref().unwrap()));
        }
    }
    Ok(())
}

/// Attaches a `writeConstraint` range to every field matching `fspec`.
pub fn process_field_range(register: &mut Element, pname: &str, fspec: &str, range: &[PatchValue]) -> Result<()> {
    let register_name = register.find_text("name").unwrap_or("?").to_string();
    let min = range[0].as_i64().unwrap_or(0);
    let max = range[1].as_i64().unwrap_or(0);
    let names = matching_field_names(register, fspec);
    if names.is_empty() {
        return Err(PatchError::MissingField {
            peripheral: pname.to_string(),
            register: register_name,
            spec: fspec.to_string(),
        });
    }
    for name in names {
        let ftag = field_by_name_mut(register, &name).expect("just matched");
        ftag.append(make_write_constraint((min, max)));
    }
    Ok(())
}

/// Every field matched by `fspec`, for read-only call sites (e.g. mmap).
pub fn iter_fields<'a>(register: &'a Element, fspec: &str) -> Vec<&'a Element> {
    let Some(fields) = register.child("fields") else {
        return Vec::new();
    };
    fields
        .children_named("field")
        .filter(|f| matchname(field_name(f), fspec))
        .collect()
}

pub fn iter_fields_with_matches<'a>(register: &'a Element, fspec: &str) -> Vec<(&'a Element, Option<String>)> {
    iter_fields(register, fspec)
        .into_iter()
        .map(|f| (f, matchsubspec(field_name(f), fspec)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_register() -> Element {
        let mut register = Element::new("register");
        register.append(Element::with_text("name", "CR"));
        let mut fields = Element::new("fields");
        let mut f1 = Element::new("field");
        f1.append(Element::with_text("name", "EN0"));
        f1.append(Element::with_text("description", "enable 0"));
        f1.append(Element::with_text("bitOffset", "0"));
        f1.append(Element::with_text("bitWidth", "1"));
        let mut f2 = Element::new("field");
        f2.append(Element::with_text("name", "EN1"));
        f2.append(Element::with_text("description", "enable 1"));
        f2.append(Element::with_text("bitOffset", "1"));
        f2.append(Element::with_text("bitWidth", "1"));
        fields.append(f1);
        fields.append(f2);
        register.append(fields);
        register
    }

    #[test]
    fn add_field_rejects_duplicate_name() {
        let mut register = make_register();
        let mut fadd = IndexMap::new();
        fadd.insert("description".to_string(), PatchValue::String("dup".into()));
        assert!(add_field(&mut register, "EN0", &fadd).is_err());
    }

    #[test]
    fn delete_field_removes_matching() {
        let mut register = make_register();
        delete_field(&mut register, "EN*");
        assert_eq!(register.child("fields").unwrap().children.len(), 0);
    }

    #[test]
    fn merge_fields_combines_width_and_offset() {
        let mut register = make_register();
        merge_fields(&mut register, "EN", None).unwrap();
        let fields = register.child("fields").unwrap();
        assert_eq!(fields.children.len(), 1);
        let merged = &fields.children[0];
        assert_eq!(merged.find_text("bitWidth"), Some("2"));
        assert_eq!(merged.find_text("bitOffset"), Some("0"));
    }

    #[test]
    fn collect_fields_in_array_builds_dim() {
        let mut register = make_register();
        let fmod = IndexMap::new();
        collect_fields_in_array(&mut register, "EN*", &fmod).unwrap();
        let fields = register.child("fields").unwrap();
        assert_eq!(fields.children.len(), 1);
        assert_eq!(fields.children[0].find_text("dim"), Some("2"));
    }

    #[test]
    fn modify_field_empty_value_removes_child() {
        let mut register = make_register();
        let mut fmod = IndexMap::new();
        fmod.insert("description".to_string(), PatchValue::String(String::new()));
        modify_field(&mut register, "EN0", &fmod).unwrap();
        let field = field_by_name(&register, "EN0").unwrap();
        assert!(field.child("description").is_none());
    }

    #[test]
    fn modify_field_nonempty_value_overwrites_child() {
        let mut register = make_register();
        let mut fmod = IndexMap::new();
        fmod.insert("description".to_string(), PatchValue::String("renamed".into()));
        modify_field(&mut register, "EN0", &fmod).unwrap();
        let field = field_by_name(&register, "EN0").unwrap();
        assert_eq!(field.find_text("description"), Some("renamed"));
    }
}
