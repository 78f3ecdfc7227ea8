use indexmap::IndexMap;
use svdpatch_doc::PatchValue;
use svdpatch_tree::Element;

use crate::error::{PatchError, Result};

/// Builds a `writeConstraint` element allowing writes within `[min, max]`.
pub fn make_write_constraint(range: (i64, i64)) -> Element {
    let mut wc = Element::new("writeConstraint");
    let mut r = Element::new("range");
    r.append(Element::with_text("minimum", range.0.to_string()));
    r.append(Element::with_text("maximum", range.1.to_string()));
    wc.append(r);
    wc
}

/// Builds an `enumeratedValues` element named `field_name` (suffixed `R`/`W`
/// for read-only/write-only usage), from a mapping of variant name to a
/// `[value, description]` pair. Rejects duplicate values, variant/field
/// names starting with a digit, and empty descriptions.
pub fn make_enumerated_values(
    field_name: &str,
    values: &IndexMap<String, PatchValue>,
    usage: &str,
) -> Result<Element> {
    let usage_key = match usage {
        "read" => "R",
        "write" => "W",
        _ => "",
    };

    let entries: Vec<(&String, &PatchValue)> = values
        .iter()
        .filter(|(k, _)| !k.starts_with('_'))
        .collect();

    let mut seen_values = std::collections::HashSet::new();
    for (vname, v) in &entries {
        let pair = v.as_sequence().ok_or_else(|| PatchError::EnumShape {
            name: field_name.to_string(),
            message: format!("enumeratedValue {vname} must be a [value, description] pair"),
        })?;
        if pair.len() != 2 {
            return Err(PatchError::EnumShape {
                name: field_name.to_string(),
                message: format!("enumeratedValue {vname} must be a [value, description] pair"),
            });
        }
        if !seen_values.insert(pair[0].to_string()) {
            return Err(PatchError::EnumShape {
                name: field_name.to_string(),
                message: "can't have duplicate values".to_string(),
            });
        }
    }

    if starts_with_digit(field_name) {
        return Err(PatchError::EnumShape {
            name: field_name.to_string(),
            message: "can't start with a number".to_string(),
        });
    }

    let mut ev = Element::new("enumeratedValues");
    ev.append(Element::with_text("name", format!("{field_name}{usage_key}")));
    ev.append(Element::with_text("usage", usage));

    for (vname, v) in entries {
        if starts_with_digit(vname) {
            return Err(PatchError::EnumShape {
                name: format!("{field_name}.{vname}"),
                message: "can't start with a number".to_string(),
            });
        }
        let pair = v.as_sequence().expect("validated above");
        let value = &pair[0];
        let description = pair[1].as_str().unwrap_or("");
        if description.is_empty() {
            return Err(PatchError::EnumShape {
                name: field_name.to_string(),
                message: format!("can't have empty description for value {value}"),
            });
        }
        let mut el = Element::new("enumeratedValue");
        el.append(Element::with_text("name", vname.clone()));
        el.append(Element::with_text("description", description));
        el.append(Element::with_text("value", value.to_string()));
        ev.append(el);
    }

    Ok(ev)
}

/// An `enumeratedValues` element that derives from an existing one by name.
pub fn make_derived_enumerated_values(name: &str) -> Element {
    let mut evd = Element::new("enumeratedValues");
    evd.set_attr("derivedFrom", name);
    evd
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(value: i64, desc: &str) -> PatchValue {
        PatchValue::Sequence(vec![PatchValue::Int(value), PatchValue::String(desc.to_string())])
    }

    #[test]
    fn builds_enum_with_read_write_usage_suffix() {
        let mut values = IndexMap::new();
        values.insert("ENABLED".to_string(), pair(1, "Enabled"));
        values.insert("DISABLED".to_string(), pair(0, "Disabled"));
        let ev = make_enumerated_values("MODE", &values, "read").unwrap();
        assert_eq!(ev.find_text("name"), Some("MODER"));
        assert_eq!(ev.children_named("enumeratedValue").count(), 2);
    }

    #[test]
    fn rejects_duplicate_values() {
        let mut values = IndexMap::new();
        values.insert("A".to_string(), pair(1, "A"));
        values.insert("B".to_string(), pair(1, "B"));
        assert!(make_enumerated_values("MODE", &values, "read-write").is_err());
    }

    #[test]
    fn rejects_empty_description() {
        let mut values = IndexMap::new();
        values.insert("A".to_string(), pair(1, ""));
        assert!(make_enumerated_values("MODE", &values, "read-write").is_err());
    }

    #[test]
    fn derived_enum_carries_derived_from_attribute() {
        let evd = make_derived_enumerated_values("MODER");
        assert_eq!(evd.attr("derivedFrom"), Some("MODER"));
        assert!(evd.children.is_empty());
    }
}
