use crate::element::Element;
use crate::error::TreeError;

const ARR: &[&str] = &["dim", "dimIncrement", "dimIndex", "dimName", "dimArrayIndex"];
const ACC: &[&str] = &["size", "access", "protection", "resetValue", "resetMask"];

/// Returns the ordered list of legal child tags for `tag`, or `None` if
/// `tag` is a leaf that is never sorted (i.e. has no known child set).
fn child_order(tag: &str) -> Option<Vec<&'static str>> {
    let order: Vec<&'static str> = match tag {
        "enumeratedValue" => vec!["name", "description", "value", "isDefault"],
        "enumeratedValues" => vec!["name", "headerEnumName", "usage", "enumeratedValue"],
        "field" => concat(
            ARR,
            &[
                "name",
                "description",
                "bitOffset",
                "bitWidth",
                "lsb",
                "msb",
                "bitRange",
                "access",
                "modifiedWriteValues",
                "writeConstraint",
                "readAction",
                "enumeratedValues",
            ],
        ),
        "fields" => vec!["field"],
        "writeConstraint" => vec!["writeAsRead", "useEnumeratedValues", "range"],
        "range" => vec!["minimum", "maximum"],
        "register" => concat3(
            ARR,
            &[
                "name",
                "displayName",
                "description",
                "alternateGroup",
                "alternateRegister",
                "addressOffset",
            ],
            ACC,
            &["dataType", "modifiedWriteValues", "writeConstraint", "readAction", "fields"],
        ),
        "cluster" => concat3(
            ARR,
            &["name", "description", "alternateCluster", "headerStructName", "addressOffset"],
            ACC,
            &["register", "cluster"],
        ),
        "registers" => vec!["cluster", "register"],
        "interrupt" => vec!["name", "description", "value"],
        "addressBlock" => vec!["offset", "size", "usage", "protection"],
        "peripheral" => concat3(
            ARR,
            &[
                "name",
                "version",
                "description",
                "alternatePeripheral",
                "groupName",
                "prependToName",
                "appendToName",
                "headerStructName",
                "disableCondition",
                "baseAddress",
            ],
            ACC,
            &["addressBlock", "interrupt", "registers"],
        ),
        "peripherals" => vec!["peripheral"],
        "cpu" => vec![
            "name",
            "revision",
            "endian",
            "mpuPresent",
            "fpuPresent",
            "fpuDP",
            "dspPresent",
            "icachePresent",
            "dcachePresent",
            "itcmPresent",
            "dtcmPresent",
            "vtorPresent",
            "nvicPrioBits",
            "vendorSystickConfig",
            "deviceNumInterrupts",
            "sauNumRegions",
            "sauRegionsConfig",
        ],
        "sauRegionsConfig" => vec!["region"],
        "region" => vec!["base", "limit", "access"],
        "device" => concat3(
            &[
                "vendor",
                "vendorID",
                "name",
                "series",
                "version",
                "description",
                "licenseText",
                "cpu",
                "headerSystemFilename",
                "headerDefinitionsPrefix",
                "addressUnitBits",
                "width",
            ],
            ACC,
            &["peripherals", "vendorExtensions"],
            &[],
        ),
        _ => return None,
    };
    Some(order)
}

fn concat(a: &[&'static str], b: &[&'static str]) -> Vec<&'static str> {
    let mut v = a.to_vec();
    v.extend_from_slice(b);
    v
}

fn concat3(
    a: &[&'static str],
    b: &[&'static str],
    c: &[&'static str],
    d: &[&'static str],
) -> Vec<&'static str> {
    let mut v = a.to_vec();
    v.extend_from_slice(b);
    v.extend_from_slice(c);
    v.extend_from_slice(d);
    v
}

/// Sort the direct children of `el` according to the SVD schema's fixed
/// child order for `el.tag`. Errors if `el` has children but its tag is not
/// a recognised schema element, or if a child's tag is not legal inside it.
///
/// `vendorExtensions` subtrees are left completely untouched: we can't know
/// the ordering rules of vendor-specific content.
pub fn sort_element(el: &mut Element) -> Result<(), TreeError> {
    if el.tag == "vendorExtensions" {
        return Ok(());
    }
    if el.children.is_empty() {
        return Ok(());
    }
    let order = child_order(&el.tag).ok_or_else(|| TreeError::UnknownTag(el.tag.clone()))?;
    for child in &el.children {
        if !order.contains(&child.tag.as_str()) {
            return Err(TreeError::UnknownChildTag {
                parent: el.tag.clone(),
                child: child.tag.clone(),
            });
        }
    }
    el.children
        .sort_by_key(|c| order.iter().position(|t| *t == c.tag).unwrap_or(usize::MAX));
    Ok(())
}

/// Recursively apply [`sort_element`] to `el` and all of its descendants,
/// never descending into `vendorExtensions`.
pub fn sort_recursive(el: &mut Element) -> Result<(), TreeError> {
    sort_element(el)?;
    if el.tag != "vendorExtensions" {
        for child in &mut el.children {
            sort_recursive(child)?;
        }
    }
    Ok(())
}
