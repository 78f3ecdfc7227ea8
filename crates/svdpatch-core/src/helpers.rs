use svdpatch_tree::Element;

/// Offset and width of a field, parsed from whichever of the three legal
/// encodings is present: `bitOffset`/`bitWidth`, a `bitRange="[msb:lsb]"`
/// string, or separate `lsb`/`msb` tags. The `lsb`/`msb` branch computes
/// `width = msb - lsb + 1` (the original engine forgets to set `width` on
/// this branch; this port always sets it).
pub fn field_offset_width(field: &Element) -> Option<(u32, u32)> {
    if let Some(bit_offset) = field.find_text("bitOffset") {
        let offset = parse_int(bit_offset)?;
        let width = parse_int(field.find_text("bitWidth")?)?;
        Some((offset, width))
    } else if let Some(bit_range) = field.find_text("bitRange") {
        let trimmed = bit_range.trim_start_matches('[').trim_end_matches(']');
        let (msb, lsb) = trimmed.split_once(':')?;
        let offset = parse_int(lsb.trim())?;
        let msb = parse_int(msb.trim())?;
        Some((offset, msb - offset + 1))
    } else if let Some(lsb) = field.find_text("lsb") {
        let lsb = parse_int(lsb)?;
        let msb = parse_int(field.find_text("msb")?)?;
        Some((lsb, msb - lsb + 1))
    } else {
        None
    }
}

/// Parses a C-style integer literal (`0x10`, `0b101`, `10`), mirroring
/// Python's `int(text, 0)`.
pub fn parse_int(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        u32::from_str_radix(oct, 8).ok()
    } else {
        text.parse::<u32>().ok()
    }
}

/// Sort fields by ascending bit offset, as `sorted_fields` does before enum
/// attachment (so the first field's name drives the enum's own name).
pub fn sorted_fields<'a>(mut fields: Vec<&'a Element>) -> Vec<&'a Element> {
    fields.sort_by_key(|f| field_offset_width(f).map(|(o, _)| o).unwrap_or(0));
    fields
}

pub fn check_offsets(offsets: &[u32], dim_increment: u32) -> bool {
    offsets
        .windows(2)
        .all(|w| w[1].wrapping_sub(w[0]) == dim_increment)
}

pub fn check_bitmasks(masks: &[u64], mask: u64) -> bool {
    masks.iter().all(|m| *m == mask)
}

/// The filled-bit mask of a register of `size` bits, OR-ing each field's
/// full-width mask (left-shifted into place) together.
pub fn register_bitmask(register: &Element, size: u32) -> u64 {
    let full_mask: u64 = if size >= 64 { u64::MAX } else { (1u64 << size) - 1 };
    let mut mask = 0u64;
    if let Some(fields) = register.child("fields") {
        for field in fields.children_named("field") {
            if let Some((offset, width)) = field_offset_width(field) {
                mask |= (full_mask >> (size - width)) << offset;
            }
        }
    }
    mask
}

/// Resolves a register's bit size: its own `size` element if present, else
/// the size inherited from its enclosing peripheral (or the device default
/// of 32), threaded down explicitly since the tree carries no parent
/// pointers.
pub fn register_size(register: &Element, inherited: u32) -> u32 {
    register
        .find_text("size")
        .and_then(parse_int)
        .unwrap_or(inherited)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(tag: &str, value: &str) -> Element {
        let mut f = Element::new("field");
        f.append(Element::with_text(tag, value));
        f
    }

    #[test]
    fn offset_width_from_bit_offset_and_width() {
        let mut f = Element::new("field");
        f.append(Element::with_text("bitOffset", "4"));
        f.append(Element::with_text("bitWidth", "2"));
        assert_eq!(field_offset_width(&f), Some((4, 2)));
    }

    #[test]
    fn offset_width_from_bit_range() {
        let f = field_with("bitRange", "[7:5]");
        assert_eq!(field_offset_width(&f), Some((5, 3)));
    }

    #[test]
    fn offset_width_from_lsb_msb_sets_width_correctly() {
        let mut f = Element::new("field");
        f.append(Element::with_text("lsb", "2"));
        f.append(Element::with_text("msb", "5"));
        assert_eq!(field_offset_width(&f), Some((2, 4)));
    }

    #[test]
    fn bitmask_ors_all_field_masks() {
        let mut register = Element::new("register");
        let mut fields = Element::new("fields");
        let mut f1 = Element::new("field");
        f1.append(Element::with_text("bitOffset", "0"));
        f1.append(Element::with_text("bitWidth", "4"));
        let mut f2 = Element::new("field");
        f2.append(Element::with_text("bitOffset", "8"));
        f2.append(Element::with_text("bitWidth", "2"));
        fields.append(f1);
        fields.append(f2);
        register.append(fields);
        assert_eq!(register_bitmask(&register, 32), 0b11_0000_1111);
    }
}
