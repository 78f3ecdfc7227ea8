/// Builds the "strip" substring matcher used by `_strip`/`_strip_end`: a
/// case-sensitive, non-greedy match of `substr` (itself a shell glob)
/// anchored to the start of the name (or the end, when `strip_end` is set).
///
/// Mirrors `create_regex_from_pattern`: translate the glob to a regex,
/// de-greedy its `*`, then anchor it to whichever end is being stripped.
pub fn strip_match<'a>(name: &'a str, substr: &str, strip_end: bool) -> Option<&'a str> {
    if strip_end {
        find_suffix(name, substr)
    } else {
        find_prefix(name, substr)
    }
}

/// Remove the first substring of `name` that matches `substr` (anchored to
/// the start, or the end when `strip_end` is set), returning the result.
/// If no match is found, `name` is returned unchanged.
pub fn strip(name: &str, substr: &str, strip_end: bool) -> String {
    match strip_match(name, substr, strip_end) {
        Some(hit) => {
            if strip_end {
                name[..name.len() - hit.len()].to_string()
            } else {
                name[hit.len()..].to_string()
            }
        }
        None => name.to_string(),
    }
}

fn find_prefix<'a>(name: &'a str, substr: &str) -> Option<&'a str> {
    // Non-greedy: try the shortest matching prefix length first.
    for end in 0..=name.len() {
        if !name.is_char_boundary(end) {
            continue;
        }
        if crate::glob::glob_match(&name[..end], substr) {
            return Some(&name[..end]);
        }
    }
    None
}

fn find_suffix<'a>(name: &'a str, substr: &str) -> Option<&'a str> {
    for start in (0..=name.len()).rev() {
        if !name.is_char_boundary(start) {
            continue;
        }
        if crate::glob::glob_match(&name[start..], substr) {
            return Some(&name[start..]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_literal_prefix() {
        assert_eq!(strip("UART0_CR1", "UART0_", false), "CR1");
    }

    #[test]
    fn strips_literal_suffix() {
        assert_eq!(strip("CR1_REG", "_REG", true), "CR1");
    }

    #[test]
    fn leaves_name_unchanged_when_no_match() {
        assert_eq!(strip("CR1", "UART", false), "CR1");
    }

    #[test]
    fn strips_glob_prefix_non_greedy() {
        // "*_" should strip up to and including the first underscore only.
        assert_eq!(strip("A_B_C", "*_", false), "B_C");
    }
}
