//! Brace expansion (`A{B,C}D` -> `ABD`, `ACD`), equivalent to the subset of
//! shell/`braceexpand` behaviour the patch specification language uses:
//! comma-separated alternatives, with support for nesting.

/// Expand every top-level `{a,b,c}` group in `pattern`, recursively.
/// A pattern with no `{` expands to itself.
pub fn brace_expand(pattern: &str) -> Vec<String> {
    match split_first_group(pattern) {
        Some((prefix, options, suffix)) => {
            let mut out = Vec::new();
            for option in options {
                let combined = format!("{option}{suffix}");
                for expanded in brace_expand(&combined) {
                    out.push(format!("{prefix}{expanded}"));
                }
            }
            out
        }
        None => vec![pattern.to_string()],
    }
}

/// Finds the first top-level `{...}` group and splits `pattern` into
/// `(prefix, comma_separated_options, suffix)`. Options may themselves
/// contain nested braces, which are expanded on the recursive call.
fn split_first_group(pattern: &str) -> Option<(String, Vec<String>, String)> {
    let chars: Vec<char> = pattern.chars().collect();
    let open = chars.iter().position(|&c| c == '{')?;

    let mut depth = 0;
    let mut close = None;
    let mut options = Vec::new();
    let mut current = String::new();
    for (idx, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' => {
                depth += 1;
                if depth > 1 {
                    current.push(c);
                }
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    options.push(current.clone());
                    close = Some(idx);
                    break;
                } else {
                    current.push(c);
                }
            }
            ',' if depth == 1 => {
                options.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let close = close?;
    let prefix: String = chars[..open].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();
    Some((prefix, options, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_simple_group() {
        let mut out = brace_expand("UART{0,1,2}");
        out.sort();
        assert_eq!(out, vec!["UART0", "UART1", "UART2"]);
    }

    #[test]
    fn passes_through_pattern_without_braces() {
        assert_eq!(brace_expand("UART0"), vec!["UART0"]);
    }

    #[test]
    fn expands_group_with_prefix_and_suffix() {
        let mut out = brace_expand("GPIO{A,B}_BASE");
        out.sort();
        assert_eq!(out, vec!["GPIOA_BASE", "GPIOB_BASE"]);
    }

    #[test]
    fn expands_multiple_groups() {
        let mut out = brace_expand("P{A,B}_PIN{0,1}");
        out.sort();
        assert_eq!(out, vec!["PA_PIN0", "PA_PIN1", "PB_PIN0", "PB_PIN1"]);
    }
}
