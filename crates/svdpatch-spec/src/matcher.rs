use crate::brace::brace_expand;
use crate::glob::glob_match;

/// Check whether `name` matches a specification string. Specifications
/// starting with `_` never match anything (they are reserved for directive
/// keys, never selection keys). A spec containing `{` is brace-expanded
/// first; otherwise it is split on `,`. Each resulting sub-specification is
/// matched case-sensitively as a shell glob.
pub fn matchname(name: &str, spec: &str) -> bool {
    if spec.starts_with('_') {
        return false;
    }
    subspecs(spec).iter().any(|s| glob_match(name, s))
}

/// If `name` matches `spec`, return the first sub-specification (after
/// brace expansion or comma splitting) that it matched.
pub fn matchsubspec(name: &str, spec: &str) -> Option<String> {
    if !matchname(name, spec) {
        return None;
    }
    subspecs(spec).into_iter().find(|s| glob_match(name, s))
}

fn subspecs(spec: &str) -> Vec<String> {
    if spec.contains('{') {
        brace_expand(spec)
    } else {
        spec.split(',').map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_spec_never_matches() {
        assert!(!matchname("anything", "_reserved"));
    }

    #[test]
    fn comma_list_matches_any_member() {
        assert!(matchname("UART0", "UART0,UART1"));
        assert!(matchname("UART1", "UART0,UART1"));
        assert!(!matchname("UART2", "UART0,UART1"));
    }

    #[test]
    fn brace_expansion_matches() {
        assert!(matchname("UART2", "UART{0,1,2}"));
        assert!(!matchname("UART3", "UART{0,1,2}"));
    }

    #[test]
    fn matchsubspec_returns_the_matched_alternative() {
        assert_eq!(
            matchsubspec("UART1", "UART0,UART1,UART2"),
            Some("UART1".to_string())
        );
        assert_eq!(matchsubspec("SPI0", "UART0,UART1"), None);
    }

    #[test]
    fn glob_alternative_within_comma_list() {
        assert_eq!(
            matchsubspec("TIM3", "UART*,TIM*"),
            Some("TIM*".to_string())
        );
    }
}
