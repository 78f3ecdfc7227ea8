/// Find the left and right indices of the enumeration token inside a
/// wildcard specification string, used to extract the "varying slice" of a
/// matched name for `%s` templating (array/cluster collection).
///
/// The left index is the position of the first `*`, else the first `?`,
/// else the first `[` found in `spec` (in that priority order, not simply
/// the leftmost of the three). The right index is the same priority search
/// run against the reversed string, looking for `*`, then `?`, then `]`
/// (not `[`) — i.e. it is a distance from the end, not an absolute index.
/// Returns `None` for either side if no matching character is present;
/// callers only invoke this on specs already known to contain a wildcard.
pub fn spec_ind(spec: &str) -> (Option<usize>, Option<usize>) {
    let li = spec
        .find('*')
        .or_else(|| spec.find('?'))
        .or_else(|| spec.find('['));

    let reversed: String = spec.chars().rev().collect();
    let ri = reversed
        .find('*')
        .or_else(|| reversed.find('?'))
        .or_else(|| reversed.find(']'));

    (li, ri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_token_in_middle() {
        let (li, ri) = spec_ind("UART*_BASE");
        assert_eq!(li, Some(4));
        assert_eq!(ri, Some(5));
    }

    #[test]
    fn prefers_star_over_question_and_bracket() {
        let (li, _) = spec_ind("A?B*C[D]");
        assert_eq!(li, Some(3));
    }

    #[test]
    fn falls_back_to_bracket_when_no_star_or_question() {
        let (li, ri) = spec_ind("UART[0-3]");
        assert_eq!(li, Some(4));
        assert_eq!(ri, Some(0));
    }

    #[test]
    fn no_wildcard_returns_none() {
        assert_eq!(spec_ind("UART0"), (None, None));
    }
}
