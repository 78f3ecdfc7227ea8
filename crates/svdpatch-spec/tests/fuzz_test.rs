use proptest::prelude::*;
use svdpatch_spec::{matchname, matchsubspec};

proptest! {
    #[test]
    fn matchname_never_panics(
        name in "[A-Za-z0-9_]{0,12}",
        spec in "[A-Za-z0-9_*?,{}\\[\\]-]{0,16}",
    ) {
        let _ = matchname(&name, &spec);
    }

    #[test]
    fn matchsubspec_never_panics(
        name in "[A-Za-z0-9_]{0,12}",
        spec in "[A-Za-z0-9_*?,{}\\[\\]-]{0,16}",
    ) {
        let _ = matchsubspec(&name, &spec);
    }

    #[test]
    fn underscore_prefixed_spec_never_matches_any_name(
        name in "[A-Za-z0-9_]{0,12}",
        rest in "[A-Za-z0-9_*?,]{0,12}",
    ) {
        let spec = format!("_{rest}");
        prop_assert!(!matchname(&name, &spec));
    }

    #[test]
    fn literal_name_always_matches_itself(name in "[A-Za-z][A-Za-z0-9_]{0,11}") {
        prop_assert!(matchname(&name, &name));
    }
}
