//! Mode flags are a pure function of the build mode.

use proptest::prelude::*;
use sitepack_config::{BuildMode, ModeFlags};

fn mode() -> impl Strategy<Value = BuildMode> {
    prop_oneof![Just(BuildMode::Development), Just(BuildMode::Production)]
}

proptest! {
    #[test]
    fn same_mode_yields_identical_flags(mode in mode(), calls in 1usize..16) {
        let first = mode.flags();
        for _ in 0..calls {
            prop_assert_eq!(mode.flags(), first);
        }
    }

    #[test]
    fn flags_survive_string_round_trip(mode in mode()) {
        let parsed: BuildMode = mode.to_string().parse().unwrap();
        prop_assert_eq!(parsed.flags(), mode.flags());
    }

    #[test]
    fn hashing_and_source_maps_are_exclusive(mode in mode()) {
        let ModeFlags { hash_filenames, source_map, minimize, hot_reload, .. } = mode.flags();
        prop_assert_ne!(hash_filenames, source_map);
        prop_assert_eq!(minimize, hash_filenames);
        prop_assert_eq!(hot_reload, source_map);
    }
}

#[test]
fn flags_are_usable_in_const_context() {
    const PROD: ModeFlags = BuildMode::Production.flags();
    assert!(PROD.minimize);
}
