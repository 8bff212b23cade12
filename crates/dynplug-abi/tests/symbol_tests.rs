//! Property tests for the symbol naming convention.

use dynplug_abi::{
    CONSTRUCT_SUFFIX, DESTRUCT_SUFFIX, DISCOVERY_SUFFIX, construct_symbol, destruct_symbol,
    discovery_symbol,
};
use proptest::prelude::*;

fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_symbols_extend_the_name(name in identifier_strategy()) {
        let construct = construct_symbol(&name);
        let destruct = destruct_symbol(&name);
        let discovery = discovery_symbol(&name);

        prop_assert_eq!(construct.strip_suffix(CONSTRUCT_SUFFIX), Some(name.as_str()));
        prop_assert_eq!(destruct.strip_suffix(DESTRUCT_SUFFIX), Some(name.as_str()));
        prop_assert_eq!(discovery.strip_suffix(DISCOVERY_SUFFIX), Some(name.as_str()));
    }

    #[test]
    fn prop_construct_and_destruct_never_collide(
        a in identifier_strategy(),
        b in identifier_strategy(),
    ) {
        prop_assert_ne!(construct_symbol(&a), destruct_symbol(&b));
    }

    #[test]
    fn prop_distinct_plugins_get_distinct_symbols(
        a in identifier_strategy(),
        b in identifier_strategy(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(construct_symbol(&a), construct_symbol(&b));
        prop_assert_ne!(destruct_symbol(&a), destruct_symbol(&b));
    }
}
