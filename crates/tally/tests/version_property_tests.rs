//! Property-based tests for version comparison
//!
//! The comparator must behave as a total order over arbitrary version
//! strings so that "is newer" decisions are consistent.

use proptest::prelude::*;
use tally::updater::{compare_versions, is_newer, Version};

/// `v`-prefixed or bare dotted versions with one to four segments
fn version_string() -> impl Strategy<Value = String> {
    (
        prop::bool::ANY,
        prop::collection::vec(0u64..50, 1..=4),
    )
        .prop_map(|(prefixed, parts)| {
            let body = parts
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(".");
            if prefixed {
                format!("v{}", body)
            } else {
                body
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_reflexive(v in version_string()) {
        prop_assert_eq!(compare_versions(&v, &v), 0);
    }

    #[test]
    fn prop_antisymmetric(a in version_string(), b in version_string()) {
        prop_assert_eq!(compare_versions(&a, &b), -compare_versions(&b, &a));
    }

    #[test]
    fn prop_transitive(a in version_string(), b in version_string(), c in version_string()) {
        if compare_versions(&a, &b) >= 0 && compare_versions(&b, &c) >= 0 {
            prop_assert!(compare_versions(&a, &c) >= 0);
        }
        if compare_versions(&a, &b) <= 0 && compare_versions(&b, &c) <= 0 {
            prop_assert!(compare_versions(&a, &c) <= 0);
        }
    }

    #[test]
    fn prop_trailing_zeros_ignored(v in version_string(), zeros in 1usize..4) {
        let padded = format!("{}{}", v, ".0".repeat(zeros));
        prop_assert_eq!(compare_versions(&v, &padded), 0);
    }

    #[test]
    fn prop_bumping_last_segment_is_newer(parts in prop::collection::vec(0u64..50, 1..=4)) {
        let current = parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
        let mut bumped_parts = parts.clone();
        if let Some(last) = bumped_parts.last_mut() {
            *last += 1;
        }
        let bumped = bumped_parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");

        prop_assert!(is_newer(&bumped, &current));
        prop_assert!(!is_newer(&current, &bumped));
    }

    #[test]
    fn prop_parse_never_panics(s in ".*") {
        let _ = Version::parse(&s);
        let _ = compare_versions(&s, "1.0.0");
    }
}

#[test]
fn test_fixed_orderings() {
    assert_eq!(compare_versions("1.0.10", "1.0.9"), 1);
    assert_eq!(compare_versions("1.0", "1.0.0"), 0);
    assert_eq!(compare_versions("2.0.0", "1.9.9"), 1);
    assert_eq!(compare_versions("v1.2", "1.2.0"), 0);
    assert_eq!(compare_versions("1.0.7", "v1.0.8"), -1);
}
