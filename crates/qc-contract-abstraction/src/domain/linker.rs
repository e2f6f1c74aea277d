//! # Linker
//!
//! Substitutes library placeholders in hex bytecode with deployed library
//! addresses.
//!
//! A placeholder is exactly [`PLACEHOLDER_WIDTH`] characters: `__`, the library
//! name (truncated to fit), then `_` padding. It occupies the same width as the
//! 40 hex digits of the address that replaces it, so substitution never shifts
//! the rest of the payload.

use crate::domain::value_objects::{address_hex_digits, Address};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Width of a placeholder token in hex characters.
pub const PLACEHOLDER_WIDTH: usize = 40;

/// Maximum library name length that fits in a placeholder.
const MAX_NAME_LEN: usize = PLACEHOLDER_WIDTH - 2;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"__[^_]+_+").expect("placeholder pattern is valid"))
}

/// Placeholder token for `name`.
#[must_use]
pub fn placeholder(name: &str) -> String {
    let truncated: String = name.chars().take(MAX_NAME_LEN).collect();
    format!("__{truncated:_<width$}", width = MAX_NAME_LEN)
}

/// Replaces every recorded library placeholder in `template`.
///
/// Pure: the output depends only on `template` and `links`.
#[must_use]
pub fn link_bytecode(template: &str, links: &BTreeMap<String, Address>) -> String {
    links.iter().fold(template.to_string(), |code, (name, address)| {
        code.replace(&placeholder(name), &address_hex_digits(address))
    })
}

/// Distinct library names whose placeholders remain in `bytecode`, sorted.
#[must_use]
pub fn unresolved_libraries(bytecode: &str) -> Vec<String> {
    let pattern = placeholder_pattern();
    let mut names = BTreeSet::new();
    let mut at = 0;

    while let Some(found) = pattern.find_at(bytecode, at) {
        // Tokens are fixed-width, so one ending right where the next begins
        // must not absorb the next one's leading underscores.
        let end = (found.start() + PLACEHOLDER_WIDTH).min(bytecode.len());
        let token = bytecode.get(found.start()..end).unwrap_or(found.as_str());
        names.insert(token.trim_matches('_').to_string());
        at = end;
    }

    names.into_iter().collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn code_with(parts: &[&str]) -> String {
        let mut code = String::from("0x6060");
        for part in parts {
            code.push_str(&placeholder(part));
            code.push_str("6040");
        }
        code
    }

    #[test]
    fn test_placeholder_is_fixed_width() {
        assert_eq!(placeholder("Math").len(), PLACEHOLDER_WIDTH);
        assert!(placeholder("Math").starts_with("__Math__"));
        let long = "L".repeat(60);
        assert_eq!(placeholder(&long).len(), PLACEHOLDER_WIDTH);
    }

    #[test]
    fn test_link_replaces_every_occurrence() {
        let code = code_with(&["Math", "Math"]);
        let links = BTreeMap::from([("Math".to_string(), Address::repeat_byte(0xab))]);
        let linked = link_bytecode(&code, &links);
        assert!(!linked.contains("__"));
        assert_eq!(linked.len(), code.len());
        assert_eq!(linked.matches(&"ab".repeat(20)).count(), 2);
    }

    #[test]
    fn test_overlapping_names_link_independently() {
        let code = code_with(&["Lib", "LibMath"]);
        let links = BTreeMap::from([("Lib".to_string(), Address::repeat_byte(0x01))]);
        let linked = link_bytecode(&code, &links);
        assert_eq!(unresolved_libraries(&linked), vec!["LibMath".to_string()]);
    }

    #[test]
    fn test_unresolved_are_sorted_and_deduplicated() {
        let code = code_with(&["B", "A", "B", "A", "B"]);
        assert_eq!(unresolved_libraries(&code), vec!["A", "B"]);
    }

    #[test]
    fn test_adjacent_placeholders_are_separate_tokens() {
        let code = format!("0x{}{}00{}", placeholder("Math"), placeholder("Set"), placeholder("Math"));
        assert_eq!(unresolved_libraries(&code), vec!["Math", "Set"]);
    }

    #[test]
    fn test_no_placeholders_no_unresolved() {
        assert!(unresolved_libraries("0x6060604052").is_empty());
    }

    proptest! {
        #[test]
        fn prop_linking_is_deterministic(
            names in proptest::collection::btree_set("[A-Z][a-zA-Z0-9]{0,12}", 0..4),
            byte in any::<u8>(),
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let code = code_with(&refs);
            let links: BTreeMap<String, Address> = names
                .iter()
                .map(|n| (n.clone(), Address::repeat_byte(byte)))
                .collect();
            let first = link_bytecode(&code, &links);
            let second = link_bytecode(&code, &links);
            prop_assert_eq!(&first, &second);
            prop_assert!(unresolved_libraries(&first).is_empty());
        }

        #[test]
        fn prop_hex_only_bytecode_has_no_unresolved(code in "0x[0-9a-f]{0,200}") {
            prop_assert!(unresolved_libraries(&code).is_empty());
        }

        #[test]
        fn prop_each_unresolved_name_reported_once(repeats in 1usize..6) {
            let mut parts = Vec::new();
            for _ in 0..repeats {
                parts.push("A");
                parts.push("B");
            }
            let names = unresolved_libraries(&code_with(&parts));
            prop_assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
        }
    }
}
