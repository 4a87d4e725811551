//! Dotted-name selectors used by config rules.
//!
//! A selector is `*`, a full name (`a.b.C`), or a prefix wildcard (`a.b.*`).

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Selector matching every element.
pub const UNIVERSAL: &str = "*";

/// Direction of prefix containment between two `.*` selectors.
///
/// Both directions exist in deployed configs, so the choice is explicit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsumptionPolicy {
    /// `a.*` subsumes `a.b.*`.
    #[default]
    Broader,
    /// Legacy: `a.b.*` subsumes `a.*`.
    Reversed,
}

/// Whether `selector` selects the element named `full_name`.
pub fn matches(selector: &str, full_name: &str) -> bool {
    if selector == UNIVERSAL {
        return true;
    }
    match wildcard_prefix(selector) {
        Some(prefix) => full_name.starts_with(prefix),
        None => selector == full_name,
    }
}

/// Whether every element selected by `b` is also selected by `a`.
///
/// A wildcard also subsumes every full name it matches, under either policy.
pub fn subsumes(a: &str, b: &str, policy: SubsumptionPolicy) -> bool {
    if a == UNIVERSAL {
        return true;
    }
    if b == UNIVERSAL {
        return false;
    }
    match (wildcard_prefix(a), wildcard_prefix(b)) {
        (Some(pa), Some(pb)) => match policy {
            SubsumptionPolicy::Broader => pb.starts_with(pa),
            SubsumptionPolicy::Reversed => pa.starts_with(pb),
        },
        (Some(_), None) => matches(a, b),
        _ => a == b,
    }
}

/// Split a comma-joined selector list.
pub fn split(selectors: &str) -> Vec<String> {
    selectors
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether the selector is syntactically valid.
pub fn is_valid(selector: &str) -> bool {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    let grammar = GRAMMAR.get_or_init(|| {
        Regex::new(r"^(\*|\w+(\.\w+)*(\.\*|\([\w.]+\))?)$").expect("selector grammar compiles")
    });
    grammar.is_match(selector)
}

/// `a.b.*` -> `a.b.` (trailing dot kept so `a.*` does not match `ab`).
fn wildcard_prefix(selector: &str) -> Option<&str> {
    selector
        .strip_suffix('*')
        .filter(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_matches_everything() {
        for name in ["a", "a.b.C", ""] {
            assert!(matches("*", name));
        }
    }

    #[test]
    fn wildcard_matches_dotted_prefix_only() {
        assert!(matches("foo.*", "foo.bar"));
        assert!(matches("foo.*", "foo.bar.Baz"));
        assert!(!matches("foo.*", "foobar"));
        assert!(!matches("foo.*", "foo"));
    }

    #[test]
    fn wildcard_matching_is_prefix_test() {
        let names = ["a.b", "a.bc", "ab.c", "a.b.c", "x"];
        for pattern in ["a.*", "a.b.*", "ab.*"] {
            let prefix = &pattern[..pattern.len() - 1];
            for name in names {
                assert_eq!(matches(pattern, name), name.starts_with(prefix));
            }
        }
    }

    #[test]
    fn exact_selectors() {
        assert!(matches("a.B.C", "a.B.C"));
        assert!(!matches("a.B.C", "a.B.CD"));
    }

    #[test]
    fn subsumption_rules() {
        let p = SubsumptionPolicy::Broader;
        assert!(subsumes("*", "a.b", p));
        assert!(subsumes("*", "*", p));
        assert!(!subsumes("a.*", "*", p));
        assert!(subsumes("a.*", "a.b.*", p));
        assert!(!subsumes("a.b.*", "a.*", p));
        assert!(!subsumes("a.*", "ab.*", p));
        assert!(subsumes("a.*", "a.b", p));
        assert!(!subsumes("a.b", "a.*", p));
        assert!(subsumes("a.b", "a.b", p));
        assert!(!subsumes("a.b", "a.c", p));
    }

    #[test]
    fn wildcard_subsumes_exact_names_it_matches() {
        // An exact rule declared before a matching wildcard in the same file
        // can never win, so it is dropped whatever the policy.
        for p in [SubsumptionPolicy::Broader, SubsumptionPolicy::Reversed] {
            assert!(subsumes("a.*", "a.b.C", p));
            assert!(subsumes("a.b.*", "a.b.C", p));
            assert!(!subsumes("a.b.*", "a.c.D", p));
            assert!(!subsumes("a.b.C", "a.b.*", p));
        }
    }

    #[test]
    fn reversed_policy_flips_wildcard_containment() {
        let p = SubsumptionPolicy::Reversed;
        assert!(subsumes("a.b.*", "a.*", p));
        assert!(!subsumes("a.*", "a.b.*", p));
        assert!(subsumes("*", "a.*", p));
    }

    #[test]
    fn split_trims_and_drops_empty() {
        assert_eq!(split(" a.B , c.* ,,"), vec!["a.B", "c.*"]);
    }

    #[test]
    fn grammar() {
        for ok in ["*", "a", "a.b.C", "a.b.*", "a.B(field.sub)", "a_1.b2"] {
            assert!(is_valid(ok), "{} should be valid", ok);
        }
        for bad in ["", "a.", ".a", "a..b", "a.*.b", "a b", "a.b*", "a.(x)", "a.B()"] {
            assert!(!is_valid(bad), "{} should be invalid", bad);
        }
    }
}
