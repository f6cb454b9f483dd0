//! Rule text composition
//!
//! Appends the selected modifiers to a match pattern. Option order is fixed
//! so the same selection always produces byte-identical rule text.

use crate::syntax::{DOMAIN_OPTION, MATCH_CASE_OPTION, OPTIONS_DELIMITER, THIRD_PARTY_OPTION};

bitflags::bitflags! {
    /// Modifiers the operator can toggle in the rule wizard.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuleModifiers: u8 {
        /// $domain=<frame domain> - restrict the rule to the current site
        const DOMAIN = 1 << 0;
        /// $match-case - case-sensitive pattern
        const MATCH_CASE = 1 << 1;
        /// $third-party - only third-party requests
        const THIRD_PARTY = 1 << 2;
    }
}

/// Build rule text from a pattern and modifiers.
///
/// Options are emitted in the order `domain=`, `match-case`, `third-party`.
/// With no modifiers the pattern is returned unchanged.
pub fn compose_rule(pattern: &str, domain: &str, modifiers: RuleModifiers) -> String {
    let mut options: Vec<String> = Vec::with_capacity(3);

    if modifiers.contains(RuleModifiers::DOMAIN) {
        options.push(format!("{DOMAIN_OPTION}={domain}"));
    }
    if modifiers.contains(RuleModifiers::MATCH_CASE) {
        options.push(MATCH_CASE_OPTION.to_string());
    }
    if modifiers.contains(RuleModifiers::THIRD_PARTY) {
        options.push(THIRD_PARTY_OPTION.to_string());
    }

    if options.is_empty() {
        return pattern.to_string();
    }
    format!("{pattern}{OPTIONS_DELIMITER}{}", options.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_options_in_fixed_order() {
        assert_eq!(
            compose_rule("||example.com^", "example.com", RuleModifiers::all()),
            "||example.com^$domain=example.com,match-case,third-party"
        );
    }

    #[test]
    fn test_no_options_returns_pattern() {
        assert_eq!(
            compose_rule("example.com/ads/*", "news.org", RuleModifiers::empty()),
            "example.com/ads/*"
        );
    }

    #[test]
    fn test_partial_options() {
        assert_eq!(
            compose_rule("@@||cdn.net^", "site.org", RuleModifiers::DOMAIN | RuleModifiers::THIRD_PARTY),
            "@@||cdn.net^$domain=site.org,third-party"
        );
        assert_eq!(
            compose_rule("cdn.net/x.js", "site.org", RuleModifiers::MATCH_CASE),
            "cdn.net/x.js$match-case"
        );
    }
}
