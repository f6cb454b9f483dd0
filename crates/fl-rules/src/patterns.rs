//! Candidate pattern generation
//!
//! Given a request URL, offers a short ladder of match patterns from the
//! broadest (the whole domain) to the narrowest (the full URL). The rule
//! wizard shows them in this order and pre-selects the first one.

use fl_core::url::{domain_name, strip_scheme, strip_www, substring_after, substring_before};

use crate::syntax::{MASK_ANY_SYMBOL, MASK_SEPARATOR};

/// Number of path-derived patterns offered between the domain pattern and
/// the full-URL pattern.
pub const PATTERNS_COUNT: usize = 2;

/// Generate candidate patterns for a request URL.
///
/// Output order is:
/// 1. `prefix + domain + "^"`
/// 2. up to [`PATTERNS_COUNT`] directory wildcards (`domain/a/*`, `domain/a/b/*`)
/// 3. the file pattern (`domain/a/file.js`), only when fewer than
///    [`PATTERNS_COUNT`] directory patterns were produced
/// 4. the URL without scheme and leading `www.`, unless it equals an
///    earlier entry
///
/// The query string never contributes to directory or file patterns.
/// `prefix` is prepended verbatim to every entry. URLs without a host yield
/// no candidates.
pub fn generate_patterns(request_url: &str, prefix: &str) -> Vec<String> {
    let domain = domain_name(request_url);
    if domain.is_empty() {
        return Vec::new();
    }

    let mut patterns = Vec::with_capacity(PATTERNS_COUNT + 2);
    patterns.push(format!("{prefix}{domain}{MASK_SEPARATOR}"));

    let relative = substring_after(request_url, &format!("{domain}/"));
    let path = substring_before(relative, "?");

    if !path.is_empty() {
        let parts: Vec<&str> = path.split('/').collect();
        let (file, dirs) = match parts.split_last() {
            Some(split) => split,
            None => (&"", &[][..]),
        };

        let mut pattern = format!("{domain}/");
        let mut offered = 0;
        for dir in dirs.iter().take(PATTERNS_COUNT) {
            pattern.push_str(dir);
            pattern.push('/');
            patterns.push(format!("{prefix}{pattern}{MASK_ANY_SYMBOL}"));
            offered += 1;
        }

        if !file.is_empty() && offered < PATTERNS_COUNT {
            pattern.push_str(file);
            patterns.push(format!("{prefix}{pattern}"));
        }
    }

    let url = strip_www(strip_scheme(request_url));
    let full = format!("{prefix}{url}");
    if !patterns.contains(&full) {
        patterns.push(full);
    }

    patterns
}
