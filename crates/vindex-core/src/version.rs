//! PEP 440 ordering helpers.

use pep440_rs::Version;
use std::cmp::Ordering;
use std::str::FromStr;

/// Parses a version string, returning `None` if it is not valid PEP 440.
pub fn parse_version(version: &str) -> Option<Version> {
    Version::from_str(version).ok()
}

/// Compares two version strings by PEP 440 semantics.
///
/// Invalid versions order below every valid one; two invalid versions
/// compare as equal so callers can fall through to a secondary key.
///
/// # Examples
///
/// ```
/// use vindex_core::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
/// assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Equal);
/// assert_eq!(compare_versions("not-a-version", "0.1"), Ordering::Less);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
