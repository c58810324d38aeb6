//! Numeric comparison of dotted version strings.
//!
//! Versions are compared component by component as integers, with missing components
//! treated as `0`, so `1.10` is newer than `1.9` and `2.0` equals `2`. A component that is
//! not a number (such as `0-beta`) sorts below any numeric component; two non-numeric
//! components fall back to a plain string comparison.

use std::cmp::Ordering;

/// Compares two dotted version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or("0");
        let r = right.get(i).copied().unwrap_or("0");
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Compares two versions found in download URLs, ignoring a leading `v` on either side.
pub fn version_compare(a: &str, b: &str) -> Ordering {
    compare(strip_v(a), strip_v(b))
}

/// Sorts version strings ascending.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(a, b));
}

/// Returns the greatest version of the iterator, if any.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| version_compare(a, b))
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}
