//! Dotted version comparison for the compatibility handshake.

use std::cmp::Ordering;

/// Compare two dotted version strings component by component.
///
/// Components are compared numerically. Non-digit characters inside a
/// component are ignored, and a missing component counts as 0, so
/// `"2.1"` equals `"2.1.0"` and `"3.0-rc1"` parses as `3.01`.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left: Vec<u64> = components(left).collect();
    let right: Vec<u64> = components(right).collect();
    let len = left.len().max(right.len());

    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn components(version: &str) -> impl Iterator<Item = u64> + '_ {
    version.trim().split('.').map(|part| {
        part.chars()
            .filter_map(|c| c.to_digit(10))
            .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_versions() {
        assert_eq!(compare_versions("2.14.1", "2.14.1"), Ordering::Equal);
        assert_eq!(compare_versions("2.1", "2.1.0"), Ordering::Equal);
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert_eq!(compare_versions("2.10.0", "2.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.9", "1.10"), Ordering::Less);
    }

    #[test]
    fn test_longer_version_wins_when_prefix_matches() {
        assert_eq!(compare_versions("3.0.1", "3.0"), Ordering::Greater);
        assert_eq!(compare_versions("3", "3.0.0.1"), Ordering::Less);
    }

    #[test]
    fn test_non_digits_ignored() {
        assert_eq!(compare_versions("v2.3", "2.3"), Ordering::Equal);
        assert_eq!(compare_versions(" 2.3 \n", "2.3"), Ordering::Equal);
        assert_eq!(compare_versions("2.x", "2.0"), Ordering::Equal);
    }
}
