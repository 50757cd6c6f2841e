//! Content fingerprints for cross-indexer deduplication.
//!
//! A fingerprint combines a normalised title key with a logarithmic size
//! bucket, so the same release listed by several indexers (with different
//! punctuation, casing, or a few bytes of size drift) maps to the same key.
//!
//! Fuzzy matching widens this: titles whose token sets overlap by at least
//! the configured Jaccard threshold, with size buckets at most one apart,
//! are also treated as the same release. Tokens carrying a digit (episode
//! markers, versions, years, codecs) must match exactly, since they tell
//! different content apart.

use std::collections::BTreeSet;

/// Width of one size bucket: sizes within 2% of each other share a bucket
/// or land in adjacent ones.
const SIZE_BUCKET_RATIO: f64 = 1.02;

/// Split a release title into lowercase alphanumeric tokens.
///
/// ```
/// use annatar_search::orchestrator::fingerprint::title_tokens;
///
/// assert_eq!(
///     title_tokens("Ubuntu.22.04 [1080p]"),
///     vec!["ubuntu", "22", "04", "1080p"]
/// );
/// ```
pub fn title_tokens(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Logarithmic size bucket. Unknown sizes (0) map to bucket 0.
pub fn size_bucket(size: u64) -> u64 {
    if size == 0 {
        return 0;
    }
    ((size as f64).ln() / SIZE_BUCKET_RATIO.ln()).floor() as u64 + 1
}

/// Fingerprint string: `"{title tokens joined by space}|{size bucket}"`.
pub fn fingerprint(title: &str, size: u64) -> String {
    format!("{}|{}", title_tokens(title).join(" "), size_bucket(size))
}

/// Jaccard similarity of two token sets, in `[0, 1]`.
pub fn token_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let total = a.union(b).count();
    shared as f64 / total as f64
}

fn has_digit(token: &&String) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
}

/// Whether two token sets carry the same numeric tokens.
pub fn numeric_tokens_match(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.iter().filter(has_digit).eq(b.iter().filter(has_digit))
}

/// Whether two releases are close enough to be merged.
///
/// Both sizes must be known and their buckets at most one apart, the
/// numeric tokens must be identical, and the titles must reach `threshold`
/// token similarity.
pub fn is_similar(
    tokens_a: &BTreeSet<String>,
    size_a: u64,
    tokens_b: &BTreeSet<String>,
    size_b: u64,
    threshold: f64,
) -> bool {
    if size_a == 0 || size_b == 0 {
        return false;
    }
    if size_bucket(size_a).abs_diff(size_bucket(size_b)) > 1 {
        return false;
    }
    if !numeric_tokens_match(tokens_a, tokens_b) {
        return false;
    }
    token_similarity(tokens_a, tokens_b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(title: &str) -> BTreeSet<String> {
        title_tokens(title).into_iter().collect()
    }

    #[test]
    fn punctuation_and_case_do_not_change_fingerprint() {
        let a = fingerprint("Ubuntu 22.04 LTS Desktop (2022) [1080p] [WEBRip]", 2_147_483_648);
        let b = fingerprint("ubuntu.22.04.lts.desktop.2022.1080p.webrip", 2_147_483_648);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_has_title_and_bucket() {
        let fp = fingerprint("Ubuntu 22.04", 0);
        assert_eq!(fp, "ubuntu 22 04|0");
    }

    #[test]
    fn different_sizes_change_fingerprint() {
        let a = fingerprint("Ubuntu 22.04", 1_000_000_000);
        let b = fingerprint("Ubuntu 22.04", 4_000_000_000);
        assert_ne!(a, b);
    }

    #[test]
    fn nearby_sizes_share_or_neighbour_bucket() {
        let a = size_bucket(2_147_483_648);
        let b = size_bucket(2_147_000_000);
        assert!(a.abs_diff(b) <= 1);
    }

    #[test]
    fn unknown_size_bucket_is_zero() {
        assert_eq!(size_bucket(0), 0);
        assert!(size_bucket(1) >= 1);
    }

    #[test]
    fn buckets_are_monotonic() {
        let sizes = [1u64, 1_000, 1_000_000, 1_000_000_000, 10_000_000_000];
        for pair in sizes.windows(2) {
            assert!(size_bucket(pair[0]) < size_bucket(pair[1]));
        }
    }

    #[test]
    fn similarity_of_identical_titles_is_one() {
        let a = set("Ubuntu 22.04 Desktop");
        assert!((token_similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_of_disjoint_titles_is_zero() {
        assert!(token_similarity(&set("ubuntu"), &set("fedora")).abs() < f64::EPSILON);
    }

    #[test]
    fn similar_releases_match() {
        // 8 shared tokens of 9 total.
        let a = set("Ubuntu 22.04 LTS Desktop 2022 1080p WEBRip AMZN");
        let b = set("Ubuntu 22.04 LTS Desktop 2022 1080p WEBRip");
        assert!(is_similar(&a, 2_000_000_000, &b, 2_010_000_000, 0.8));
    }

    #[test]
    fn different_quality_tags_do_not_match_at_high_threshold() {
        let a = set("Ubuntu 22.04 1080p");
        let b = set("Ubuntu 22.04 720p");
        assert!(!is_similar(&a, 2_000_000_000, &b, 2_000_000_000, 0.8));
    }

    #[test]
    fn different_episode_markers_do_not_match() {
        // 9 shared tokens of 11 total, above the threshold on overlap alone.
        let a = set("The Expanse S02E05 1080p WEB-DL DD5.1 H264-NTb");
        let b = set("The Expanse S02E06 1080p WEB-DL DD5.1 H264-NTb");
        assert!(token_similarity(&a, &b) >= 0.8);
        assert!(!is_similar(&a, 2_900_000_000, &b, 2_950_000_000, 0.8));
    }

    #[test]
    fn numeric_tokens_compare_as_sets() {
        assert!(numeric_tokens_match(&set("Ubuntu 22.04 Desktop"), &set("ubuntu desktop 22 04")));
        assert!(!numeric_tokens_match(&set("Ubuntu 22.04"), &set("Ubuntu 22.10")));
        assert!(!numeric_tokens_match(&set("Ubuntu 22.04 x264"), &set("Ubuntu 22.04")));
    }

    #[test]
    fn distant_sizes_do_not_match() {
        let a = set("Ubuntu 22.04");
        assert!(!is_similar(&a, 1_000_000_000, &a, 2_000_000_000, 0.5));
    }

    #[test]
    fn unknown_sizes_never_fuzzy_match() {
        let a = set("Ubuntu 22.04");
        assert!(!is_similar(&a, 0, &a, 0, 0.5));
    }
}
