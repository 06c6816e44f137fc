//! Size token table used by capacity checks
//!
//! Disk and RAM requirements are declared with coarse human tokens rather than
//! raw byte counts, so manifests stay readable and comparable. The table is
//! closed: a token outside it is a configuration error.

const M: u64 = 1024 * 1024;
const G: u64 = 1024 * M;

/// All known size tokens with their byte thresholds, in increasing order.
pub const SIZE_TABLE: [(&str, u64); 16] = [
    ("10M", 10 * M),
    ("20M", 20 * M),
    ("40M", 40 * M),
    ("80M", 80 * M),
    ("100M", 100 * M),
    ("200M", 200 * M),
    ("400M", 400 * M),
    ("800M", 800 * M),
    ("1G", G),
    ("2G", 2 * G),
    ("4G", 4 * G),
    ("8G", 8 * G),
    ("10G", 10 * G),
    ("20G", 20 * G),
    ("40G", 40 * G),
    ("80G", 80 * G),
];

/// Byte threshold for a size token, or `None` if the token is unknown.
pub fn threshold(token: &str) -> Option<u64> {
    SIZE_TABLE
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, bytes)| *bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens() {
        assert_eq!(threshold("10M"), Some(10 * 1024 * 1024));
        assert_eq!(threshold("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(threshold("80G"), Some(80 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_unknown_token() {
        assert_eq!(threshold("15M"), None);
        assert_eq!(threshold("1T"), None);
        assert_eq!(threshold(""), None);
    }

    #[test]
    fn test_thresholds_strictly_increase_with_rank() {
        for pair in SIZE_TABLE.windows(2) {
            assert!(
                pair[0].1 < pair[1].1,
                "{} must be smaller than {}",
                pair[0].0,
                pair[1].0
            );
        }
    }

    #[test]
    fn test_byte_value_ordering() {
        assert!(threshold("10M") < threshold("20M"));
        assert!(threshold("800M") < threshold("1G"));
        assert!(threshold("40G") < threshold("80G"));
    }
}
