//! Lookup-key normalization for string-keyed relationships.
//!
//! Client names, contract names and invoice numbers act as join keys between
//! invoices, contracts and forecasts. All comparisons go through
//! [`normalize_key`] so that every call site agrees on what "the same" means.

/// Trim, collapse internal whitespace to single spaces, lowercase.
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compare two keys after normalization.
pub fn same_key(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Acme   Health \t Ltd "), "acme health ltd");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_same_key() {
        assert!(same_key("CTR-001 ", "ctr-001"));
        assert!(!same_key("CTR-001", "CTR-002"));
    }
}
