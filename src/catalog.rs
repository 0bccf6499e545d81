//! The fixed catalog of downloadable files.

use std::collections::BTreeMap;

/// File name to declared (human-readable, advisory) size.
pub type Catalog = BTreeMap<String, String>;

const ENTRIES: &[(&str, &str)] = &[
    ("File1.zip", "2MB"),
    ("File2.zip", "10MB"),
    ("File3.zip", "20MB"),
    ("File4.zip", "50MB"),
    ("File5.zip", "100MB"),
];

pub fn get_catalog() -> Catalog {
    ENTRIES
        .iter()
        .map(|(name, size)| (name.to_string(), size.to_string()))
        .collect()
}

pub fn encode_catalog(catalog: &Catalog) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(catalog)
}

pub fn decode_catalog(bytes: &[u8]) -> serde_json::Result<Catalog> {
    serde_json::from_slice(bytes)
}

/// Turn a declared size such as `"10MB"` into a byte estimate.
///
/// The magnitude is every ASCII digit in the string, the unit is the last two
/// characters. `KB` and `MB` scale by 1024 and 1024², anything else is taken
/// as bytes. A string without digits yields 0, meaning "no estimate".
pub fn parse_declared_size(declared: &str) -> u64 {
    let magnitude = declared
        .chars()
        .filter(char::is_ascii_digit)
        .fold(0u64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(c as u8 - b'0'))
        });

    let unit = declared
        .char_indices()
        .rev()
        .nth(1)
        .map_or(declared, |(i, _)| &declared[i..]);

    let multiplier = match unit {
        "KB" => 1024,
        "MB" => 1024 * 1024,
        _ => 1,
    };
    magnitude.saturating_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_compiled_in_entries() {
        let catalog = get_catalog();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get("File1.zip").map(String::as_str), Some("2MB"));
        assert_eq!(catalog.get("File5.zip").map(String::as_str), Some("100MB"));
    }

    #[test]
    fn catalog_survives_json_encoding() {
        let catalog = get_catalog();
        let bytes = encode_catalog(&catalog).unwrap();
        assert_eq!(decode_catalog(&bytes).unwrap(), catalog);

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"File1.zip\":\"2MB\""));
    }

    #[test]
    fn declared_sizes() {
        assert_eq!(parse_declared_size("2MB"), 2 * 1024 * 1024);
        assert_eq!(parse_declared_size("512KB"), 512 * 1024);
        assert_eq!(parse_declared_size("300B"), 300);
        assert_eq!(parse_declared_size("42"), 42);
        assert_eq!(parse_declared_size("MB"), 0);
        assert_eq!(parse_declared_size(""), 0);
    }
}
