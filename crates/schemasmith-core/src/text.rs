//! Small case-insensitive string helpers shared by naming and registration.

/// ASCII case-insensitive `starts_with`.
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// ASCII case-insensitive `ends_with`.
pub fn ends_with_ignore_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value
            .get(value.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Strip `prefix` from the start of `value`, ignoring ASCII case.
pub fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if starts_with_ignore_case(value, prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

/// Upper-case the first character.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `my_new_table` -> `MyNewTable`.
pub fn camel_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

/// `my_new_table` -> `My New Table`.
pub fn title_words(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| capitalize(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Treat absent, empty and the literal `"null"` as missing.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_affixes() {
        assert!(starts_with_ignore_case("TEST_orders", "test_"));
        assert!(!starts_with_ignore_case("te", "test_"));
        assert!(ends_with_ignore_case("orders_V", "_v"));
        assert!(!ends_with_ignore_case("v", "_v"));
        assert_eq!(strip_prefix_ignore_case("Test_orders", "TEST_"), Some("orders"));
        assert_eq!(strip_prefix_ignore_case("orders", "TEST_"), None);
    }

    #[test]
    fn test_name_shapes() {
        assert_eq!(camel_case("my_new_table"), "MyNewTable");
        assert_eq!(camel_case("orders"), "Orders");
        assert_eq!(title_words("sales_ORDER line"), "Sales Order Line");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some(" x ")), Some("x"));
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some("null")), None);
        assert_eq!(non_blank(None), None);
    }
}
