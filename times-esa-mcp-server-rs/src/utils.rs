use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub values: HashMap<String, String>,
    pub flags: HashSet<String>,
}

pub fn parse_args(argv: &[String]) -> ParsedArgs {
    let mut result = ParsedArgs::default();
    let mut i = 0;
    while i < argv.len() {
        let token = &argv[i];
        if !token.starts_with('-') {
            i += 1;
            continue;
        }
        let key = token.trim_start_matches('-');
        if key.is_empty() {
            i += 1;
            continue;
        }
        if let Some((name, inline)) = key.split_once('=') {
            result.values.insert(name.to_string(), inline.to_string());
            i += 1;
            continue;
        }
        if let Some(next_val) = argv.get(i + 1) {
            if !next_val.starts_with('-') {
                result.values.insert(key.to_string(), next_val.to_string());
                i += 2;
                continue;
            }
        }
        result.flags.insert(key.to_string());
        i += 1;
    }
    result
}

pub fn safe_trim(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn normalize_tags(tags: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |value: &str| {
        let normalized = safe_trim(Some(value));
        if normalized.is_empty() {
            return;
        }
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    };

    match tags {
        Some(Value::Array(arr)) => {
            for item in arr {
                if let Some(text) = item.as_str() {
                    push(text);
                }
            }
        }
        Some(Value::String(text)) => push(text),
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_values_flags_and_inline_values() {
        let args = parse_args(&argv(&["extra", "--team", "acme", "--threshold=0.8", "--help"]));
        assert_eq!(args.values.get("team").map(String::as_str), Some("acme"));
        assert_eq!(args.values.get("threshold").map(String::as_str), Some("0.8"));
        assert!(args.flags.contains("help"));
        assert!(!args.values.contains_key("extra"));
        assert!(!args.flags.contains("extra"));
    }

    #[test]
    fn bare_word_after_flag_becomes_value() {
        let args = parse_args(&argv(&["-h", "x"]));
        assert_eq!(args.values.get("h").map(String::as_str), Some("x"));
        let args = parse_args(&argv(&["x", "-h"]));
        assert!(args.flags.contains("h"));
        assert!(args.values.is_empty());
    }

    #[test]
    fn bools() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(normalize_tags(Some(&json!([" a ", "b", "a", "", 3]))), vec!["a", "b"]);
        assert_eq!(normalize_tags(Some(&json!("solo"))), vec!["solo"]);
        assert!(normalize_tags(None).is_empty());
    }
}
