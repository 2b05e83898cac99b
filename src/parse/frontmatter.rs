use std::collections::BTreeMap;

/// Recognized frontmatter keys, in the order they are serialized.
/// Unknown keys follow in sorted order.
pub const KNOWN_KEYS: [&str; 3] = ["status", "labels", "project"];

/// Parse YAML-ish frontmatter from plan file content.
///
/// The grammar is deliberately restricted: an opening `---` on the first
/// line, flat `key: value` lines, and a closing `---`. Returns the field
/// map and the body (everything after the closing delimiter). Content with
/// no valid frontmatter comes back unchanged as the body.
///
/// CR/LF is normalized to LF before parsing. Empty values are dropped —
/// this pairs with [`serialize_frontmatter`]'s convention that setting a
/// key to the empty string deletes it.
pub fn parse_frontmatter(content: &str) -> (BTreeMap<String, String>, String) {
    let mut fields = BTreeMap::new();
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    if lines.len() < 2 || lines[0] != "---" {
        return (fields, normalized);
    }
    let closing = match lines.iter().skip(1).position(|l| *l == "---") {
        Some(i) => i + 1,
        None => return (fields, normalized),
    };
    for line in &lines[1..closing] {
        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = v.trim();
            if !k.is_empty() && !v.is_empty() {
                fields.insert(k.to_string(), v.to_string());
            }
        }
    }
    let body = lines[closing + 1..].join("\n");
    (fields, body)
}

/// Serialize a field map plus body back into file content.
///
/// Recognized keys come first in fixed order, then unknown keys sorted.
/// An empty field map produces no frontmatter block at all.
pub fn serialize_frontmatter(fields: &BTreeMap<String, String>, body: &str) -> String {
    let non_empty = fields.values().any(|v| !v.is_empty());
    if !non_empty {
        return body.to_string();
    }
    let mut out = String::from("---\n");
    for key in KNOWN_KEYS {
        if let Some(v) = fields.get(key)
            && !v.is_empty()
        {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(v);
            out.push('\n');
        }
    }
    // BTreeMap iteration is already sorted, so unknown keys come out in order
    for (k, v) in fields {
        if KNOWN_KEYS.contains(&k.as_str()) || v.is_empty() {
            continue;
        }
        out.push_str(k);
        out.push_str(": ");
        out.push_str(v);
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

/// Extract the text of the first `# ` heading from a body, if any.
pub fn header_from_body(body: &str) -> Option<String> {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("# ") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_no_frontmatter() {
        let (f, body) = parse_frontmatter("# Title\n\nBody text");
        assert!(f.is_empty());
        assert_eq!(body, "# Title\n\nBody text");
    }

    #[test]
    fn test_parse_status_and_project() {
        let (f, body) = parse_frontmatter("---\nstatus: active\nproject: planc\n---\n# Title\n\nBody");
        assert_eq!(f, fields(&[("status", "active"), ("project", "planc")]));
        assert_eq!(body, "# Title\n\nBody");
    }

    #[test]
    fn test_parse_empty_frontmatter() {
        let (f, body) = parse_frontmatter("---\n---\n# Title");
        assert!(f.is_empty());
        assert_eq!(body, "# Title");
    }

    #[test]
    fn test_parse_no_closing_delimiter() {
        let (f, body) = parse_frontmatter("---\nstatus: active\n# Title");
        assert!(f.is_empty());
        assert_eq!(body, "---\nstatus: active\n# Title");
    }

    #[test]
    fn test_parse_unknown_keys_preserved() {
        let (f, _) = parse_frontmatter("---\nstatus: active\nbranch: feat/foo\n---\nBody");
        assert_eq!(f.get("branch").map(String::as_str), Some("feat/foo"));
    }

    #[test]
    fn test_parse_value_containing_colons() {
        let (f, _) = parse_frontmatter("---\nurl: https://example.com\n---\nBody");
        assert_eq!(f.get("url").map(String::as_str), Some("https://example.com"));
    }

    #[test]
    fn test_parse_crlf_normalized() {
        let (f, body) = parse_frontmatter("---\r\nstatus: done\r\n---\r\nBody\r\n");
        assert_eq!(f.get("status").map(String::as_str), Some("done"));
        assert_eq!(body, "Body\n");
    }

    #[test]
    fn test_parse_empty_values_dropped() {
        let (f, _) = parse_frontmatter("---\nstatus:\nlabels: x\n---\nBody");
        assert!(!f.contains_key("status"));
        assert_eq!(f.get("labels").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_serialize_key_order() {
        let f = fields(&[
            ("branch", "feat/foo"),
            ("status", "active"),
            ("labels", "a, b"),
            ("archive", "yes"),
        ]);
        let out = serialize_frontmatter(&f, "Body\n");
        assert_eq!(
            out,
            "---\nstatus: active\nlabels: a, b\narchive: yes\nbranch: feat/foo\n---\nBody\n"
        );
    }

    #[test]
    fn test_serialize_empty_fields_elided() {
        let f = BTreeMap::new();
        assert_eq!(serialize_frontmatter(&f, "# Plan\n"), "# Plan\n");
        let f = fields(&[("status", "")]);
        assert_eq!(serialize_frontmatter(&f, "# Plan\n"), "# Plan\n");
    }

    #[test]
    fn test_round_trip() {
        let f = fields(&[("status", "active"), ("labels", "infra, web")]);
        let out = serialize_frontmatter(&f, "# Plan\n\nBody\n");
        let (parsed, body) = parse_frontmatter(&out);
        assert_eq!(parsed, f);
        assert_eq!(body, "# Plan\n\nBody\n");
    }

    #[test]
    fn test_header_from_body() {
        assert_eq!(header_from_body("intro\n# My Plan\ntext"), Some("My Plan".into()));
        assert_eq!(header_from_body("## Not top level\ntext"), None);
        assert_eq!(header_from_body("  # Indented Heading"), Some("Indented Heading".into()));
    }
}
