//! Canonical comparison keys for free-text fields.
//!
//! Every function here is pure: the same input always yields the same key,
//! so keys can be recomputed at any point instead of being stored.

use regex::Regex;
use std::sync::OnceLock;

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a\s+[^>]*href\s*=\s*['"]([^'"]*)['"][^>]*>(.*?)</a>"#).unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Recover the href and visible text from an anchor-encoded field.
///
/// Source exports disagree on quoting: single quotes, double quotes, and
/// CSV-style doubled quotes (`href=""...""`) all occur, so doubled quotes
/// collapse to single ones before matching. Returns None when the value
/// contains no anchor at all.
pub fn split_anchor(raw: &str) -> Option<(String, String)> {
    let unescaped = raw.replace("\"\"", "\"");
    let caps = anchor_re().captures(&unescaped)?;
    let href = caps[1].trim().to_string();
    let text = tag_re().replace_all(&caps[2], "").trim().to_string();
    Some((href, text))
}

/// Lowercase, drop everything that is not alphanumeric or whitespace,
/// collapse whitespace runs, trim.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for a link field.
///
/// Anchor-encoded values contribute both the href and the visible text;
/// bare URLs contribute only themselves. Query strings and fragments are
/// stripped so tracking parameters never defeat exact matching.
pub fn normalize_link(link: &str) -> String {
    let (href, text) = split_anchor(link).unwrap_or_else(|| (link.trim().to_string(), String::new()));
    let href = strip_query(&href);
    let combined = format!("{} {}", href, text).to_lowercase();
    let spaced: String = combined
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Combined key used for fuzzy comparison: normalized link, then title.
pub fn combined_key(title: &str, link: &str) -> String {
    let link_part = normalize_link(link);
    let title_part = normalize_title(title);
    match (link_part.is_empty(), title_part.is_empty()) {
        (true, _) => title_part,
        (_, true) => link_part,
        _ => format!("{} {}", link_part, title_part),
    }
}

fn strip_query(url: &str) -> String {
    let no_query = url.split('?').next().unwrap_or_default();
    let no_fragment = no_query.split('#').next().unwrap_or_default();
    no_fragment.trim().to_string()
}

/// Reduce numeric-looking text to its minimal form: "2015.0" becomes "2015",
/// "12.34" stays "12.34". Anything else passes through trimmed. Idempotent,
/// so repeated merge passes do not accumulate formatting artifacts.
pub fn canonicalize_numeric(value: &str) -> String {
    static WHOLE: OnceLock<Regex> = OnceLock::new();
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    let whole = WHOLE.get_or_init(|| Regex::new(r"^\d+\.0+$").unwrap());
    let decimal = DECIMAL.get_or_init(|| Regex::new(r"^\d+\.\d+$").unwrap());

    let s = value.trim();
    if whole.is_match(s) {
        s.split('.').next().unwrap_or_default().to_string()
    } else if decimal.is_match(s) {
        match s.parse::<f64>() {
            Ok(f) => format!("{}", f),
            Err(_) => s.to_string(),
        }
    } else {
        s.to_string()
    }
}

/// Whitespace-insensitive textual equality, used when deciding whether two
/// field values actually differ during a merge.
pub fn text_eq(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}
