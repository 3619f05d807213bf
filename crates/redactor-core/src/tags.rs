//! Tag normalization: sanitizing single tags, parsing free-form tag lists
//! out of assistant replies, and merging them into an existing tag set.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^#?\s*tags?\s*:\s*").expect("valid tag label regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t>*-]*[-*•][ \t]*").expect("valid bullet regex"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,|;]+").expect("valid separator regex"))
}

/// Normalize one tag: lowercase, whitespace runs become `-`, and anything
/// outside `[a-z0-9+-]` is dropped.
pub fn sanitize_tag(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;

    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '+' || c == '-' {
            out.push(c);
        }
    }

    out
}

/// Parse the text of a `#TAGS` section into a sanitized, duplicate-free list.
///
/// Accepts comma/pipe/semicolon separated lists, bullet lists and a leading
/// `Tags:` label. A single token falls back to whitespace splitting so that
/// `rust async tokio` still yields three tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let unlabeled = label_re().replace(trimmed, "");
    let unbulleted = bullet_re().replace_all(&unlabeled, "");
    let joined = unbulleted.replace(['\r', '\n'], ",");

    let parts: Vec<&str> = separator_re()
        .split(&joined)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let tokens: Vec<&str> = if parts.len() <= 1 {
        joined.split_whitespace().collect()
    } else {
        parts
    };

    dedup(tokens.into_iter().map(sanitize_tag))
}

/// `existing` unchanged, followed by sanitized `additions` not already
/// present, in encounter order. The host's list is never rewritten, so
/// merging nothing new gives back exactly `existing`.
pub fn merge_tags(existing: &[String], additions: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let additions: Vec<String> = additions.iter().map(|t| sanitize_tag(t)).collect();

    for tag in &additions {
        if !tag.is_empty() && seen.insert(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

fn dedup(tags: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
