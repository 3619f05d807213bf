//! Extraction of edit directives and labeled sections from assistant replies.
//!
//! The assistant is asked to finish its reply with a fenced JSON block:
//!
//! ~~~text
//! ```json
//! {"actions":[{"type":"APPLY_TITLE","title":"..."}],"confidence":0.8}
//! ```
//! ~~~
//!
//! and to put proposed field contents under `#TITLE`, `#ABSTRACT`,
//! `#BODY_MD` (or `#BODY`) and `#TAGS` markers. Replies are untrusted text,
//! so every function here is total: malformed input degrades to fewer
//! actions or absent sections, never to an error.

use crate::state::Sections;
use crate::tags::parse_tags;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn json_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").expect("valid json block regex"))
}

fn section_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)#(TITLE|ABSTRACT|BODY_MD|BODY|TAGS)[ \t]*\r?\n").expect("valid section marker regex")
    })
}

fn next_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n#\w+\b").expect("valid marker regex"))
}

/// One structured edit instruction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ReplaceBody {
        #[serde(default, alias = "body")]
        body_md: Option<String>,
    },
    AppendBody {
        #[serde(default, alias = "body")]
        body_md: Option<String>,
    },
    ApplyTitle {
        #[serde(default)]
        title: Option<String>,
    },
    ApplyAbstract {
        #[serde(default, rename = "abstract")]
        abstract_text: Option<String>,
    },
    ApplyTags {
        #[serde(default)]
        tags: Vec<String>,
    },
    Confirm {
        #[serde(default)]
        question: Option<String>,
    },
}

/// The decoded contents of the authoritative directive block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub actions: Vec<Action>,
    pub confidence: Option<f64>,
}

impl Directives {
    /// Questions carried by `CONFIRM` actions, in order
    pub fn confirmations(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Confirm { question } => question
                    .as_deref()
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

/// Decode a block body as an actions container. `None` unless it is a JSON
/// object with an `actions` array.
fn decode_container(body: &str) -> Option<Directives> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let object = parsed.as_object()?;
    let raw_actions = object.get("actions")?.as_array()?;

    let actions = raw_actions
        .iter()
        .filter_map(|raw| match Action::deserialize(raw) {
            Ok(action) => Some(action),
            Err(e) => {
                debug!("skipping unrecognized action: {}", e);
                None
            }
        })
        .collect();

    Some(Directives {
        actions,
        confidence: object.get("confidence").and_then(Value::as_f64),
    })
}

/// Extract the directives from the last fenced JSON block in `text`.
///
/// Earlier blocks are ignored, which tolerates the assistant showing an
/// example before its real answer.
pub fn extract_directives(text: &str) -> Directives {
    let Some(last) = json_block_re().captures_iter(text).last() else {
        return Directives::default();
    };
    let body = last.get(1).map_or("", |m| m.as_str());

    match decode_container(body) {
        Some(directives) => {
            debug!(actions = directives.actions.len(), "decoded directive block");
            directives
        }
        None => {
            warn!("last json block is not a valid actions container, ignoring");
            Directives::default()
        }
    }
}

/// Reply text for display: valid directive blocks removed, anything else
/// (including malformed or unrelated JSON blocks) left in place.
pub fn strip_directive_blocks(text: &str) -> String {
    json_block_re()
        .replace_all(text, |caps: &regex::Captures| {
            let body = caps.get(1).map_or("", |m| m.as_str());
            if decode_container(body).is_some() {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .trim()
        .to_string()
}

/// Text following the first `#NAME` marker line up to the next marker line
/// or the end of `text`, trimmed. Empty sections are absent.
fn section(text: &str, name: &str) -> Option<String> {
    let start = section_marker_re()
        .captures_iter(text)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))?
        .get(0)?
        .end();
    let rest = &text[start..];
    let end = next_marker_re().find(rest).map_or(rest.len(), |m| m.start());
    let content = rest[..end].trim();

    (!content.is_empty()).then(|| content.to_string())
}

/// Find the labeled sections in a reply
pub fn parse_sections(text: &str) -> Sections {
    Sections {
        title: section(text, "TITLE"),
        abstract_text: section(text, "ABSTRACT"),
        body: section(text, "BODY_MD").or_else(|| section(text, "BODY")),
        tags: section(text, "TAGS")
            .map(|raw| parse_tags(&raw))
            .unwrap_or_default(),
    }
}

/// Everything the parser finds in one reply
#[derive(Debug, Clone, Default)]
pub struct ParsedReply {
    pub display_text: String,
    pub directives: Directives,
    pub sections: Sections,
}

pub fn parse_reply(text: &str) -> ParsedReply {
    ParsedReply {
        display_text: strip_directive_blocks(text),
        directives: extract_directives(text),
        sections: parse_sections(text),
    }
}
