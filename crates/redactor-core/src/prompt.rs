//! Prompt templates for editor requests.
//!
//! Plain input gets a general "do what the user asked" template. Input that
//! starts with a slash command (`/title`, `/abstract`, `/tags`, `/write`,
//! `/code`, `/improve`) gets a narrower template that tells the assistant
//! which sections to return and which single field to touch. Every template
//! ends with [`ACTION_GUIDE`], the contract the directive parser relies on.

use crate::ai::CompletionRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Feature name sent to the assist endpoint for editor requests
pub const EDITOR_FEATURE: &str = "editor";

pub const ACTION_GUIDE: &str = concat!(
    "After your natural-language reply, include one fenced JSON block describing every concrete edit you want applied:\n",
    "```json\n",
    r#"{"actions":[{"type":"REPLACE_BODY","body_md":"..."},{"type":"APPEND_BODY","body_md":"..."},{"type":"APPLY_TITLE","title":"..."},{"type":"APPLY_ABSTRACT","abstract":"..."},{"type":"APPLY_TAGS","tags":["..."]},{"type":"CONFIRM","question":"..."}],"confidence":0.0}"#,
    "\n```\n",
    "Always include an action whenever you change title, abstract, body, or tags. Use APPEND_BODY for additive snippets and REPLACE_BODY when overwriting.\n",
    "Match the user's instruction exactly; only ask for clarification if you truly cannot act."
);

fn command_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^/(\w+)\s*(.*)$").expect("valid command regex"))
}

/// What kind of post is being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Article,
    Question,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Article => "article",
            PostType::Question => "question",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "article" => Some(PostType::Article),
            "question" => Some(PostType::Question),
            _ => None,
        }
    }

    pub fn body_name(&self) -> &'static str {
        match self {
            PostType::Article => "article body",
            PostType::Question => "question description",
        }
    }
}

/// A slash command recognized at the start of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Title,
    Abstract,
    Tags,
    Write(String),
    Code(String),
    Improve,
    Unknown(String),
}

impl Command {
    /// Parse a leading `/command rest`. `None` for ordinary input.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = command_re().captures(input.trim())?;
        let name = caps[1].to_lowercase();
        let rest = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();

        Some(match name.as_str() {
            "title" => Command::Title,
            "abstract" => Command::Abstract,
            "tags" => Command::Tags,
            "write" => Command::Write(rest),
            "code" => Command::Code(rest),
            "improve" => Command::Improve,
            _ => Command::Unknown(name),
        })
    }
}

fn request(prompt: String, context: String) -> CompletionRequest {
    CompletionRequest {
        feature: EDITOR_FEATURE.to_string(),
        prompt,
        context,
    }
}

fn with_suffix(context: &str, suffix: &str) -> String {
    format!("{}\n{}", context, suffix)
}

/// Build the request for one user submission.
///
/// `context` is the host's snapshot of the current editing state.
pub fn build_request(raw: &str, context: &str, post_type: PostType) -> CompletionRequest {
    let raw = raw.trim();

    let Some(command) = Command::parse(raw) else {
        let prompt = [
            "You are a compliant writing assistant embedded in an editor. Do exactly what the user requests.",
            "Respond briefly (2-3 sentences max) acknowledging the action you took, then provide the new content in #TITLE, #ABSTRACT, #BODY_MD, and/or #TAGS sections as appropriate.",
            "If the user only mentions one field (e.g. title), only change that field.",
            "When appending content, clearly indicate the new material in #BODY_MD and use APPEND_BODY in actions.",
            "If the user asks to apply everything, include actions for every field you touched so the UI can apply them automatically.",
            "",
            "User message:",
            raw,
            "",
            ACTION_GUIDE,
        ]
        .join("\n");
        return request(prompt, context.to_string());
    };

    match command {
        Command::Title => request(
            format!(
                "Write the exact title the user would like. Return #TITLE with the final text and include an APPLY_TITLE action only.\n{}",
                ACTION_GUIDE
            ),
            with_suffix(context, "Return #TITLE only."),
        ),
        Command::Abstract => request(
            format!(
                "Produce the requested abstract verbatim. Return #ABSTRACT only and include APPLY_ABSTRACT.\n{}",
                ACTION_GUIDE
            ),
            with_suffix(context, "Return #ABSTRACT only."),
        ),
        Command::Tags => request(
            format!(
                "Return a final tag list (3-6 tags) in #TAGS and include APPLY_TAGS. Tags must be lowercase, hyphenated.\n{}",
                ACTION_GUIDE
            ),
            with_suffix(context, "Return #TAGS only."),
        ),
        Command::Write(rest) => request(
            format!(
                "Write the full content requested: {}. Provide #TITLE, #ABSTRACT, #BODY_MD (Markdown), and #TAGS.\n{}",
                rest, ACTION_GUIDE
            ),
            with_suffix(
                context,
                "Return #BODY_MD (and optionally #TITLE, #ABSTRACT, #TAGS).",
            ),
        ),
        Command::Code(rest) => request(
            format!(
                "Write the code or snippet requested: {}. Return it inside #BODY_MD (Markdown) and include APPEND_BODY unless asked to replace.\n{}",
                rest, ACTION_GUIDE
            ),
            with_suffix(context, "Return #BODY_MD only."),
        ),
        Command::Improve => request(
            format!(
                "Rewrite the current {} as instructed. Return the full replacement in #BODY_MD and include REPLACE_BODY. Preserve Markdown structure.\n{}",
                post_type.body_name(),
                ACTION_GUIDE
            ),
            with_suffix(context, "Return #BODY_MD only."),
        ),
        Command::Unknown(_) => request(
            format!(
                "Acknowledge briefly, then provide concrete suggestions.\nUser message: {}\n{}",
                raw, ACTION_GUIDE
            ),
            context.to_string(),
        ),
    }
}
