//! Reconciles parsed directives and sections against the current field
//! values, producing the ordered list of changes offered for one turn.

use crate::directive::Action;
use crate::state::{Change, ChangeKind, Field, FieldValue, FieldValues, Sections};
use crate::tags::merge_tags;
use std::collections::HashSet;

const BODY_PREVIEW_CHARS: usize = 220;
const ABSTRACT_PREVIEW_CHARS: usize = 180;

/// Trimmed text, truncated to `max` characters with an ellipsis
pub fn short_text(value: &str, max: usize) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        let cut: String = trimmed.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        trimmed.to_string()
    }
}

fn preview(field: Field, value: &FieldValue) -> String {
    match value {
        FieldValue::Tags(tags) => tags.join(", "),
        FieldValue::Text(text) => match field {
            Field::Body => short_text(text, BODY_PREVIEW_CHARS),
            Field::Abstract => short_text(text, ABSTRACT_PREVIEW_CHARS),
            _ => text.clone(),
        },
    }
}

fn new_change_id(field: Field, kind: ChangeKind) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{}:{}-{}", field, kind, &nonce[..12])
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Accumulates changes, keeping only the first per `(field, kind)`
struct ChangeList<'a> {
    values: &'a FieldValues,
    seen: HashSet<(Field, ChangeKind)>,
    items: Vec<Change>,
}

impl<'a> ChangeList<'a> {
    fn new(values: &'a FieldValues) -> Self {
        Self {
            values,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, field: Field, kind: ChangeKind, value: FieldValue) {
        if !self.seen.insert((field, kind)) {
            return;
        }
        self.items.push(Change {
            id: new_change_id(field, kind),
            field,
            kind,
            label: field.label().to_string(),
            preview: preview(field, &value),
            value,
        });
    }

    /// Replace a text field unless the candidate is empty or unchanged
    fn replace_text(&mut self, field: Field, candidate: Option<&str>) {
        let Some(next) = non_empty(candidate) else {
            return;
        };
        let values = self.values;
        let current = match field {
            Field::Title => &values.title,
            Field::Abstract => &values.abstract_text,
            Field::Body => &values.body,
            Field::Tags => return,
        };
        if next != current.trim() {
            self.push(field, ChangeKind::Replace, FieldValue::Text(next.to_string()));
        }
    }

    fn append_body(&mut self, candidate: Option<&str>) {
        if let Some(next) = non_empty(candidate) {
            self.push(
                Field::Body,
                ChangeKind::Append,
                FieldValue::Text(next.to_string()),
            );
        }
    }

    /// Union-merge tags unless that leaves the current list unchanged
    fn union_tags(&mut self, additions: &[String]) {
        if additions.is_empty() {
            return;
        }
        let merged = merge_tags(&self.values.tags, additions);
        if merged != self.values.tags {
            self.push(Field::Tags, ChangeKind::Replace, FieldValue::Tags(merged));
        }
    }

    fn action(&mut self, action: &Action) {
        match action {
            Action::ReplaceBody { body_md } => self.replace_text(Field::Body, body_md.as_deref()),
            Action::AppendBody { body_md } => self.append_body(body_md.as_deref()),
            Action::ApplyTitle { title } => self.replace_text(Field::Title, title.as_deref()),
            Action::ApplyAbstract { abstract_text } => {
                self.replace_text(Field::Abstract, abstract_text.as_deref())
            }
            Action::ApplyTags { tags } => self.union_tags(tags),
            Action::Confirm { .. } => {}
        }
    }

    /// Sections are all replace edits; a directive already seen for the
    /// same `(field, kind)` keeps its place
    fn sections(&mut self, sections: &Sections) {
        self.replace_text(Field::Title, sections.title.as_deref());
        self.replace_text(Field::Abstract, sections.abstract_text.as_deref());
        self.replace_text(Field::Body, sections.body.as_deref());
        self.union_tags(&sections.tags);
    }
}

/// Build the ordered, de-duplicated change list for one reply.
///
/// Directives are processed first, then labeled sections; only the first
/// edit per `(field, kind)` is kept. Edits that would leave a field unchanged
/// are dropped, except body appends, which always change the content.
pub fn build_changes(actions: &[Action], sections: &Sections, values: &FieldValues) -> Vec<Change> {
    let mut list = ChangeList::new(values);
    for action in actions {
        list.action(action);
    }
    list.sections(sections);
    list.items
}
