use anyhow::{Context, Result};
use redactor_core::{FieldMutators, FieldValues, PostType};
use std::fs;
use std::path::{Path, PathBuf};

/// A post draft kept in a JSON file (`{title, abstract, body, tags}`).
///
/// The draft is the host editor for the session: the session mutates it
/// through [`FieldMutators`] and the CLI writes it back with [`Draft::save`].
#[derive(Debug, Clone)]
pub struct Draft {
    path: PathBuf,
    values: FieldValues,
}

impl Draft {
    /// Load the draft at `path`; a missing file starts an empty draft
    pub fn load(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read draft {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse draft {}", path.display()))?
        } else {
            FieldValues::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write draft {}", self.path.display()))?;
        Ok(())
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Snapshot of the editing state sent along with every request
    pub fn context(&self, post_type: PostType) -> String {
        let values = &self.values;
        let mut lines = vec![
            format!("Post type: {}", post_type.as_str()),
            format!("Title: {}", values.title),
            format!("Abstract: {}", values.abstract_text),
            format!("Tags: {}", values.tags.join(", ")),
        ];
        if values.body.trim().is_empty() {
            lines.push(format!("{}: (empty)", capitalize(post_type.body_name())));
        } else {
            lines.push(format!("{}:", capitalize(post_type.body_name())));
            lines.push(values.body.clone());
        }
        lines.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl FieldMutators for Draft {
    fn apply_title(&mut self, title: &str) {
        self.values.title = title.to_string();
    }

    fn apply_abstract(&mut self, abstract_text: &str) {
        self.values.abstract_text = abstract_text.to_string();
    }

    fn replace_body(&mut self, body: &str) {
        self.values.body = body.to_string();
    }

    fn append_body(&mut self, body: &str) {
        let current = self.values.body.trim_end();
        self.values.body = if current.is_empty() {
            body.to_string()
        } else {
            format!("{}\n\n{}", current, body)
        };
    }

    fn apply_tags(&mut self, tags: &[String]) {
        self.values.tags = tags.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_draft() {
        let dir = tempfile::tempdir().unwrap();
        let draft = Draft::load(&dir.path().join("post.json")).unwrap();
        assert_eq!(draft.values(), &FieldValues::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts").join("post.json");
        let mut draft = Draft::load(&path).unwrap();
        draft.apply_title("Hooks in Practice");
        draft.apply_abstract("A tour of hooks.");
        draft.apply_tags(&["react".to_string(), "hooks".to_string()]);
        draft.save().unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"abstract\": \"A tour of hooks.\""));

        let reloaded = Draft::load(&path).unwrap();
        assert_eq!(reloaded.values().title, "Hooks in Practice");
        assert_eq!(reloaded.values().tags, vec!["react", "hooks"]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.json");
        fs::write(&path, r#"{"title": "Only a title"}"#).unwrap();

        let draft = Draft::load(&path).unwrap();
        assert_eq!(draft.values().title, "Only a title");
        assert!(draft.values().body.is_empty());
        assert!(draft.values().tags.is_empty());
    }

    #[test]
    fn test_append_separates_with_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut draft = Draft::load(&dir.path().join("post.json")).unwrap();
        draft.append_body("First.");
        assert_eq!(draft.values().body, "First.");
        draft.append_body("Second.");
        assert_eq!(draft.values().body, "First.\n\nSecond.");
    }

    #[test]
    fn test_context_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut draft = Draft::load(&dir.path().join("post.json")).unwrap();
        draft.apply_title("Draft");
        draft.apply_tags(&["draft".to_string()]);

        let context = draft.context(PostType::Question);
        assert!(context.starts_with("Post type: question\nTitle: Draft"));
        assert!(context.contains("Tags: draft"));
        assert!(context.ends_with("(empty)"));
    }
}
