use async_trait::async_trait;
use redactor_core::error::Result;
use redactor_core::{
    ApplyOutcome, AssistError, ChangeKind, ChatRole, Completion, CompletionEndpoint,
    CompletionRequest, Field, FieldMutators, FieldValue, FieldValues, Quota, Session, UndoOutcome,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Endpoint that answers from a script and records every request
#[derive(Default)]
struct Scripted {
    replies: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Notify>>,
}

impl Scripted {
    fn new(replies: Vec<Result<Completion>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn gated(replies: Vec<Result<Completion>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionEndpoint for Scripted {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("")))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Editor draft that records every mutator call
#[derive(Default)]
struct Draft {
    values: FieldValues,
    calls: Vec<(String, String)>,
    read_only_body: bool,
}

impl Draft {
    fn new(title: &str, body: &str, tags: &[&str]) -> Self {
        Self {
            values: FieldValues {
                title: title.to_string(),
                body: body.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..FieldValues::default()
            },
            ..Self::default()
        }
    }

    fn snapshot(&self) -> FieldValues {
        self.values.clone()
    }

    fn context(&self) -> String {
        format!("Title: {}\nBody: {}", self.values.title, self.values.body)
    }
}

impl FieldMutators for Draft {
    fn apply_title(&mut self, title: &str) {
        self.calls.push(("title".into(), title.into()));
        self.values.title = title.to_string();
    }

    fn apply_abstract(&mut self, abstract_text: &str) {
        self.calls.push(("abstract".into(), abstract_text.into()));
        self.values.abstract_text = abstract_text.to_string();
    }

    fn replace_body(&mut self, body: &str) {
        self.calls.push(("replace_body".into(), body.into()));
        self.values.body = body.to_string();
    }

    fn append_body(&mut self, body: &str) {
        self.calls.push(("append_body".into(), body.into()));
        self.values.body = format!("{}\n\n{}", self.values.body, body);
    }

    fn apply_tags(&mut self, tags: &[String]) {
        self.calls.push(("tags".into(), tags.join(",")));
        self.values.tags = tags.to_vec();
    }

    fn supports(&self, field: Field, _kind: ChangeKind) -> bool {
        !(self.read_only_body && field == Field::Body)
    }
}

fn session_with(replies: Vec<Result<Completion>>) -> (Session, Arc<Scripted>) {
    let endpoint = Arc::new(Scripted::new(replies));
    (Session::new(endpoint.clone()), endpoint)
}

#[tokio::test]
async fn test_sections_become_applied_changes() {
    let (mut session, _) = session_with(vec![Ok(Completion::text(
        "Here you go.\n#TITLE\nFinal Post\n#TAGS\nreact, hooks",
    ))]);
    let mut draft = Draft::new("Draft", "Intro.", &["draft"]);

    let values = draft.snapshot();
    let context = draft.context();
    let message = session
        .send("tidy this up", || context, &values, &mut draft)
        .await
        .unwrap()
        .clone();

    assert_eq!(message.role, ChatRole::Assistant);
    assert_eq!(message.changes.len(), 2);
    assert_eq!(message.changes[0].field, Field::Title);
    assert_eq!(message.changes[0].kind, ChangeKind::Replace);
    assert_eq!(message.changes[0].value, FieldValue::Text("Final Post".to_string()));
    assert_eq!(message.changes[1].field, Field::Tags);
    assert_eq!(
        message.changes[1].value,
        FieldValue::Tags(vec!["draft".into(), "react".into(), "hooks".into()])
    );

    assert_eq!(
        draft.calls,
        vec![
            ("title".to_string(), "Final Post".to_string()),
            ("tags".to_string(), "draft,react,hooks".to_string()),
        ]
    );
    assert!(message.changes.iter().all(|c| session.is_applied(&c.id)));
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn test_request_carries_editor_feature_and_context() {
    let (mut session, endpoint) = session_with(vec![Ok(Completion::text("ok"))]);
    let mut draft = Draft::new("Draft", "Intro.", &[]);

    let values = draft.snapshot();
    session
        .send("/title", || "Title: Draft".to_string(), &values, &mut draft)
        .await;

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].feature, "editor");
    assert!(requests[0].prompt.contains("title"));
    assert!(requests[0].context.contains("Title: Draft"));
}

#[tokio::test]
async fn test_blank_input_is_rejected() {
    let (mut session, endpoint) = session_with(Vec::new());
    let mut called = false;

    assert!(!session.submit("   \n", || {
        called = true;
        String::new()
    }));
    assert!(!called);
    assert!(session.messages().is_empty());
    assert!(!session.is_busy());
    assert!(endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_submit_while_busy_is_ignored() {
    let gate = Arc::new(Notify::new());
    let endpoint = Arc::new(Scripted::gated(
        vec![Ok(Completion::text("#TITLE\nBetter"))],
        gate.clone(),
    ));
    let mut session = Session::new(endpoint.clone());
    let mut draft = Draft::new("Draft", "", &[]);

    assert!(session.submit("first", String::new));
    assert!(session.is_busy());
    assert!(!session.submit("second", String::new));
    assert_eq!(session.messages().len(), 1);

    gate.notify_one();
    let values = draft.snapshot();
    assert!(session.finish(&values, &mut draft).await.is_some());
    assert!(!session.is_busy());
    assert_eq!(endpoint.requests().len(), 1);
    assert_eq!(draft.values.title, "Better");
}

#[tokio::test]
async fn test_failure_sets_error_and_retry_clears_it() {
    let (mut session, _) = session_with(vec![
        Err(AssistError::api("assist", 429, "daily limit reached")),
        Ok(Completion::text("Sure.")),
    ]);
    let mut draft = Draft::new("Draft", "", &[]);
    let values = draft.snapshot();

    assert!(session
        .send("help", String::new, &values, &mut draft)
        .await
        .is_none());
    assert!(session.error().unwrap().contains("daily limit reached"));
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, ChatRole::User);
    assert!(!session.is_busy());

    assert!(session.submit("help again", String::new));
    assert!(session.error().is_none());
    session.finish(&values, &mut draft).await;
    assert_eq!(session.messages().len(), 3);
    assert!(draft.calls.is_empty());
}

#[tokio::test]
async fn test_quota_confirmations_and_display_text() {
    let reply = concat!(
        "I can add a conclusion.\n",
        "```json\n",
        "{\"actions\":[{\"type\":\"CONFIRM\",\"question\":\"Keep the intro?\"},",
        "{\"type\":\"APPEND_BODY\",\"body_md\":\"## Conclusion\"}],\"confidence\":0.8}\n",
        "```"
    );
    let (mut session, _) = session_with(vec![Ok(Completion {
        text: reply.to_string(),
        quota: Some(Quota { used: 3.0, limit: 20.0 }),
    })]);
    let mut draft = Draft::new("Draft", "Intro.", &[]);
    let values = draft.snapshot();

    let message = session
        .send("finish it", String::new, &values, &mut draft)
        .await
        .unwrap()
        .clone();

    assert_eq!(message.text, "I can add a conclusion.");
    assert_eq!(message.confirmations, vec!["Keep the intro?".to_string()]);
    assert_eq!(message.confidence, Some(0.8));
    assert_eq!(message.changes.len(), 1);
    assert_eq!(message.changes[0].kind, ChangeKind::Append);
    assert_eq!(session.quota(), Some(Quota { used: 3.0, limit: 20.0 }));
    assert_eq!(draft.values.body, "Intro.\n\n## Conclusion");
}

#[tokio::test]
async fn test_undo_and_reapply_through_session() {
    let (mut session, _) = session_with(vec![Ok(Completion::text(
        "#TITLE\nSharper Title\n#ABSTRACT\nA short summary.",
    ))]);
    let mut draft = Draft::new("Draft", "", &[]);
    let values = draft.snapshot();

    let ids: Vec<String> = session
        .send("improve", String::new, &values, &mut draft)
        .await
        .unwrap()
        .changes
        .iter()
        .map(|c| c.id.clone())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(draft.values.title, "Sharper Title");
    assert_eq!(session.change(&ids[1]).map(|c| c.field), Some(Field::Abstract));
    assert!(session.change("abstract:replace-missing").is_none());

    assert_eq!(session.undo(&ids[0], &mut draft), UndoOutcome::Restored);
    assert_eq!(draft.values.title, "Draft");
    assert_eq!(draft.values.abstract_text, "A short summary.");
    assert_eq!(session.undo(&ids[0], &mut draft), UndoOutcome::NotApplied);

    let values = draft.snapshot();
    assert_eq!(
        session.apply(&ids[0], &values, &mut draft),
        Some(ApplyOutcome::Applied)
    );
    assert_eq!(draft.values.title, "Sharper Title");
    assert_eq!(
        session.apply(&ids[0], &values, &mut draft),
        Some(ApplyOutcome::AlreadyApplied)
    );
    assert_eq!(session.apply("title:replace-missing", &values, &mut draft), None);
}

#[tokio::test]
async fn test_last_directive_block_wins() {
    let reply = concat!(
        "```json\n{\"actions\":[{\"type\":\"APPLY_TITLE\",\"title\":\"First\"}]}\n```\n",
        "Actually:\n",
        "```json\n{\"actions\":[{\"type\":\"APPLY_TITLE\",\"title\":\"Second\"}]}\n```"
    );
    let (mut session, _) = session_with(vec![Ok(Completion::text(reply))]);
    let mut draft = Draft::new("Draft", "", &[]);
    let values = draft.snapshot();

    session.send("title?", String::new, &values, &mut draft).await;

    assert_eq!(draft.values.title, "Second");
    assert_eq!(draft.calls.len(), 1);
}

#[tokio::test]
async fn test_unsupported_field_is_left_pending() {
    let (mut session, _) = session_with(vec![Ok(Completion::text(
        "#TITLE\nNew\n#BODY_MD\nRewritten body",
    ))]);
    let mut draft = Draft {
        read_only_body: true,
        ..Draft::new("Old", "Body", &[])
    };
    let values = draft.snapshot();

    let message = session
        .send("rewrite", String::new, &values, &mut draft)
        .await
        .unwrap()
        .clone();

    assert_eq!(message.changes.len(), 2);
    assert!(session.is_applied(&message.changes[0].id));
    assert!(!session.is_applied(&message.changes[1].id));
    assert_eq!(draft.values.body, "Body");
}

#[tokio::test]
async fn test_poll_never_waits() {
    let gate = Arc::new(Notify::new());
    let endpoint = Arc::new(Scripted::gated(
        vec![Ok(Completion::text("#TITLE\nPolled"))],
        gate.clone(),
    ));
    let mut session = Session::new(endpoint);
    let mut draft = Draft::new("Draft", "", &[]);
    let values = draft.snapshot();

    assert!(session.poll(&values, &mut draft).is_none());
    assert!(session.submit("go", String::new));
    tokio::task::yield_now().await;
    assert!(session.poll(&values, &mut draft).is_none());
    assert!(session.is_busy());

    gate.notify_one();
    let mut done = false;
    for _ in 0..100 {
        if session.poll(&values, &mut draft).is_some() {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(done);
    assert!(!session.is_busy());
    assert_eq!(draft.values.title, "Polled");
}
