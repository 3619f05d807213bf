//! One editor conversation: message history, the in-flight request, and the
//! apply/undo engine for every change the assistant proposed.
//!
//! A submission appends the user message right away and spawns the endpoint
//! call; the stored join handle doubles as the busy flag, so a second
//! submission while a request is in flight is ignored. When the reply lands
//! it is parsed, turned into changes, recorded as an assistant message, and
//! every change is applied immediately. The host can undo (and re-apply)
//! individual changes afterwards.

use crate::ai::{Completion, CompletionEndpoint};
use crate::changes::build_changes;
use crate::directive::parse_reply;
use crate::engine::{ApplyEngine, ApplyOutcome, FieldMutators, UndoOutcome};
use crate::error::{AssistError, Result};
use crate::prompt::{build_request, PostType};
use crate::state::{new_message_id, Change, ChatMessage, ChatRole, FieldValues, Quota};
use futures_util::FutureExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Session {
    endpoint: Arc<dyn CompletionEndpoint>,
    post_type: PostType,
    messages: Vec<ChatMessage>,
    engine: ApplyEngine,
    pending: Option<JoinHandle<Result<Completion>>>,
    error: Option<String>,
    quota: Option<Quota>,
}

impl Session {
    pub fn new(endpoint: Arc<dyn CompletionEndpoint>) -> Self {
        Self {
            endpoint,
            post_type: PostType::default(),
            messages: Vec::new(),
            engine: ApplyEngine::new(),
            pending: None,
            error: None,
            quota: None,
        }
    }

    pub fn with_post_type(mut self, post_type: PostType) -> Self {
        self.post_type = post_type;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Error from the most recent failed request, cleared on the next submit
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn quota(&self) -> Option<Quota> {
        self.quota
    }

    pub fn is_applied(&self, change_id: &str) -> bool {
        self.engine.is_applied(change_id)
    }

    /// Find a change proposed in any assistant turn
    pub fn change(&self, change_id: &str) -> Option<&Change> {
        self.messages.iter().find_map(|m| m.change(change_id))
    }

    /// Start a request for `input`.
    ///
    /// Returns `false` without doing anything when the input is blank or a
    /// request is already in flight. `context` is only called for accepted
    /// submissions. Must be called from within a tokio runtime.
    pub fn submit<F>(&mut self, input: &str, context: F) -> bool
    where
        F: FnOnce() -> String,
    {
        let raw = input.trim();
        if raw.is_empty() || self.is_busy() {
            return false;
        }

        self.error = None;
        self.messages.push(ChatMessage::user(raw));

        let request = build_request(raw, &context(), self.post_type);
        let endpoint = Arc::clone(&self.endpoint);
        info!(endpoint = endpoint.name(), "sending editor request");
        self.pending = Some(tokio::spawn(async move {
            endpoint.complete(&request).await
        }));
        true
    }

    /// Wait for the in-flight request and process its reply.
    ///
    /// Returns the new assistant message, or `None` when nothing was in
    /// flight or the request failed (see [`Session::error`]).
    pub async fn finish<M>(&mut self, values: &FieldValues, host: &mut M) -> Option<&ChatMessage>
    where
        M: FieldMutators + ?Sized,
    {
        let handle = self.pending.take()?;
        let result = handle
            .await
            .unwrap_or_else(|e| Err(AssistError::Task(e.to_string())));
        self.complete(result, values, host)
    }

    /// Process the reply if the in-flight request has already finished.
    /// Never waits.
    pub fn poll<M>(&mut self, values: &FieldValues, host: &mut M) -> Option<&ChatMessage>
    where
        M: FieldMutators + ?Sized,
    {
        if !self.pending.as_ref().is_some_and(|h| h.is_finished()) {
            return None;
        }
        let handle = self.pending.take()?;
        let result = match handle.now_or_never() {
            Some(joined) => joined.unwrap_or_else(|e| Err(AssistError::Task(e.to_string()))),
            None => Err(AssistError::Task("finished task had no output".to_string())),
        };
        self.complete(result, values, host)
    }

    /// [`Session::submit`] followed by [`Session::finish`]
    pub async fn send<F, M>(
        &mut self,
        input: &str,
        context: F,
        values: &FieldValues,
        host: &mut M,
    ) -> Option<&ChatMessage>
    where
        F: FnOnce() -> String,
        M: FieldMutators + ?Sized,
    {
        if !self.submit(input, context) {
            return None;
        }
        self.finish(values, host).await
    }

    fn complete<M>(
        &mut self,
        result: Result<Completion>,
        values: &FieldValues,
        host: &mut M,
    ) -> Option<&ChatMessage>
    where
        M: FieldMutators + ?Sized,
    {
        let completion = match result {
            Ok(completion) => completion,
            Err(e) => {
                warn!(error = %e, "editor request failed");
                self.error = Some(e.to_string());
                return None;
            }
        };

        let parsed = parse_reply(&completion.text);
        let changes = build_changes(&parsed.directives.actions, &parsed.sections, values);
        debug!(
            actions = parsed.directives.actions.len(),
            changes = changes.len(),
            "parsed assistant reply"
        );

        let message = ChatMessage {
            id: new_message_id(),
            role: ChatRole::Assistant,
            text: parsed.display_text,
            confirmations: parsed.directives.confirmations(),
            confidence: parsed.directives.confidence,
            sections: Some(parsed.sections),
            changes,
        };

        let applied = message
            .changes
            .iter()
            .filter(|c| self.engine.apply(c, values, &mut *host) == ApplyOutcome::Applied)
            .count();
        info!(
            proposed = message.changes.len(),
            applied, "assistant turn complete"
        );

        if let Some(quota) = completion.quota {
            self.quota = Some(quota);
        }
        self.messages.push(message);
        self.messages.last()
    }

    /// Apply a previously proposed change. `None` if no turn proposed it.
    pub fn apply<M>(&mut self, change_id: &str, values: &FieldValues, host: &mut M) -> Option<ApplyOutcome>
    where
        M: FieldMutators + ?Sized,
    {
        let change = self.change(change_id)?.clone();
        Some(self.engine.apply(&change, values, host))
    }

    pub fn undo<M>(&mut self, change_id: &str, host: &mut M) -> UndoOutcome
    where
        M: FieldMutators + ?Sized,
    {
        self.engine.undo(change_id, host)
    }
}
