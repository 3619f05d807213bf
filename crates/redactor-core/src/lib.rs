pub mod ai;
pub mod changes;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod state;
pub mod tags;

// Re-export main types for convenience
pub use ai::{AssistClient, ClaudeClient, Completion, CompletionEndpoint, CompletionRequest, OllamaClient, OpenAIClient};
pub use changes::build_changes;
pub use config::Config;
pub use directive::{parse_reply, Action, Directives, ParsedReply};
pub use engine::{ApplyEngine, ApplyOutcome, FieldMutators, UndoOutcome};
pub use error::AssistError;
pub use prompt::{build_request, Command, PostType};
pub use provider::Provider;
pub use session::Session;
pub use state::{Change, ChangeKind, ChatMessage, ChatRole, Field, FieldValue, FieldValues, Quota, Sections};
pub use tags::{merge_tags, parse_tags};
