use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use redactor_core::{
    ApplyOutcome, Change, ChatMessage, Config, PostType, Provider, Session, UndoOutcome,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

mod draft;

use draft::Draft;

#[derive(Parser)]
#[command(name = "redactor")]
#[command(about = "AI writing assistant for post drafts")]
struct Cli {
    /// Completion provider (assist, ollama, claude, openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use with the provider
    #[arg(long, global = true)]
    model: Option<String>,

    /// Kind of post being edited (article, question)
    #[arg(long, global = true)]
    post_type: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and apply the reply to a draft
    Ask {
        /// Draft JSON file
        draft: PathBuf,
        /// Your message, or a slash command such as /title
        message: String,
    },
    /// Interactive editing session on a draft
    Chat {
        /// Draft JSON file
        draft: PathBuf,
    },
    /// List available models for the provider
    Models {
        /// Save this model as the default instead of listing
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so replies on stdout stay clean
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let provider = match cli.provider.as_deref() {
        Some(name) => Provider::from_str(name)
            .with_context(|| format!("Unknown provider '{}'", name))?,
        None => Provider::from_config(&config)?,
    };

    let post_type = match cli.post_type.as_deref().or(config.post_type.as_deref()) {
        Some(name) => PostType::from_str(name)
            .with_context(|| format!("Unknown post type '{}'", name))?,
        None => PostType::default(),
    };

    match cli.command {
        Commands::Ask { draft, message } => {
            let session = connect(&config, provider, cli.model.as_deref(), post_type)?;
            ask(session, &draft, &message, post_type).await?
        }
        Commands::Chat { draft } => {
            let session = connect(&config, provider, cli.model.as_deref(), post_type)?;
            chat(session, &draft, post_type).await?
        }
        Commands::Models { set: Some(model) } => {
            Config::save_default_model(&model)?;
            println!("Default model set to {}", model);
        }
        Commands::Models { set: None } => list_models(&config, provider).await?,
    }

    Ok(())
}

fn connect(
    config: &Config,
    provider: Provider,
    model: Option<&str>,
    post_type: PostType,
) -> Result<Session> {
    let endpoint = provider.connect(config, model)?;
    tracing::info!(provider = provider.as_str(), "using {}", provider.display_name());
    Ok(Session::new(endpoint).with_post_type(post_type))
}

/// Run one turn: submit, wait, apply and save the draft.
async fn turn(
    session: &mut Session,
    draft: &mut Draft,
    input: &str,
    post_type: PostType,
) -> Result<Option<ChatMessage>> {
    if !session.submit(input, || draft.context(post_type)) {
        return Ok(None);
    }

    let values = draft.values().clone();
    let reply = session.finish(&values, draft).await.cloned();
    if reply.is_some() {
        draft.save()?;
    }
    Ok(reply)
}

async fn ask(mut session: Session, path: &Path, message: &str, post_type: PostType) -> Result<()> {
    let mut draft = Draft::load(path)?;

    match turn(&mut session, &mut draft, message, post_type).await? {
        Some(reply) => {
            print_reply(&session, &reply);
            Ok(())
        }
        None => match session.error() {
            Some(err) => bail!("AI request failed: {}", err),
            None => bail!("Nothing to send"),
        },
    }
}

async fn chat(mut session: Session, path: &Path, post_type: PostType) -> Result<()> {
    let mut draft = Draft::load(path)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Editing {}. Commands: :changes, :apply N, :undo N, :quit", path.display());

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            let mut parts = command.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("quit" | "q"), _) => break,
                (Some("changes"), _) => print_changes(&session),
                (Some("apply"), Some(n)) => {
                    let Some(id) = change_id(&session, n) else {
                        println!("No change {}", n);
                        continue;
                    };
                    let values = draft.values().clone();
                    match session.apply(&id, &values, &mut draft) {
                        Some(ApplyOutcome::Applied) => {
                            draft.save()?;
                            println!("Applied change {}: {}", n, change_label(&session, &id));
                        }
                        Some(ApplyOutcome::AlreadyApplied) => println!("Change {} is already applied", n),
                        Some(ApplyOutcome::Unsupported) | None => println!("Change {} cannot be applied", n),
                    }
                }
                (Some("undo"), Some(n)) => {
                    let Some(id) = change_id(&session, n) else {
                        println!("No change {}", n);
                        continue;
                    };
                    match session.undo(&id, &mut draft) {
                        UndoOutcome::Restored => {
                            draft.save()?;
                            println!("Reverted change {}: {}", n, change_label(&session, &id));
                        }
                        UndoOutcome::NotApplied => println!("Change {} is not applied", n),
                    }
                }
                _ => println!("Unknown command :{}", command),
            }
            continue;
        }

        match turn(&mut session, &mut draft, line, post_type).await? {
            Some(reply) => print_reply(&session, &reply),
            None => {
                if let Some(err) = session.error() {
                    eprintln!("Error: {}", err);
                }
            }
        }
    }

    Ok(())
}

async fn list_models(config: &Config, provider: Provider) -> Result<()> {
    let models = provider.list_models(config).await?;
    if models.is_empty() {
        println!("{} does not offer a model choice", provider.display_name());
        return Ok(());
    }

    println!("Available {} models:", provider.display_name());
    for model in models {
        println!("  {}", model);
    }
    Ok(())
}

/// Every change proposed so far, numbered from 1 in conversation order
fn all_changes(session: &Session) -> Vec<&Change> {
    session
        .messages()
        .iter()
        .flat_map(|m| m.changes.iter())
        .collect()
}

fn change_id(session: &Session, n: &str) -> Option<String> {
    let index = n.parse::<usize>().ok()?.checked_sub(1)?;
    all_changes(session).get(index).map(|c| c.id.clone())
}

fn change_label(session: &Session, id: &str) -> String {
    session
        .change(id)
        .map(|c| format!("{} ({})", c.label, c.kind.display_name()))
        .unwrap_or_default()
}

fn print_changes(session: &Session) {
    let changes = all_changes(session);
    if changes.is_empty() {
        println!("No changes proposed yet");
        return;
    }
    for (i, change) in changes.iter().enumerate() {
        print_change(session, i + 1, change);
    }
}

fn print_change(session: &Session, n: usize, change: &Change) {
    let mark = if session.is_applied(&change.id) { "x" } else { " " };
    println!(
        "  [{}] {}. {} ({}): {}",
        mark,
        n,
        change.label,
        change.kind.display_name(),
        change.preview
    );
}

fn print_reply(session: &Session, reply: &ChatMessage) {
    if !reply.text.is_empty() {
        println!("{}", reply.text);
    }
    for question in &reply.confirmations {
        println!("? {}", question);
    }

    let offset = all_changes(session).len() - reply.changes.len();
    for (i, change) in reply.changes.iter().enumerate() {
        print_change(session, offset + i + 1, change);
    }

    if let Some(quota) = session.quota() {
        println!("({}/{} requests used)", quota.used, quota.limit);
    }
}
