use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Password};
use tracing_subscriber::EnvFilter;

use pagechat_core::controller::{EntryBody, QUICK_ACTIONS, TOKEN_SAVED_NOTICE};
use pagechat_core::{
    links, ActivePageExtractor, ChatController, ChatRole, Config, DisplayEntry, ExtractOutcome,
    FileStorage, InferenceClient, PageSource, SessionStore, SubmitOutcome,
};

#[derive(Parser)]
#[command(name = "pagechat")]
#[command(about = "Chat with hosted language models, optionally about a web page")]
#[command(version)]
struct Cli {
    /// Alternate config file
    #[arg(long, global = true, env = "PAGECHAT_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question, using the most recent page context if any
    Ask {
        /// Your question
        #[arg(required_unless_present = "preset", conflicts_with = "preset")]
        question: Option<String>,
        /// Ask a canned question instead: summarize, key-points or explain
        #[arg(long)]
        preset: Option<String>,
        /// Extract this page (URL or HTML file) first and use it as context
        #[arg(short, long)]
        page: Option<String>,
    },
    /// Extract a page (URL or HTML file) into the chat as context
    Extract {
        /// Page to extract
        page: String,
    },
    /// Show the stored chat history
    History {
        /// Show page context in full instead of its first line
        #[arg(short, long)]
        full: bool,
    },
    /// Clear the stored chat history
    Clear,
    /// Save the API token (prompts when omitted)
    Token {
        /// Token value
        token: Option<String>,
    },
    /// Open the page where API tokens are managed
    TokenPage,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read config, using defaults");
            Config::new()
        }),
    };

    run(&config, cli.command).await
}

async fn run(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::TokenPage => {
            links::open_token_settings()?;
            println!("Opened {}", pagechat_core::config::TOKEN_SETTINGS_URL.cyan());
        }
        Commands::Ask { question, preset, page } => {
            let question = resolve_question(question, preset.as_deref())?;
            let (mut chat, extractor) = open_session(config)?;
            if let Some(page) = page {
                extract_page(&mut chat, &extractor, &page).await?;
            }
            ask(&mut chat, &question).await?
        }
        Commands::Extract { page } => {
            let (mut chat, extractor) = open_session(config)?;
            extract_page(&mut chat, &extractor, &page).await?
        }
        Commands::History { full } => {
            let (chat, _) = open_session(config)?;
            show_history(&chat, full)
        }
        Commands::Clear => {
            let (mut chat, _) = open_session(config)?;
            chat.clear()?;
            println!("{}", "Chat history cleared.".green());
        }
        Commands::Token { token } => {
            let (mut chat, _) = open_session(config)?;
            save_token(&mut chat, token)?
        }
    }

    Ok(())
}

/// The typed question, or the question behind a named preset.
fn resolve_question(question: Option<String>, preset: Option<&str>) -> Result<String> {
    match (question, preset) {
        (Some(question), _) => Ok(question),
        (None, Some(name)) => ChatController::quick_action(name)
            .map(|action| action.question.to_string())
            .ok_or_else(|| {
                let known: Vec<_> = QUICK_ACTIONS.iter().map(|action| action.name).collect();
                anyhow!("unknown preset '{}' (expected one of: {})", name, known.join(", "))
            }),
        (None, None) => Err(anyhow!("a question or --preset is required")),
    }
}

fn open_session(config: &Config) -> Result<(ChatController, Arc<ActivePageExtractor>)> {
    let extractor = Arc::new(ActivePageExtractor::new());
    let chat = open_controller(config, extractor.clone())?;
    Ok((chat, extractor))
}

fn open_controller(config: &Config, extractor: Arc<ActivePageExtractor>) -> Result<ChatController> {
    let storage = FileStorage::new(config.storage_path()?);
    let store = SessionStore::open(Arc::new(storage))?;
    let client = InferenceClient::from_config(config);
    Ok(ChatController::new(store, Arc::new(client), extractor)
        .with_credential_override(Config::env_credential()))
}

async fn extract_page(chat: &mut ChatController, extractor: &ActivePageExtractor, page: &str) -> Result<()> {
    let source = PageSource::parse(page)?;
    println!("📄 Extracting {}", source.display_url().cyan());
    extractor.open(source);

    match chat.extract_content().await {
        ExtractOutcome::Extracted(turn) => {
            let preview = turn.content.lines().next().unwrap_or_default();
            println!("{} {}", "Added context:".bold().green(), preview);
            Ok(())
        }
        ExtractOutcome::Failed(message) => Err(anyhow!(message)),
        ExtractOutcome::Busy => Err(anyhow!("an extraction is already running")),
    }
}

async fn ask(chat: &mut ChatController, question: &str) -> Result<()> {
    if !chat.has_credential() {
        println!(
            "{} run {} or set {}",
            "No API token configured:".yellow(),
            "pagechat token".bold(),
            pagechat_core::config::TOKEN_ENV_VAR.bold()
        );
    }
    if let Some(context) = chat.transcript().latest_context() {
        let first_line = context.lines().next().unwrap_or_default();
        println!("{} {}", "Using".dimmed(), first_line.dimmed());
    }

    println!("🤖 {}\n", "Thinking...".magenta());
    match chat.submit(question).await {
        SubmitOutcome::Answered(response) => {
            println!("{}", "AI:".bold().yellow());
            println!("{}", response);
            Ok(())
        }
        SubmitOutcome::Failed(e) => Err(anyhow!("Error: {}", e)),
        SubmitOutcome::Ignored => Err(anyhow!("question is empty")),
        SubmitOutcome::Discarded => Ok(()),
    }
}

fn show_history(chat: &ChatController, full: bool) {
    let entries = chat.display().entries();
    if entries.is_empty() {
        println!("{}", "No chat history.".dimmed());
        return;
    }
    for entry in entries {
        print_entry(entry, full);
    }
}

fn print_entry(entry: &DisplayEntry, full: bool) {
    let label = format!("{}:", entry.role.label());
    let label = match entry.role {
        ChatRole::User => label.bold().cyan(),
        ChatRole::Assistant => label.bold().yellow(),
        ChatRole::System => label.bold().blue(),
        ChatRole::Error => label.bold().red(),
    };
    let body = match &entry.body {
        EntryBody::PageContext { preview, .. } if !full => format!("{} {}", preview, "(--full to expand)".dimmed()),
        _ => entry.text(),
    };
    println!("{} {}\n", label, body);
}

fn save_token(chat: &mut ChatController, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Hugging Face API token")
            .interact()?,
    };
    if chat.save_credential(&token)? {
        println!("{}", TOKEN_SAVED_NOTICE.green());
    } else {
        println!("{}", "Empty token, nothing saved.".yellow());
    }
    Ok(())
}
