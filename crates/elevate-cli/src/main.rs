//! elevate - terminal client for the elevate AI agent

mod commands;
mod config;
mod store;
mod utils;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use elevate_agent::{
    ChatController, ChatObserver, HttpTitleGenerator, HttpTransport, SendRequest, TitleGenerator,
    clean_title, title_or_default,
};
use elevate_ai::{
    ATTACHMENT_ONLY_PROMPT, Attachment, ChatMode, CompletedMessage, MAX_ATTACHMENTS,
    providers::FlowiseProvider, validate_attachments,
};

use commands::CommandResult;
use store::{Chat, ChatStore, Role};
use utils::{StreamPrinter, load_attachment, truncate_chars};

/// elevate - chat with the elevate AI agent from a terminal
#[derive(Parser, Debug)]
#[command(name = "elevate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Send a single message and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Continue a saved chat by ID
    #[arg(long)]
    chat: Option<String>,

    /// List saved chats
    #[arg(long)]
    chats: bool,

    /// Rename a saved chat
    #[arg(long, num_args = 2, value_names = ["ID", "TITLE"])]
    rename: Option<Vec<String>>,

    /// Delete a saved chat
    #[arg(long)]
    delete: Option<String>,

    /// Delete every saved chat
    #[arg(long)]
    delete_all: bool,

    /// Attach a file to the first message (repeatable)
    #[arg(short, long = "attach")]
    attach: Vec<PathBuf>,

    /// Use the act flow instead of chat
    #[arg(long)]
    act: bool,

    /// Hide the reasoning trace
    #[arg(long)]
    no_thinking: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

struct App {
    controller: ChatController,
    titles: Option<Box<dyn TitleGenerator>>,
    store: ChatStore,
    chat: Option<Chat>,
    mode: ChatMode,
    show_thinking: bool,
    pending: Vec<Attachment>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("elevate=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let store = ChatStore::open_default();

    if args.chats {
        return list_chats(&store);
    }

    if let Some(parts) = args.rename {
        let [id, title] = parts.as_slice() else {
            bail!("--rename takes a chat ID and a title");
        };
        let title = title.trim();
        if title.is_empty() {
            bail!("title cannot be empty");
        }
        store.rename(id, title)?;
        println!("Renamed {} to \"{}\"", id, title);
        return Ok(());
    }

    let provider = cfg
        .flowise_config()
        .map(FlowiseProvider::new)
        .transpose()?
        .map(Arc::new);

    if let Some(id) = args.delete {
        forget_upstream(&store, provider.as_deref(), &id).await;
        store.delete(&id)?;
        println!("Deleted chat {}", id);
        return Ok(());
    }

    if args.delete_all {
        for chat in store.list()? {
            forget_upstream(&store, provider.as_deref(), &chat.id).await;
        }
        let count = store.delete_all()?;
        println!("Deleted {} chats", count);
        return Ok(());
    }

    let Some(provider) = provider else {
        eprintln!("No chat endpoint configured.");
        eprintln!(
            "Set chat_url in {} (elevate --init-config creates it).",
            config::Config::config_path().display()
        );
        std::process::exit(1);
    };

    let titles: Option<Box<dyn TitleGenerator>> = match &cfg.title_url {
        Some(url) => Some(Box::new(HttpTitleGenerator::new(url.clone(), cfg.credentials())?)),
        None => None,
    };

    let chat = match args.chat.as_deref() {
        Some(id) => Some(store.load(id).with_context(|| format!("failed to open chat {}", id))?),
        None => None,
    };

    let pending = args
        .attach
        .iter()
        .map(|path| load_attachment(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    validate_attachments(&pending)?;

    let mut app = App {
        controller: ChatController::new(Arc::new(HttpTransport::new(provider))),
        titles,
        store,
        chat,
        mode: if args.act { ChatMode::Act } else { cfg.mode() },
        show_thinking: cfg.show_thinking() && !args.no_thinking,
        pending,
    };

    // Ctrl-C stops a streaming reply; when idle it exits
    let handle = app.controller.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_running() {
                handle.abort();
            } else {
                std::process::exit(130);
            }
        }
    });

    if let Some(prompt) = args.command {
        run_exchange(&mut app, &prompt).await?;
        return Ok(());
    }

    run_interactive(&mut app).await
}

/// Prints a streaming reply to the terminal
struct TerminalObserver {
    printer: StreamPrinter,
    show_thinking: bool,
    thinking_shown: usize,
    thinking_closed: bool,
    failed: bool,
}

impl TerminalObserver {
    fn new(show_thinking: bool) -> Self {
        Self {
            printer: StreamPrinter::new(),
            show_thinking,
            thinking_shown: 0,
            thinking_closed: false,
            failed: false,
        }
    }

    fn close_thinking(&mut self) {
        if self.thinking_shown > 0 && !self.thinking_closed {
            eprintln!("\n");
            self.thinking_closed = true;
        }
    }
}

impl ChatObserver for TerminalObserver {
    fn on_snapshot(&mut self, markdown: &str) {
        self.close_thinking();
        if let Some(delta) = self.printer.update(markdown) {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
    }

    fn on_thinking(&mut self, trace: &str) {
        if !self.show_thinking || self.thinking_closed {
            return;
        }
        if self.thinking_shown == 0 {
            eprint!("[thinking] ");
        }
        if let Some(new) = trace.get(self.thinking_shown..) {
            eprint!("{}", new);
        }
        self.thinking_shown = trace.len();
        let _ = io::stderr().flush();
    }

    fn on_complete(&mut self, message: &CompletedMessage) {
        self.close_thinking();
        println!("{}", self.printer.finish(&message.rendered));
    }

    fn on_error(&mut self, message: &str) {
        self.close_thinking();
        self.failed = true;
        println!();
        eprintln!("Error: {}", message);
    }
}

/// Send one message, print the reply, and record the exchange
async fn run_exchange(app: &mut App, prompt: &str) -> anyhow::Result<()> {
    let attachments = std::mem::take(&mut app.pending);
    let attachment_names: Vec<String> = attachments.iter().map(|a| a.display_name.clone()).collect();

    let request = SendRequest::new(prompt)
        .with_session(app.chat.as_ref().and_then(|c| c.session_id().map(str::to_string)))
        .with_attachments(attachments)
        .with_mode(app.mode);

    let mut observer = TerminalObserver::new(app.show_thinking);
    let completed = match app.controller.send_with(request, &mut observer).await {
        Ok(completed) => completed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(());
        }
    };

    let Some(reply) = completed else {
        if !observer.failed {
            println!();
            eprintln!("[stopped]");
        }
        return Ok(());
    };

    let mut user_text = if prompt.trim().is_empty() {
        ATTACHMENT_ONLY_PROMPT.to_string()
    } else {
        prompt.trim().to_string()
    };
    let title_source = user_text.clone();
    if !attachment_names.is_empty() {
        user_text.push_str(&format!("\n\n[attached: {}]", attachment_names.join(", ")));
    }

    let chat = match &mut app.chat {
        Some(chat) => chat,
        slot => slot.insert(app.store.create()?),
    };
    let first_exchange = chat.messages().is_empty();

    chat.append_message(Role::User, &user_text, None)?;
    chat.append_message(Role::Assistant, &reply.rendered, reply.thinking.as_deref())?;
    if let Some(session_id) = &reply.session_id {
        chat.set_session_id(session_id)?;
    }

    if first_exchange {
        let title = match &app.titles {
            Some(generator) => title_or_default(generator.as_ref(), &title_source).await,
            None => clean_title(&title_source),
        };
        chat.set_title(&title)?;
        tracing::debug!(chat = chat.id(), title = %title, "titled chat");
    }

    Ok(())
}

async fn run_interactive(app: &mut App) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        match &app.chat {
            Some(chat) => eprintln!("elevate ({}) chat: {}", app.mode, chat.title()),
            None => eprintln!("elevate ({})", app.mode),
        }
        if !app.pending.is_empty() {
            eprintln!("{} file(s) attached to your next message", app.pending.len());
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let current_chat = app.chat.as_ref().map(|c| c.id());
        if let Some(result) =
            commands::execute_command(input, &app.store, current_chat, app.mode, app.show_thinking)
        {
            if !apply_command(app, result) {
                break;
            }
            println!();
            continue;
        }

        println!();
        run_exchange(app, input).await?;
        println!();
    }

    Ok(())
}

/// Apply a slash command; returns false when the loop should exit
fn apply_command(app: &mut App, result: CommandResult) -> bool {
    match result {
        CommandResult::NewChat => {
            app.chat = None;
            println!("Started a new chat.");
        }
        CommandResult::OpenChat(id) => match app.store.load(&id) {
            Ok(chat) => {
                println!("Opened \"{}\" ({} messages)", chat.title(), chat.messages().len());
                for message in chat.messages().iter().rev().take(4).rev() {
                    let role = match message.role {
                        Role::User => "you",
                        Role::Assistant => "elevate",
                    };
                    println!("  [{}] {}", role, truncate_chars(&message.content.replace('\n', " "), 70));
                }
                app.chat = Some(chat);
            }
            Err(e) => println!("Failed to open chat: {}", e),
        },
        CommandResult::Rename(title) => match app.chat.as_mut() {
            Some(chat) => match chat.set_title(&title) {
                Ok(()) => println!("Renamed chat to \"{}\"", title),
                Err(e) => println!("Failed to rename chat: {}", e),
            },
            None => println!("Nothing to rename yet; send a message first."),
        },
        CommandResult::ChangeMode(mode) => {
            app.mode = mode;
            println!("Mode set to: {}", mode);
        }
        CommandResult::SetThinking(show) => {
            app.show_thinking = show;
            println!("Reasoning trace {}", if show { "shown" } else { "hidden" });
        }
        CommandResult::Attach(path) => {
            if app.pending.len() >= MAX_ATTACHMENTS {
                println!("A maximum of {} files can be attached.", MAX_ATTACHMENTS);
            } else {
                match load_attachment(&path) {
                    Ok(attachment) => {
                        println!(
                            "Attached {} ({} pending)",
                            attachment.display_name,
                            app.pending.len() + 1
                        );
                        app.pending.push(attachment);
                    }
                    Err(e) => println!("Cannot attach {}: {}", path.display(), e),
                }
            }
        }
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::Exit => return false,
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
    }
    true
}

/// Clear the upstream conversation memory for a stored chat, if any
async fn forget_upstream(store: &ChatStore, provider: Option<&FlowiseProvider>, id: &str) {
    let Some(provider) = provider else {
        return;
    };
    let session_id = match store.load(id) {
        Ok(chat) => chat.session_id().map(str::to_string),
        Err(_) => None,
    };
    if let Some(session_id) = session_id {
        if let Err(e) = provider.delete_session(&session_id).await {
            tracing::warn!("Failed to clear upstream session {}: {}", session_id, e);
        }
    }
}

fn list_chats(store: &ChatStore) -> anyhow::Result<()> {
    let chats = store.list()?;
    println!("{}", commands::format_chats(&chats, None));
    if chats.is_empty() {
        println!("Chats are stored in: {}", ChatStore::default_dir().display());
    } else {
        println!("Resume from the command line with: elevate --chat <id>");
    }
    Ok(())
}
