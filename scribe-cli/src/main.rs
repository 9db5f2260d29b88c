// Scribe CLI - text assistant on the command line
// Processes text, hands off context-menu actions to the next `open`, and manages history and settings

mod clipboard;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use clap::{Args, Parser, Subcommand};
use color_eyre::{
    eyre::{bail, eyre, Context},
    Result,
};
use scribe_core::backend::{OpenAiBackend, OpenAiConfig};
use scribe_core::export::{clear_all_data, read_backup, restore_backup};
use scribe_core::menu::build_menu;
use scribe_core::messenger::{spawn_background, validate_data_url};
use scribe_core::selection::spawn_page;
use scribe_core::{
    ActionId, ActionRegistry, ActionRequest, ActionRouter, Clipboard, ExportWriter, HistoryFilter,
    Language, Preferences, ProcessingBackend, Request, SelectionBuffer, SortOrder, SqliteStore,
    Store, Surface, SurfaceSignal, TimeWindow, Tone,
};
use tracing_subscriber::EnvFilter;

use crate::clipboard::SystemClipboard;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let app = App::open(&cli.global)?;

    match &cli.command {
        Command::Process(args) => handle_process(&app, args).await?,
        Command::Click(args) => handle_click(&app, args).await?,
        Command::Capture(args) => handle_capture(&app, args).await?,
        Command::Open(args) => handle_open(&app, args).await?,
        Command::Menu => handle_menu(&app),
        Command::Actions => handle_actions(&app),
        Command::History(cmd) => handle_history(&app, cmd)?,
        Command::Settings(cmd) => handle_settings(&app, cmd)?,
        Command::Backup(args) => handle_backup(&app, args)?,
        Command::Restore(args) => handle_restore(&app, args)?,
        Command::ClearData(args) => {
            if confirm(
                "This will permanently delete your history and usage data. Continue?",
                args.yes,
            )? {
                clear_all_data(app.store.as_ref())?;
                println!("✓ All data cleared");
            }
        }
    }
    Ok(())
}

/// Log level comes from SCRIBE_LOG (e.g. `SCRIBE_LOG=debug`); warnings only by default
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SCRIBE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    author,
    version,
    about = "Scribe: summarize, rewrite, translate and proofread text",
    long_about = "Transform selected text with an AI backend (or a built-in placeholder when none is configured).\nResults are kept in a local history that can be browsed, exported and backed up."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Database file (default: ~/.scribe/scribe.db)
    #[arg(long, global = true, env = "SCRIBE_DB")]
    db: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "SCRIBE_AI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// API key; without one the placeholder backend is used
    #[arg(long, global = true, env = "SCRIBE_AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, global = true, env = "SCRIBE_AI_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Extra action definitions (JSON array) merged into the built-in set
    #[arg(long, global = true, env = "SCRIBE_ACTIONS")]
    actions: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an action on text given as arguments or piped on stdin
    Process(ProcessArgs),
    /// Simulate a context-menu click; the next `open` picks it up
    Click(ClickArgs),
    /// Hand an image file to the next `open` as a screenshot
    Capture(CaptureArgs),
    /// Open the assistant surface, consuming any pending handoff
    Open(OpenArgs),
    /// Show the context-menu entries
    Menu,
    /// List available actions
    Actions,
    /// Browse and manage history
    #[command(subcommand)]
    History(HistoryCommand),
    /// Show or change preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Write a JSON backup of settings, history and usage
    Backup(DirArgs),
    /// Load a JSON backup written by `backup`
    Restore(RestoreArgs),
    /// Delete history, usage counters and pending handoffs
    ClearData(ConfirmArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Action id (summarize, rewrite, translate, proofread, expand, simplify, ...)
    action: String,
    /// Text to process (read from stdin when omitted)
    text: Vec<String>,
    /// Writing tone (default: the defaultTone preference)
    #[arg(short, long)]
    tone: Option<String>,
    /// Target language code (default: the defaultLanguage preference)
    #[arg(short, long)]
    language: Option<String>,
}

#[derive(Args, Debug)]
struct ClickArgs {
    /// Menu item id (an action id, or the image entry)
    item: String,
    /// Selected text
    text: Vec<String>,
    /// Image source, for the image entry
    #[arg(long)]
    src_url: Option<String>,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// PNG, JPEG, GIF or WebP file
    image: PathBuf,
}

#[derive(Args, Debug)]
struct OpenArgs {
    /// Text currently selected on the page
    #[arg(short, long)]
    selection: Option<String>,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List history entries
    List(ListArgs),
    /// Show one entry in full
    Show { id: i64 },
    /// Export history as CSV
    Export(DirArgs),
    /// Delete all history
    Clear(ConfirmArgs),
    /// Summary figures
    Stats,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only this action
    #[arg(short, long)]
    action: Option<String>,
    /// all, today, week or month
    #[arg(short = 'w', long, default_value = "all")]
    window: String,
    /// newest, oldest or action
    #[arg(short, long, default_value = "newest")]
    sort: String,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print current preferences
    Show,
    /// Change one preference, e.g. `set autoCopy true`
    Set { key: String, value: String },
    /// Restore defaults
    Reset(ConfirmArgs),
}

#[derive(Args, Debug)]
struct DirArgs {
    /// Output directory (default: ~/Downloads)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RestoreArgs {
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ConfirmArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

struct App {
    store: Arc<dyn Store>,
    registry: Arc<ActionRegistry>,
    router: Arc<ActionRouter>,
}

impl App {
    fn open(args: &GlobalArgs) -> Result<Self> {
        let db_path = match &args.db {
            Some(path) => path.clone(),
            None => SqliteStore::default_path().context("Could not determine database location")?,
        };
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database: {}", db_path.display()))?,
        );

        let mut registry = ActionRegistry::builtin();
        if let Some(path) = &args.actions {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let added = registry
                .load_json(&json)
                .with_context(|| format!("Invalid action definitions in {}", path.display()))?;
            tracing::info!("loaded {} action(s) from {}", added, path.display());
        }
        let registry = Arc::new(registry);

        let backend: Option<Arc<dyn ProcessingBackend>> = match &args.api_key {
            Some(key) => {
                let config = OpenAiConfig::new(args.base_url.clone(), key.clone(), args.model.clone());
                Some(Arc::new(OpenAiBackend::new(config)?))
            }
            None => None,
        };

        let clipboard: Arc<dyn Clipboard> = Arc::new(SystemClipboard);

        let router = Arc::new(ActionRouter::new(
            Arc::clone(&registry),
            backend,
            Arc::clone(&store),
            clipboard,
        ));

        Ok(App {
            store,
            registry,
            router,
        })
    }

    fn writer(&self, output: &Option<PathBuf>) -> Result<ExportWriter> {
        match output {
            Some(dir) => Ok(ExportWriter::with_base_dir(dir.clone())),
            None => ExportWriter::new(),
        }
    }
}

/// Arguments joined with spaces, or all of stdin when it is piped
fn input_text(words: &[String]) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer.trim().to_string());
    }
    bail!("No text given. Pass it as arguments or pipe it on stdin.")
}

fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        _ => {
            eprintln!("✗ Cancelled");
            Ok(false)
        }
    }
}

fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn image_data_url(path: &Path) -> Result<String> {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => bail!("Unsupported image type: {}", path.display()),
    };
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

async fn handle_process(app: &App, args: &ProcessArgs) -> Result<()> {
    let text = input_text(&args.text)?;
    let prefs = Preferences::load(app.store.as_ref())?;

    let tone = match &args.tone {
        Some(tone) => tone.parse::<Tone>()?,
        None => prefs.default_tone,
    };
    let language = match &args.language {
        Some(code) => Language::parse(code)?,
        None => prefs.default_language.clone(),
    };

    let request = ActionRequest::new(args.action.as_str(), text)
        .with_tone(tone)
        .with_language(language);

    match app.router.run(&request, &prefs).await {
        Ok(outcome) => {
            println!("{}", outcome.formatted);
            if outcome.copied {
                eprintln!("✓ Copied to clipboard");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ {}", e.status_message());
            std::process::exit(1);
        }
    }
}

/// Deliver one request to a short-lived background context and report whether it
/// asked for the surface to open
async fn deliver(app: &App, request: Request) -> Result<bool> {
    let (messenger, mut signals, background) =
        spawn_background(Arc::clone(&app.store), Arc::clone(&app.registry));
    messenger.send(request)?;
    drop(messenger);
    background.await.context("Background context failed")?;
    Ok(matches!(signals.try_recv(), Ok(SurfaceSignal::Open)))
}

async fn handle_click(app: &App, args: &ClickArgs) -> Result<()> {
    let request = Request::ContextMenuClicked {
        menu_item_id: args.item.clone(),
        selection_text: Some(args.text.join(" ")),
        src_url: args.src_url.clone(),
    };

    if deliver(app, request).await? {
        println!("✓ Pending action stored. Run `scribe open` to process it.");
    } else {
        eprintln!("⚠ Nothing to hand off (empty selection, unknown item, or unsupported image)");
    }
    Ok(())
}

async fn handle_capture(app: &App, args: &CaptureArgs) -> Result<()> {
    let data_url = image_data_url(&args.image)?;
    validate_data_url(&data_url)?;

    if deliver(app, Request::ScreenshotCaptured { data_url }).await? {
        println!("✓ Screenshot stored. Run `scribe open` to use it.");
        Ok(())
    } else {
        Err(eyre!("Screenshot could not be stored"))
    }
}

async fn handle_open(app: &App, args: &OpenArgs) -> Result<()> {
    let (messenger, _signals, _background) =
        spawn_background(Arc::clone(&app.store), Arc::clone(&app.registry));
    if let Some(selection) = &args.selection {
        let (page, _page_task) = spawn_page(SelectionBuffer::new(selection.clone()));
        messenger.attach_page(page)?;
    }

    let mut surface = Surface::new(Arc::clone(&app.router), Arc::clone(&app.store), messenger);
    let report = surface.open().await;

    let usage = surface.usage();
    println!(
        "Scribe ({} mode) · today {} · total {}",
        surface.mode(),
        usage.today,
        usage.total
    );

    if !report.selection.is_empty() {
        println!("Selection: {}", preview(&report.selection, 70));
    }
    if report.screenshot_attached {
        println!("📷 Screenshot attached");
    }

    match (&report.pending, report.outcome) {
        (Some(pending), Some(Ok(outcome))) => {
            println!("Pending {} action processed:\n", pending.action);
            println!("{}", outcome.formatted);
        }
        (Some(pending), Some(Err(e))) => {
            eprintln!("✗ Pending {} action failed: {}", pending.action, e.status_message());
        }
        (Some(pending), None) => {
            println!(
                "Pending {} action loaded (autoProcess is off). Input: {}",
                pending.action,
                preview(surface.input(), 70)
            );
        }
        (None, _) => println!("{}", surface.status()),
    }
    Ok(())
}

fn handle_menu(app: &App) {
    for entry in build_menu(&app.registry) {
        let indent = if entry.parent_id.is_some() { "  " } else { "" };
        let contexts: Vec<&str> = entry.contexts.iter().map(|c| c.as_str()).collect();
        println!("{}{}  [{}] ({})", indent, entry.title, entry.id, contexts.join(", "));
    }
}

fn handle_actions(app: &App) {
    let capabilities = app.router.capabilities();
    for spec in app.registry.iter() {
        let availability = if capabilities.is_empty() {
            "placeholder"
        } else if capabilities.supports(spec.capability) {
            "available"
        } else {
            "unavailable"
        };
        println!(
            "{} {:<10} {:<14} {:<12} {}",
            spec.icon, spec.id, spec.label, spec.capability, availability
        );
    }
}

fn handle_history(app: &App, cmd: &HistoryCommand) -> Result<()> {
    let history = app.router.history();

    match cmd {
        HistoryCommand::List(args) => {
            let filter = HistoryFilter {
                action: args.action.as_deref().map(ActionId::from),
                window: args.window.parse::<TimeWindow>()?,
                sort: args.sort.parse::<SortOrder>()?,
            };
            let records = history.list(&filter)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No history yet.");
                return Ok(());
            }
            for record in &records {
                println!(
                    "{:>14}  {}  {:<10} {}",
                    record.id,
                    record.timestamp,
                    record.action,
                    preview(&record.input, 50)
                );
            }
        }
        HistoryCommand::Show { id } => {
            let record = history
                .get(*id)?
                .ok_or_else(|| eyre!("No history entry with id {}", id))?;
            println!("Action:   {}", record.action);
            println!("Time:     {}", record.timestamp);
            println!("Tone:     {}", record.tone);
            println!("Language: {}", record.language);
            println!("\nInput:\n{}\n\nOutput:\n{}", record.input, record.output);
        }
        HistoryCommand::Export(args) => {
            let path = app
                .writer(&args.output)?
                .write_history_csv(history, chrono::Utc::now())?;
            println!("✓ History exported to {}", path.display());
        }
        HistoryCommand::Clear(args) => {
            if confirm("Delete all history?", args.yes)? {
                history.clear()?;
                println!("✓ History cleared");
            }
        }
        HistoryCommand::Stats => {
            let stats = history.stats()?;
            println!("\n📊 Scribe history\n");
            println!("  Total entries:        {}", stats.total);
            println!("  Today:                {}", stats.today);
            println!(
                "  Most used action:     {}",
                stats
                    .frequent_action
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("  Average input length: {} chars\n", stats.average_input_length);
        }
    }
    Ok(())
}

fn handle_settings(app: &App, cmd: &SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let prefs = Preferences::load(app.store.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
        SettingsCommand::Set { key, value } => {
            let mut prefs = Preferences::load(app.store.as_ref())?;
            prefs.set_field(key, value)?;
            prefs.save(app.store.as_ref())?;
            println!("✓ {} = {}", key, value);
        }
        SettingsCommand::Reset(args) => {
            if confirm("Reset all settings to defaults?", args.yes)? {
                Preferences::reset(app.store.as_ref())?;
                println!("✓ Settings reset to defaults");
            }
        }
    }
    Ok(())
}

fn handle_backup(app: &App, args: &DirArgs) -> Result<()> {
    let path = app
        .writer(&args.output)?
        .write_backup(&app.store, chrono::Utc::now())?;
    println!("✓ Backup written to {}", path.display());
    Ok(())
}

fn handle_restore(app: &App, args: &RestoreArgs) -> Result<()> {
    let backup = read_backup(&args.file)?;
    restore_backup(app.store.as_ref(), &backup)?;
    println!(
        "✓ Restored {} history entries and {} settings from {}",
        backup.history.len(),
        backup.settings.len(),
        args.file.display()
    );
    Ok(())
}
