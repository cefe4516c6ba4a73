use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indexnow_core::config::{config_template, patch_index_now_key};
use indexnow_core::hooks::{HookEvent, PageDeleteEvent, PageMoveEvent, PageSaveEvent};
use indexnow_core::notifier::NotifyOutcome;
use indexnow_core::runtime::{Runtime, normalize_path};
use indexnow_core::title::{PageIdentity, PageRef, WikiPage};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "indexnow-notifier",
    version,
    about = "Ping IndexNow when wiki pages are saved, moved, or deleted"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Submit one absolute URL")]
    Submit(SubmitArgs),
    #[command(about = "Page created or edited")]
    Save(SaveArgs),
    #[command(about = "Page moved; only the new title is submitted")]
    Move(MoveArgs),
    #[command(about = "Page deleted")]
    Delete(DeleteArgs),
    #[command(about = "Dispatch one JSON hook event (stdin by default)")]
    Event(EventArgs),
    #[command(about = "Show resolved configuration")]
    Status,
    #[command(about = "Write .indexnow/config.toml")]
    Init(InitArgs),
}

#[derive(Debug, Args)]
struct SubmitArgs {
    url: String,
}

#[derive(Debug, Args)]
struct SaveArgs {
    title: String,
    #[arg(long)]
    user: Option<String>,
}

#[derive(Debug, Args)]
struct MoveArgs {
    old_title: String,
    new_title: String,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    #[arg(required_unless_present = "page_id", conflicts_with = "page_id")]
    title: Option<String>,
    #[arg(long)]
    page_id: Option<u64>,
    #[arg(long, allow_negative_numbers = true)]
    namespace: Option<i32>,
    #[arg(long)]
    db_key: Option<String>,
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Debug, Args)]
struct EventArgs {
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "IndexNow key to store under [indexnow]")]
    key: Option<String>,
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Submit(args)) => run_submit(config, cli.diagnostics, &args.url),
        Some(Commands::Save(args)) => run_event(
            config,
            cli.diagnostics,
            HookEvent::PageSaveComplete(PageSaveEvent {
                page: WikiPage {
                    id: None,
                    title: args.title,
                },
                user: args.user,
                summary: None,
            }),
        ),
        Some(Commands::Move(args)) => run_event(
            config,
            cli.diagnostics,
            HookEvent::PageMoveComplete(PageMoveEvent {
                old_title: args.old_title,
                new_title: args.new_title,
                user: args.user,
                page_id: None,
                reason: args.reason,
            }),
        ),
        Some(Commands::Delete(args)) => {
            let page = delete_target(args.title, args.page_id, args.namespace, args.db_key)?;
            run_event(
                config,
                cli.diagnostics,
                HookEvent::PageDeleteComplete(PageDeleteEvent {
                    page,
                    user: None,
                    reason: args.reason,
                }),
            )
        }
        Some(Commands::Event(args)) => {
            let event = read_event(args.file.as_deref())?;
            run_event(config, cli.diagnostics, event)
        }
        Some(Commands::Status) => run_status(config),
        Some(Commands::Init(args)) => run_init(config, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_submit(config: Option<&Path>, diagnostics: bool, url: &str) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let outcome = runtime.notifier()?.notify(url);
    print_outcome(&outcome);
    if diagnostics {
        println!("\n[diagnostics]\n{}", runtime.diagnostics());
    }
    Ok(())
}

fn run_event(config: Option<&Path>, diagnostics: bool, event: HookEvent) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let outcome = runtime.hooks()?.dispatch_outcome(&event);
    print_outcome(&outcome);
    if diagnostics {
        println!("\n[diagnostics]\n{}", runtime.diagnostics());
    }
    Ok(())
}

fn run_status(config: Option<&Path>) -> Result<()> {
    let runtime = Runtime::load(config)?;
    println!("indexnow status");
    println!("{}", runtime.diagnostics());
    Ok(())
}

fn run_init(config: Option<&Path>, args: InitArgs) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let path = &runtime.config_path;

    let wrote_template = if !path.exists() || args.force {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, config_template())
            .with_context(|| format!("failed to write {}", path.display()))?;
        true
    } else {
        false
    };
    let wrote_key = match args.key.as_deref() {
        Some(key) => patch_index_now_key(path, key)?,
        None => false,
    };

    println!("config_path: {}", normalize_path(path));
    println!("wrote_template: {wrote_template}");
    println!("wrote_key: {wrote_key}");
    Ok(())
}

fn delete_target(
    title: Option<String>,
    page_id: Option<u64>,
    namespace: Option<i32>,
    db_key: Option<String>,
) -> Result<PageRef> {
    if let Some(title) = title {
        return Ok(PageRef::Page(WikiPage { id: None, title }));
    }
    match (page_id, namespace, db_key) {
        (Some(id), Some(namespace), Some(db_key)) => Ok(PageRef::Identity(PageIdentity {
            id,
            namespace,
            db_key,
        })),
        _ => bail!("delete requires a title or --page-id with --namespace and --db-key"),
    }
}

fn read_event(file: Option<&Path>) -> Result<HookEvent> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read event from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("failed to parse hook event JSON")
}

fn print_outcome(outcome: &NotifyOutcome) {
    println!("outcome: {}", outcome.label());
    match outcome {
        NotifyOutcome::Skipped(reason) => println!("reason: {reason:?}"),
        NotifyOutcome::Delivered(response) | NotifyOutcome::Rejected(response) => {
            println!("http_code: {}", response.status);
            println!("elapsed_ms: {}", response.elapsed.as_millis());
        }
        NotifyOutcome::Failed(failure) => {
            println!("error_code: {}", failure.kind.as_str());
            println!("error: {}", failure.message);
        }
    }
}
