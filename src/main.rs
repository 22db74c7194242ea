use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use fenn::app::App;
use fenn::config::{AppConfig, GeneralConfig, StatusConfig};
use fenn::error::{FennError, Result};
use fenn::event::{Event, EventHandler};
use fenn::handler::{handle_key_event, handle_mouse_event};
use fenn::selection::ToggleOutcome;
use fenn::theme::resolve_theme;
use fenn::tree::{descendants, tri_state, TriState};
use fenn::tui::{install_panic_hook, Tui};
use fenn::view::TreeView;
use fenn::workspace::{ReloadReport, Workspace};
use fenn::{logging, path, ui};

/// Grace period for in-flight selection writes after quitting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Select files and directories in a tree, with status overlays.
#[derive(Parser, Debug)]
#[command(name = "fenn", version, about)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file to load on top of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File holding `git status --porcelain` output
    #[arg(long, global = true)]
    status_file: Option<PathBuf>,

    /// Show dot-prefixed names
    #[arg(long, global = true)]
    show_hidden: bool,

    /// Disable mouse capture in the browser
    #[arg(long, global = true)]
    no_mouse: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive browser (default)
    Browse,
    /// Print the tree with selection and status marks
    Tree,
    /// Toggle one or more paths
    Toggle {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Deselect everything
    Clear,
    /// Print the selection reduced to non-overlapping paths
    Paths,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                mouse: self.no_mouse.then_some(false),
            },
            status: StatusConfig {
                porcelain_file: self.status_file.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = cli
        .root
        .canonicalize()
        .map_err(|_| FennError::NotFound(cli.root.clone()))?;
    if !root.is_dir() {
        return Err(FennError::InvalidPath(format!("{} is not a directory", root.display())));
    }

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    let command = cli.command.unwrap_or(Command::Browse);

    let _log_guard = match command {
        Command::Browse => match logging::init_file(&config.log_directory(), config.log_level()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: logging disabled: {}", e);
                None
            }
        },
        _ => {
            logging::init_stderr(config.log_level())?;
            None
        }
    };

    let workspace = Arc::new(Workspace::from_config(&root, &config));
    tracing::info!(root = %root.display(), command = ?command, "starting");

    match command {
        Command::Browse => browse(workspace, &config).await,
        Command::Tree => {
            let report = workspace.mount().await?;
            log_reload(&report);
            print_tree(&workspace);
            Ok(())
        }
        Command::Toggle { paths } => {
            log_reload(&workspace.mount().await?);
            for raw in &paths {
                match workspace.toggle(raw).await? {
                    ToggleOutcome::Selected(n) => println!("selected   {} ({} paths)", raw, n),
                    ToggleOutcome::Deselected(n) => println!("deselected {} ({} paths)", raw, n),
                    ToggleOutcome::Ignored => println!("skipped    {} (in progress)", raw),
                }
            }
            Ok(())
        }
        Command::Clear => {
            log_reload(&workspace.mount().await?);
            workspace.clear().await?;
            println!("selection cleared");
            Ok(())
        }
        Command::Paths => {
            log_reload(&workspace.mount().await?);
            for p in workspace.action_paths() {
                println!("{}", p);
            }
            Ok(())
        }
    }
}

fn log_reload(report: &ReloadReport) {
    for skipped in &report.skipped {
        tracing::warn!(path = %skipped.path, reason = ?skipped.reason, "entry skipped");
    }
    for warning in &report.status.warnings {
        tracing::warn!("{}", warning);
    }
    if !report.pruned.is_empty() {
        tracing::info!(count = report.pruned.len(), "dropped stale selections");
    }
}

fn print_tree(workspace: &Workspace) {
    let tree = workspace.tree();
    workspace.selection().with_selected(|selected| {
        for (full, node) in descendants(tree.root(), "") {
            let depth = full.matches('/').count();
            let mark = match tri_state(node, path::parent(&full), selected) {
                TriState::Clear => "[ ]",
                TriState::Indeterminate => "[-]",
                TriState::Full => "[x]",
            };
            let badge = match node.primary_status.map(|s| s.badge()) {
                Some(b) if !b.is_empty() => format!(" {}", b),
                _ => String::new(),
            };
            let tracked = if node.tracked { " (tracked)" } else { "" };
            let slash = if node.is_directory { "/" } else { "" };
            println!(
                "{}{} {}{}{}{}",
                "  ".repeat(depth),
                mark,
                node.name,
                slash,
                badge,
                tracked
            );
        }
    });
}

async fn browse(workspace: Arc<Workspace>, config: &AppConfig) -> Result<()> {
    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let view = TreeView::new(config.show_hidden(), config.dirs_first());
    let mut app = App::new(workspace, view, resolve_theme(config));
    let mut events = EventHandler::new(Duration::from_millis(100));
    let event_tx = events.sender();

    app.start_mount(&event_tx);

    loop {
        tui.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await? {
            Event::Key(key) => handle_key_event(&mut app, key, &event_tx),
            Event::Mouse(mouse) => handle_mouse_event(&mut app, mouse),
            Event::Tick | Event::Resize(_, _) => {}
            Event::Task(result) => app.handle_task(result),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;

    // Let selection writes that are already running finish.
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while app.is_busy() {
        match tokio::time::timeout_at(deadline, events.next()).await {
            Ok(Ok(Event::Task(result))) => app.handle_task(result),
            Ok(Ok(_)) => {}
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(pending = app.busy, "exiting with operations in flight");
                break;
            }
        }
    }
    Ok(())
}
