use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser as ClapParser;
use color_eyre::eyre::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use agent_office::app::App;
use agent_office::events::{self, AppEvent};
use agent_office::ingest::{self, SourceKind, SourceOptions};
use agent_office::logging::{self, LogConfig};
use agent_office::office::DispatcherConfig;
use agent_office::ui;

#[derive(ClapParser, Debug)]
#[command(
    name = "agent-office",
    about = "Watch AI coding agents work in a tiny terminal office"
)]
struct Cli {
    /// Which tool's sessions to watch.
    #[arg(long, value_enum, env = "AGENT_OFFICE_SOURCE", default_value = "claude")]
    source: SourceKind,

    /// Shorthand for `--source demo`.
    #[arg(long)]
    demo: bool,

    /// Project whose Claude Code sessions to follow (default: current directory).
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Claude Code session UUID (default: most recently modified).
    #[arg(short, long)]
    session: Option<String>,

    /// SQLite database for the Kiro or OpenCode source.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Codex sessions directory (default: ~/.codex/sessions).
    #[arg(long)]
    sessions_root: Option<PathBuf>,

    /// Claude Code projects directory (default: ~/.claude/projects).
    #[arg(long)]
    claude_home: Option<PathBuf>,

    /// Frames per second.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=60))]
    fps: u32,

    /// Seed for reproducible movement and demo activity.
    #[arg(long)]
    seed: Option<u64>,

    /// Write tracing output to this file (filter via AGENT_OFFICE_LOG).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Some(path) = cli.log_file.clone() {
        logging::init(&LogConfig::from_env(path))?;
    }

    let kind = if cli.demo { SourceKind::Demo } else { cli.source };
    let source = ingest::build_source(
        kind,
        SourceOptions {
            project: cli.project,
            session: cli.session,
            claude_home: cli.claude_home,
            sessions_root: cli.sessions_root,
            db_path: cli.db_path,
            seed: cli.seed,
        },
    );
    info!(source = ?kind, status = %source.status(), "starting office");

    let mut app = App::new(
        source,
        DispatcherConfig {
            seed: cli.seed,
            ..Default::default()
        },
    );

    // Launch TUI.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_tui(&mut terminal, &mut app, cli.fps);

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_tui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    fps: u32,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<AppEvent>();

    events::spawn_key_reader(tx.clone());
    events::spawn_tick_timer(tx.clone(), Duration::from_millis(1000 / u64::from(fps)));

    // A missing or unwatchable directory only costs the early wake-ups.
    let _watcher = match app.source.watch_path() {
        Some(dir) => match events::spawn_source_watcher(&dir, tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "source watcher unavailable");
                None
            }
        },
        None => None,
    };

    loop {
        match rx.recv() {
            Ok(AppEvent::Key(key)) => app.handle_key(key),
            Ok(AppEvent::SourceChanged(_)) => app.source_changed(),
            Ok(AppEvent::Tick) => {
                app.frame();
                terminal.draw(|f| ui::render(f, app))?;
            }
            Err(mpsc::RecvError) => break,
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
