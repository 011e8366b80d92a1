use std::env;
use std::path::PathBuf;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::config;
use crate::engine::RodioEngine;
use crate::library::collect_sources;
use crate::resolver::{DecoderMeter, LoftyProbe, ResolverWorker};

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--print-config") {
        print!("{}", config::Settings::default().to_toml()?);
        return Ok(());
    }

    let (settings, config_problem) = settings::load_settings();
    let log_path = logging::init(&settings.logging);
    info!(version = env!("CARGO_PKG_VERSION"), log = ?log_path, "segue starting");
    if let Some(problem) = config_problem {
        warn!("{problem}");
    }

    let paths: Vec<PathBuf> = args.iter().map(PathBuf::from).collect();
    let sources = collect_sources(&paths, &settings.library);

    let engine = match RodioEngine::open() {
        Ok(engine) => Some(engine),
        Err(e) => {
            warn!(error = %e, "audio output unavailable; playback disabled");
            None
        }
    };
    let resolver = ResolverWorker::spawn(LoftyProbe, DecoderMeter)?;
    let mut sequencer = startup::build_sequencer(&settings, engine, sources, &resolver);

    let mut app = App::new();
    app.auto_levels = settings.levels.auto_check;
    if !sequencer.has_engine() {
        app.set_status("playback disabled: no audio output device");
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result =
        event_loop::run(&mut terminal, &settings, &mut app, &mut sequencer, &resolver);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let timeline = sequencer.dispose();
    info!(tracks = timeline.len(), "segue exiting");
    run_result
}
