mod app;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use memory_globe::config::GlobeConfig;
use memory_globe::data::{load_records, LandSource, LandmassLoader};
use memory_globe::records::sample_records;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fly around a terminal globe of geo-tagged memories")]
struct Args {
    /// JSON array of records (built-in samples when omitted)
    #[arg(long)]
    records: Option<PathBuf>,

    /// TopoJSON or GeoJSON landmass (coarse built-in outlines when omitted)
    #[arg(long)]
    land: Option<PathBuf>,

    /// JSON config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs here; the terminal belongs to the globe
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Draw the full chronological trail while exploring
    #[arg(long)]
    show_all_paths: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let config = match &args.config {
        Some(path) => GlobeConfig::load(path)?,
        None => GlobeConfig::default(),
    };
    let records = match &args.records {
        Some(path) => load_records(path)?,
        None => sample_records(),
    };
    let landmass = LandmassLoader::spawn(LandSource::from_arg(args.land.clone()), config.scene.land_mask_resolution);
    info!(records = records.len(), "starting");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let mut app = App::new(
        config,
        records,
        landmass,
        args.show_all_paths,
        size.width as usize,
        size.height as usize,
    );
    let result = run(&mut terminal, &mut app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Drag rotates, click focuses or resets
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.update();

        // Draw
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') => app.quit(),
                            KeyCode::Esc => app.escape(),
                            KeyCode::Enter => app.expand(),
                            KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_playback(),
                            KeyCode::Char('a') | KeyCode::Char('A') => app.toggle_show_all(),

                            // Rotate with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.rotate(-1.0, 0.0),
                            KeyCode::Right | KeyCode::Char('l') => app.rotate(1.0, 0.0),
                            KeyCode::Up | KeyCode::Char('k') => app.rotate(0.0, -1.0),
                            KeyCode::Down | KeyCode::Char('j') => app.rotate(0.0, 1.0),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
