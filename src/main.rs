use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rtv::api::{Backend, DemoBackend, HttpBackend};
use rtv::controller::Controller;
use rtv::domain::{DEFAULT_EVENT_POLL_TIME, DEFAULT_PAGE_SIZE, RecordKind};
use rtv::loader::{load_students, load_submissions};
use rtv::model::{Model, Status, Tab};
use rtv::roster::{demo_students, demo_submissions};
use rtv::ui::TableUI;
use rtv::{AppConfig, AppError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Students,
    Submissions,
}

impl From<Kind> for RecordKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Students => RecordKind::Students,
            Kind::Submissions => RecordKind::Submissions,
        }
    }
}

/// Trainer and student dashboard for the terminal.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// CSV, parquet or arrow file with records. Demo data is shown without it.
    file: Option<String>,

    /// Which records the file holds
    #[arg(short, long, value_enum, default_value = "students")]
    kind: Kind,

    /// Rows per table page
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Base url of the dashboard backend, e.g. http://localhost:8000/api
    #[arg(long, env = "RTV_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "RTV_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Invalidated on quit
    #[arg(long, env = "RTV_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    #[arg(long, default_value = "~/.rtv.log")]
    log_file: String,

    /// Event poll time in ms
    #[arg(long, default_value_t = DEFAULT_EVENT_POLL_TIME)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Error: could not open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

// Expands ~ and $VARS, unknown variables leave the path untouched
fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}

fn init_logging(log_file: &str) -> Result<(), AppError> {
    let file = File::create(expand(log_file))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), AppError> {
    info!("Starting rtv!");

    let mut cfg = AppConfig::default()
        .with_page_size(args.page_size)
        .with_event_poll_time(args.poll_ms);
    cfg.api_url = args.api_url;
    cfg.access_token = args.access_token;
    cfg.refresh_token = args.refresh_token;

    let kind = RecordKind::from(args.kind);
    let (students, submissions) = match args.file.as_deref().map(expand) {
        Some(path) => match kind {
            RecordKind::Students => (load_students(path)?, demo_submissions()),
            RecordKind::Submissions => (demo_students(), load_submissions(path)?),
        },
        None => (demo_students(), demo_submissions()),
    };

    let backend: Box<dyn Backend> = match cfg.api_url.as_deref() {
        Some(url) => Box::new(HttpBackend::new(url, cfg.access_token.clone())?),
        None => {
            info!("No backend configured, running offline");
            Box::new(DemoBackend)
        }
    };

    let mut model = Model::init(&cfg, students, submissions, backend, Tab::from(kind))?;
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), AppError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message, timers advance either way
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    info!("Bye");
    Ok(())
}
