pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use liftlog::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    collaborators::Collaborators,
    config::{ConfigStore, FileConfigStore, Overrides, RunMode, RuntimeSettings},
    history::{LogSink, SqliteLogStore},
    plan::{Plan, PlanProvider},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::{SessionLog, SessionResult, SessionRunner, SetField},
    util::{coerce_number, format_clock, format_load, pad_to_width},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin, BufWriter},
    path::PathBuf,
    sync::Mutex,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// terminal workout session runner with rest timers and volume tracking
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Run prescribed workout plans set by set in the terminal: tick sets off, rest between them, and keep a history of every finished session with its training volume."
)]
pub struct Cli {
    /// where plans come from and where history goes
    #[clap(short = 'm', long, value_enum, global = true)]
    mode: Option<RunMode>,

    /// directory of plan documents (*.json) used in live mode
    #[clap(long, global = true)]
    plans_dir: Option<PathBuf>,

    /// session history database used in live mode
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// start a workout session for a plan
    Run {
        /// id of the plan to run
        plan_id: String,
    },
    /// list available plans
    Plans,
    /// show recently finished sessions
    History {
        /// number of sessions to show
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// delete every stored session instead
        #[clap(long)]
        clear: bool,
    },
    /// export every finished set as CSV
    Export {
        /// destination file
        path: PathBuf,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            run_mode: self.mode,
            plans_dir: self.plans_dir.clone(),
            db_path: self.db.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Workout,
    Editing { field: SetField, buffer: String },
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive state around one session: selection, edit buffer, and outcome
#[derive(Debug)]
pub struct App<C: Clock = SystemClock> {
    pub session: SessionRunner<C>,
    pub state: AppState,
    pub cursor: usize,
    pub rest_step_secs: i64,
    pub saved: Option<Result<(), String>>,
}

impl<C: Clock> App<C> {
    pub fn new(plan: Plan, clock: C, rest_step_secs: i64) -> Self {
        Self {
            session: SessionRunner::start(plan, clock),
            state: AppState::Workout,
            cursor: 0,
            rest_step_secs,
            saved: None,
        }
    }

    /// Every (exercise, set) pair in display order
    pub fn positions(&self) -> Vec<(usize, usize)> {
        self.session
            .exercises()
            .iter()
            .enumerate()
            .flat_map(|(ei, ex)| (0..ex.sets.len()).map(move |si| (ei, si)))
            .collect()
    }

    pub fn selected(&self) -> Option<(usize, usize)> {
        self.positions().get(self.cursor).copied()
    }

    pub fn on_tick(&mut self) {
        if self.state != AppState::Summary {
            let result = self.session.tick();
            self.check(result);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, sink: &mut dyn LogSink) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.abandon();
            return Flow::Quit;
        }

        match self.state.clone() {
            AppState::Workout => self.on_workout_key(key, sink),
            AppState::Editing { field, buffer } => {
                self.on_editing_key(key, field, buffer);
                Flow::Continue
            }
            AppState::Summary => Flow::Quit,
        }
    }

    fn on_workout_key(&mut self, key: KeyEvent, sink: &mut dyn LogSink) -> Flow {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.abandon();
                return Flow::Quit;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.positions().len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(last);
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some((ex, set)) = self.selected() {
                    let result = self.session.toggle_set(ex, set);
                    self.check(result);
                }
            }
            KeyCode::Char('w') => self.begin_edit(SetField::Load),
            KeyCode::Char('r') => self.begin_edit(SetField::Reps),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let result = self.session.extend_rest(self.rest_step_secs);
                self.check(result);
            }
            KeyCode::Char('-') => {
                let result = self.session.extend_rest(-self.rest_step_secs);
                self.check(result);
            }
            KeyCode::Char('s') => {
                let result = self.session.skip_rest();
                self.check(result);
            }
            KeyCode::Char('f') => self.finish(sink),
            _ => {}
        }
        Flow::Continue
    }

    fn on_editing_key(&mut self, key: KeyEvent, field: SetField, mut buffer: String) {
        match key.code {
            KeyCode::Esc => self.state = AppState::Workout,
            KeyCode::Enter => {
                if let Some((ex, set)) = self.selected() {
                    let result = self.session.edit_set(ex, set, field, coerce_number(&buffer));
                    self.check(result);
                }
                self.state = AppState::Workout;
            }
            KeyCode::Backspace => {
                buffer.pop();
                self.state = AppState::Editing { field, buffer };
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
                buffer.push(c);
                self.state = AppState::Editing { field, buffer };
            }
            _ => {}
        }
    }

    fn begin_edit(&mut self, field: SetField) {
        let Some((ex, set)) = self.selected() else {
            return;
        };
        let current = &self.session.exercises()[ex].sets[set];
        let buffer = match field {
            SetField::Reps => current.reps.to_string(),
            SetField::Load => format_load(current.load),
        };
        self.state = AppState::Editing { field, buffer };
    }

    fn finish(&mut self, sink: &mut dyn LogSink) {
        let log = match self.session.finish() {
            Ok(log) => log,
            Err(err) => {
                warn!(%err, "finish rejected");
                return;
            }
        };

        self.saved = Some(sink.persist(&log).map_err(|err| {
            warn!(%err, "failed to store session log");
            err.to_string()
        }));
        self.state = AppState::Summary;
    }

    fn abandon(&self) {
        if !self.session.is_finished() {
            info!(
                plan = %self.session.plan().id,
                completed = self.session.completed_sets(),
                "session abandoned"
            );
        }
    }

    fn check<T>(&self, result: SessionResult<T>) {
        if let Err(err) = result {
            warn!(%err, "rejected session operation");
        }
    }
}

fn init_tracing() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter =
        EnvFilter::try_from_env("LIFTLOG_LOG").unwrap_or_else(|_| EnvFilter::new("liftlog=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(err) = run(cli) {
        error!(%err, "liftlog failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = FileConfigStore::new().load();
    let settings = RuntimeSettings::resolve(&config, cli.overrides());
    let mut collaborators = Collaborators::for_mode(&settings)?;

    match cli.command {
        Command::Run { ref plan_id } => {
            let plan = collaborators.plans.load_plan(plan_id)?;
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            let mut app = App::new(plan, SystemClock, settings.rest_step_secs);
            run_tui(&mut app, &mut collaborators.history)?;
        }
        Command::Plans => print_plans(collaborators.plans.as_ref())?,
        Command::History { clear: true, .. } => {
            collaborators.history.clear_all()?;
            println!("history cleared");
        }
        Command::History { limit, .. } => print_history(&collaborators.history, limit)?,
        Command::Export { ref path } => {
            let rows = collaborators
                .history
                .export_csv(BufWriter::new(File::create(path)?))?;
            println!("exported {rows} sets to {}", path.display());
        }
    }

    Ok(())
}

fn run_tui(app: &mut App, sink: &mut dyn LogSink) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, sink);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    if let Some(log) = app.session.log() {
        println!("{}", summary_line(log));
    }
    Ok(())
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    sink: &mut dyn LogSink,
) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::per_second());

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let flow = match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                Flow::Continue
            }
            AppEvent::Resize => Flow::Continue,
            AppEvent::Key(key) => app.on_key(key, sink),
        };

        if flow == Flow::Quit {
            return Ok(());
        }
    }
}

fn print_plans(plans: &dyn PlanProvider) -> liftlog::Result<()> {
    let plans = plans.list_plans()?;
    if plans.is_empty() {
        println!("no plans found");
        return Ok(());
    }

    let id_width = plans.iter().map(|p| p.id.len()).max().unwrap_or(0);
    for plan in plans {
        println!(
            "{}  {} ({} exercises, {} sets)",
            pad_to_width(&plan.id, id_width),
            plan.title,
            plan.exercises.len(),
            plan.total_sets()
        );
    }
    Ok(())
}

fn print_history(store: &SqliteLogStore, limit: usize) -> liftlog::Result<()> {
    let logs = store.recent_logs(limit)?;
    if logs.is_empty() {
        println!("no finished sessions yet");
        return Ok(());
    }

    for log in &logs {
        println!("{}", summary_line(log));
        let trained = log
            .exercises
            .iter()
            .filter(|e| !e.sets.is_empty())
            .map(|e| format!("{} x{}", e.name, e.sets.len()))
            .join(", ");
        if !trained.is_empty() {
            println!("    {trained}");
        }
    }
    println!(
        "{} sessions, lifetime volume {}",
        store.log_count()?,
        format_load(store.lifetime_volume()?)
    );
    Ok(())
}

fn summary_line(log: &SessionLog) -> String {
    format!(
        "{}  {}  {}  {} sets  volume {}",
        log.completed_at.format("%Y-%m-%d %H:%M"),
        pad_to_width(&log.title, 20),
        format_clock(log.duration_secs),
        log.completed_sets(),
        format_load(log.total_volume)
    )
}
