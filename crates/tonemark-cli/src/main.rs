mod buffer;
mod outline;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::Duration,
};
use tonemark_config::Config;
use tonemark_engine::context::{CueResolver, CueSource, TabSettings};
use tonemark_engine::persistence::{FsExistence, JsonFileStore};
use tonemark_engine::tone::{LogSink, play_cue};
use tonemark_engine::{
    ActiveEditor, ChangeEvent, Command, CommandEnv, CommandOutcome, DecorationSink, DocumentId,
    DocumentRegistry, FlagDecoration, FlagError, Tone,
};

use crate::buffer::TextBuffer;
use crate::outline::IndentOutline;

/// How long the terminal may sit without input before stored records are
/// reconciled in the background.
const IDLE_TICK: Duration = Duration::from_millis(500);
const SWEEP_BATCH: usize = 16;

/// Flag markers drawn next to the text.
#[derive(Debug, Default)]
struct Gutter {
    lines: Vec<usize>,
}

impl Gutter {
    fn is_flagged(&self, line: usize) -> bool {
        self.lines.binary_search(&line).is_ok()
    }
}

impl DecorationSink for Gutter {
    fn set_flag_decorations(
        &mut self,
        _document: &DocumentId,
        decorations: &[FlagDecoration],
    ) -> Result<(), FlagError> {
        self.lines = decorations.iter().map(|d| d.line).collect();
        Ok(())
    }
}

struct App {
    buffer: TextBuffer,
    registry: DocumentRegistry<JsonFileStore>,
    resolver: CueResolver,
    outline: IndentOutline,
    gutter: Gutter,
    audio: LogSink,
    status: String,
    top: usize,
}

impl App {
    fn new(buffer: TextBuffer, config: &Config) -> Result<Self> {
        let store = JsonFileStore::open(&config.storage_path)?;
        let registry = DocumentRegistry::with_reconciliation(store, FsExistence)?;

        let flag_tone = Tone::new(config.flag_tone.note.clone(), config.flag_tone.instrument);
        let tabs = TabSettings {
            size: config.tab_size,
            hard: config.hard_tabs,
        };
        let mut resolver = CueResolver::new(flag_tone, tabs);
        if let Some(root) = &config.workspace_root {
            resolver = resolver.with_workspace_root(root);
        }

        let mut app = Self {
            buffer,
            registry,
            resolver,
            outline: IndentOutline,
            gutter: Gutter::default(),
            audio: LogSink::new(),
            status: String::new(),
            top: 0,
        };
        app.activate();
        app.cue();
        Ok(app)
    }

    fn activate(&mut self) {
        if let Err(e) = self.registry.activate(&self.buffer, &mut self.gutter) {
            log::warn!("{e}");
            self.status = e.to_string();
        }
    }

    /// Play the cue for the cursor line and show why.
    fn cue(&mut self) {
        let document = self.buffer.document().clone();
        let line = self.buffer.cursor_line();
        let cue = self.resolver.resolve(
            self.registry.is_flagged(&document, line),
            &document,
            &self.buffer.text(),
            line,
            &self.outline,
        );
        play_cue(&mut self.audio, &cue.tone);
        self.status = match cue.source {
            CueSource::Flag => format!("[{}] flagged line", cue.tone.note),
            CueSource::Context { label, description } => format!("[{label}] {description}"),
        };
    }

    fn command(&mut self, command: Command) {
        let flag_tone = self.resolver.flag_tone().clone();
        let mut env = CommandEnv {
            decorations: &mut self.gutter,
            audio: &mut self.audio,
            flag_tone: &flag_tone,
        };
        let result = tonemark_engine::run(command, &mut self.registry, Some(&mut self.buffer), &mut env);
        match result {
            Ok(CommandOutcome::Moved(_)) => self.cue(),
            Ok(CommandOutcome::Added { line }) => self.status = format!("Flagged line {}", line + 1),
            Ok(CommandOutcome::Deleted { line }) => {
                self.status = format!("Removed flag from line {}", line + 1)
            }
            Err(notice) => self.status = notice.message,
        }
    }

    fn edited(&mut self, event: ChangeEvent) {
        if let Err(e) = self.registry.apply_change(&event, &mut self.gutter) {
            log::warn!("{e}");
        }
        self.cue();
    }

    fn save(&mut self) {
        let first_write = !self.buffer.is_saved();
        if let Err(e) = self.buffer.save() {
            log::error!("{e:#}");
            self.status = format!("Save failed: {e:#}");
            return;
        }
        if first_write {
            self.activate();
        }
        self.status = match self.registry.save(self.buffer.document()) {
            Ok(()) => format!("Saved {}", self.buffer.path().display()),
            Err(e) => {
                log::error!("{e}");
                e.to_string()
            }
        };
    }

    fn idle(&mut self) {
        if self.registry.pending_reconciliation() == 0 {
            return;
        }
        if let Err(e) = self.registry.sweep_step(SWEEP_BATCH) {
            log::warn!("reconciling stored flags: {e}");
        }
    }

    /// Returns `false` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.buffer.move_lines(-1) {
                    self.cue();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.buffer.move_lines(1) {
                    self.cue();
                }
            }
            KeyCode::Left => self.buffer.move_columns(-1),
            KeyCode::Right => self.buffer.move_columns(1),
            KeyCode::Char('f') => self.command(Command::AddFlag),
            KeyCode::Char('d') => self.command(Command::DeleteFlag),
            KeyCode::Char('n') => self.command(Command::MoveToFlag),
            KeyCode::Char('o') => {
                let event = self.buffer.open_line_below();
                self.edited(event);
            }
            KeyCode::Char('x') => {
                let event = self.buffer.delete_line();
                self.edited(event);
            }
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
        true
    }
}

/// Send log output to a file beside the flag store; the terminal belongs
/// to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let log_path = config.storage_path.with_file_name("tonemark.log");
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <file>", args[0]);
        process::exit(1);
    }
    let file_path = PathBuf::from(&args[1]);

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", Config::config_path().display());
            process::exit(1);
        }
    };
    if let Err(e) = init_logging(&config) {
        eprintln!("Warning: logging disabled: {e:#}");
    }
    log::info!("tonemark starting on {}", file_path.display());

    let buffer = TextBuffer::open(&file_path)?;
    let mut app = App::new(buffer, &config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    if app.buffer.is_modified() {
        println!("{} has unsaved changes", app.buffer.path().display());
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(IDLE_TICK)? {
            app.idle();
            continue;
        }
        if let Event::Key(key) = event::read()?
            && !app.handle_key(key.code)
        {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    let title = file_title(app.buffer.path(), app.buffer.is_modified());
    let height = chunks[0].height.saturating_sub(2) as usize;
    let cursor = app.buffer.cursor();
    if cursor.line < app.top {
        app.top = cursor.line;
    } else if height > 0 && cursor.line >= app.top + height {
        app.top = cursor.line + 1 - height;
    }

    let line_count = app.buffer.line_count();
    let number_width = line_count.to_string().len();
    let lines: Vec<Line> = (app.top..line_count.min(app.top + height))
        .map(|line| {
            let marker = if app.gutter.is_flagged(line) { "⚑" } else { " " };
            let style = if line == cursor.line {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!(" {:>number_width$} ", line + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(app.buffer.line(line).into_owned(), style),
            ])
        })
        .collect();

    let content = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(content, chunks[0]);

    let help = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("f: Flag | d: Unflag | n: Next flag | "),
        Span::raw("o: Open line | x: Delete line | s: Save"),
    ]);
    let status = Paragraph::new(vec![Line::from(app.status.as_str()), help]).block(Block::default());
    f.render_widget(status, chunks[1]);

    let gutter_width = 1 + number_width + 2;
    let x = chunks[0].x + 1 + (gutter_width + cursor.column) as u16;
    let y = chunks[0].y + 1 + (cursor.line - app.top) as u16;
    f.set_cursor_position((x, y));
}

fn file_title(path: &Path, modified: bool) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    if modified { format!("{name} *") } else { name }
}
