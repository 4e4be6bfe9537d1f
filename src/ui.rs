// 🖥️ Kiosk UI - terminal front end for the registration orchestrator
//
// Two pages: the kiosk itself (name list, search, free-text entry, scan
// confirmation) and today's attendance. The terminal loop is synchronous;
// orchestrator calls are driven through a tokio runtime handle. Scan signals
// are polled once per tick.

use crate::entities::{filter_names, AttendanceRecord, Name};
use crate::error::CheckInError;
use crate::orchestrator::{Orchestrator, RegistrationState};
use crate::scan::ScanReceiver;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::runtime::Handle;

const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Kiosk,
    Today,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Kiosk => Page::Today,
            Page::Today => Page::Kiosk,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Kiosk => "Check-in",
            Page::Today => "Today's Attendance",
        }
    }
}

/// Which widget receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Names,
    Search,
    Entry,
}

/// Colour of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn color(&self) -> Color {
        match self {
            Tone::Info => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Warning => Color::Yellow,
            Tone::Error => Color::Red,
        }
    }

    fn of(err: &CheckInError) -> Self {
        match err {
            CheckInError::InvalidInput(_) | CheckInError::AlreadyRegisteredToday { .. } => {
                Tone::Warning
            }
            CheckInError::StoreUnavailable(_) => Tone::Error,
        }
    }
}

pub struct App {
    pub orchestrator: Orchestrator,
    scans: ScanReceiver,
    runtime: Handle,
    /// Roster minus today's check-ins, unfiltered
    pub available: Vec<Name>,
    /// `available` narrowed by `search`
    pub visible: Vec<Name>,
    pub today: Vec<AttendanceRecord>,
    pub search: String,
    pub entry: String,
    pub focus: Focus,
    pub tone: Tone,
    pub current_page: Page,
    pub state: TableState,
    pub should_quit: bool,
}

impl App {
    pub fn new(orchestrator: Orchestrator, scans: ScanReceiver, runtime: Handle) -> Self {
        let mut app = Self {
            orchestrator,
            scans,
            runtime,
            available: Vec::new(),
            visible: Vec::new(),
            today: Vec::new(),
            search: String::new(),
            entry: String::new(),
            focus: Focus::Names,
            tone: Tone::Info,
            current_page: Page::Kiosk,
            state: TableState::default(),
            should_quit: false,
        };
        app.refresh();
        app
    }

    /// Reload the name list and today's attendance from the store.
    pub fn refresh(&mut self) {
        match self.runtime.block_on(self.orchestrator.available_names("")) {
            Ok(names) => self.available = names,
            Err(e) => self.tone = Tone::of(&e),
        }
        match self.runtime.block_on(self.orchestrator.todays_attendance()) {
            Ok(records) => self.today = records,
            Err(e) => self.tone = Tone::of(&e),
        }
        self.apply_search();
    }

    fn apply_search(&mut self) {
        self.visible = filter_names(&self.available, &self.search);
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            let i = self.state.selected().unwrap_or(0).min(self.visible.len() - 1);
            self.state.select(Some(i));
        }
    }

    pub fn highlighted(&self) -> Option<&Name> {
        self.state.selected().and_then(|i| self.visible.get(i))
    }

    /// Consume a pending scan, if any. Called once per tick.
    pub fn tick(&mut self) {
        if self.orchestrator.poll_scan(&mut self.scans) {
            self.current_page = Page::Kiosk;
            self.focus = Focus::Names;
            self.entry.clear();
            self.tone = Tone::Info;
            self.refresh();
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    /// Enter on the name list.
    ///
    /// Idle: register the highlighted name immediately. Awaiting confirmation:
    /// the first Enter selects, a second Enter on the same name confirms.
    pub fn activate_highlighted(&mut self) {
        let Some(name) = self.highlighted().cloned() else {
            return;
        };

        let already_selected = self.orchestrator.session().selected_name.as_ref() == Some(&name);
        let awaiting = self.orchestrator.state() == RegistrationState::AwaitingConfirmation;

        if awaiting && !already_selected {
            if let Err(e) = self.orchestrator.select_name(name.as_str()) {
                self.tone = Tone::of(&e);
            }
            return;
        }

        let result = if already_selected {
            self.runtime.block_on(self.orchestrator.submit(None))
        } else {
            self.runtime.block_on(self.orchestrator.select_and_submit(name.as_str()))
        };
        self.finish(result.map(|_| ()));
    }

    /// Enter in the free-text box.
    pub fn submit_entry(&mut self) {
        let result = self
            .runtime
            .block_on(self.orchestrator.submit(Some(self.entry.as_str())));
        let registered = result.is_ok();
        self.finish(result.map(|_| ()));
        if registered {
            self.entry.clear();
            self.focus = Focus::Names;
        }
    }

    /// Ctrl+A in the free-text box: add to the roster without checking in.
    pub fn add_entry_to_list(&mut self) {
        let result = self
            .runtime
            .block_on(self.orchestrator.add_name(self.entry.as_str()));
        let added = result.is_ok();
        self.finish(result.map(|_| ()));
        if added {
            self.entry.clear();
            self.orchestrator.type_name("");
        }
    }

    /// Focus back to the list. Unsubmitted text is discarded so it cannot
    /// outrank the name picked next.
    fn leave_entry(&mut self) {
        self.entry.clear();
        self.orchestrator.type_name("");
        self.focus = Focus::Names;
    }

    pub fn abandon(&mut self) {
        self.orchestrator.abandon();
        self.entry.clear();
        self.tone = Tone::Info;
    }

    fn finish(&mut self, result: Result<(), CheckInError>) {
        self.tone = match &result {
            Ok(()) => Tone::Success,
            Err(e) => Tone::of(e),
        };
        self.refresh();
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 10).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(10));
        self.state.select(Some(i));
    }

    // ========================================================================
    // KEYS
    // ========================================================================

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.focus {
            Focus::Names => self.handle_names_key(key),
            Focus::Search => self.handle_search_key(key),
            Focus::Entry => self.handle_entry_key(key),
        }
    }

    fn handle_names_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.abandon(),
            KeyCode::Tab | KeyCode::BackTab => self.current_page = self.current_page.next(),
            KeyCode::Char('/') => {
                self.current_page = Page::Kiosk;
                self.focus = Focus::Search;
            }
            KeyCode::Char('n') | KeyCode::Char('i') => {
                self.current_page = Page::Kiosk;
                self.focus = Focus::Entry;
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Enter if self.current_page == Page::Kiosk => self.activate_highlighted(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => {
                if !self.visible.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.visible.is_empty() {
                    self.state.select(Some(self.visible.len() - 1));
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => self.focus = Focus::Names,
            KeyCode::Backspace => {
                self.search.pop();
                self.apply_search();
            }
            KeyCode::Char(c) => {
                self.search.push(c);
                self.apply_search();
            }
            _ => {}
        }
    }

    fn handle_entry_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.leave_entry(),
            KeyCode::Enter => self.submit_entry(),
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.add_entry_to_list()
            }
            KeyCode::Backspace => {
                self.entry.pop();
                self.orchestrator.type_name(&self.entry);
            }
            KeyCode::Char(c) => {
                self.entry.push(c);
                self.orchestrator.type_name(&self.entry);
            }
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
        app.tick();
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Kiosk => render_kiosk(f, chunks[1], app),
        Page::Today => render_today(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "🎉 Party Check-in  ",
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    )];

    for (i, page) in [Page::Kiosk, Page::Today].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Present today: {}", app.today.len()),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("Waiting: {}", app.available.len()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_kiosk(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search
            Constraint::Length(3), // Free-text entry
            Constraint::Min(0),    // Confirmation
        ])
        .split(columns[1]);

    render_names(f, columns[0], app);
    render_input(f, right[0], " Search (/) ", &app.search, app.focus == Focus::Search);
    render_input(f, right[1], " Not in the list? (n) ", &app.entry, app.focus == Focus::Entry);
    render_confirmation(f, right[2], app);
}

fn render_names(f: &mut Frame, area: Rect, app: &mut App) {
    let selected = app.orchestrator.session().selected_name.clone();

    let rows = app.visible.iter().map(|name| {
        let style = if selected.as_ref() == Some(name) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![Cell::from(truncate(name.as_str(), 40))]).style(style)
    });

    let border = if app.focus == Focus::Names { Color::Yellow } else { Color::White };
    let table = Table::new(rows, [Constraint::Min(10)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" Select your name ({}) ", app.visible.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_input(f: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let border = if focused { Color::Yellow } else { Color::White };
    let cursor = if focused { "▏" } else { "" };

    let input = Paragraph::new(format!("{value}{cursor}")).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title.to_string()),
    );

    f.render_widget(input, area);
}

fn render_confirmation(f: &mut Frame, area: Rect, app: &App) {
    let session = app.orchestrator.session();
    let mut lines = Vec::new();

    if session.qr_confirmation_pending {
        lines.push(Line::from(Span::styled(
            "📷 QR code scanned",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        match &session.selected_name {
            Some(name) => {
                lines.push(Line::from(vec![
                    Span::raw("Selected: "),
                    Span::styled(name.as_str().to_string(), Style::default().fg(Color::Yellow)),
                ]));
                lines.push(Line::from("Press Enter again to confirm"));
            }
            None => lines.push(Line::from("Pick your name, or type it below")),
        }
        lines.push(Line::from("Esc to cancel"));
    } else {
        lines.push(Line::from("Scan the QR code at the door,"));
        lines.push(Line::from("or pick your name and press Enter."));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" Confirmation "),
    );

    f.render_widget(panel, area);
}

fn render_today(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(["Time", "Name"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.today.iter().rev().map(|record| {
        Row::new(vec![
            Cell::from(record.display_time()),
            Cell::from(truncate(record.name.as_str(), 40)),
        ])
    });

    let table = Table::new(rows, [Constraint::Length(24), Constraint::Min(10)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Checked in today "),
        );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.orchestrator.status()),
        Style::default().fg(app.tone.color()).add_modifier(Modifier::BOLD),
    )];

    let keys: &[(&str, &str)] = match app.focus {
        Focus::Names => &[("Enter", "Check in"), ("/", "Search"), ("n", "Type name"), ("Tab", "Page"), ("q", "Quit")],
        Focus::Search => &[("Esc", "Done")],
        Focus::Entry => &[("Enter", "Check in"), ("Ctrl+A", "Add to list"), ("Esc", "Back")],
    };
    for (key, label) in keys {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {label}")));
    }

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
