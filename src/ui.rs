use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use uuid::Uuid;

use crate::notify::APP_NAME;
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigating the task list.
    Normal,
    /// The input row has focus.
    Insert,
    /// The selected task's reminder-time editor has focus.
    EditReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSegment {
    Hour,
    Minute,
    Meridiem,
}

/// Hour/minute picker with a segment cursor, the keyboard stand-in for a
/// time-of-day wheel. Bumping the hour stays within the current half of
/// the day; AM/PM is its own segment.
#[derive(Debug, Clone, Copy)]
pub struct TimePicker {
    pub hour: u32,
    pub minute: u32,
    pub segment: TimeSegment,
}

impl TimePicker {
    pub fn now() -> Self {
        Self::from_time(Local::now())
    }

    pub fn from_time(time: DateTime<Local>) -> Self {
        TimePicker {
            hour: time.hour(),
            minute: time.minute(),
            segment: TimeSegment::Hour,
        }
    }

    pub fn bump(&mut self, delta: i32) {
        match self.segment {
            TimeSegment::Hour => {
                let meridiem = self.hour / 12;
                let h12 = (self.hour % 12) as i32;
                self.hour = meridiem * 12 + (h12 + delta).rem_euclid(12) as u32;
            }
            TimeSegment::Minute => {
                self.minute = (self.minute as i32 + delta).rem_euclid(60) as u32;
            }
            TimeSegment::Meridiem => {
                self.hour = (self.hour + 12) % 24;
            }
        }
    }

    pub fn next_segment(&mut self) {
        self.segment = match self.segment {
            TimeSegment::Hour => TimeSegment::Minute,
            TimeSegment::Minute => TimeSegment::Meridiem,
            TimeSegment::Meridiem => TimeSegment::Hour,
        };
    }

    pub fn prev_segment(&mut self) {
        self.segment = match self.segment {
            TimeSegment::Hour => TimeSegment::Meridiem,
            TimeSegment::Minute => TimeSegment::Hour,
            TimeSegment::Meridiem => TimeSegment::Minute,
        };
    }

    /// Picked hour/minute on the date the base time carries.
    pub fn apply_to(&self, base: DateTime<Local>) -> DateTime<Local> {
        base.with_hour(self.hour)
            .and_then(|t| t.with_minute(self.minute))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(base)
    }

    fn twelve_hour(&self) -> (u32, &'static str) {
        let h12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        let meridiem = if self.hour < 12 { "AM" } else { "PM" };
        (h12, meridiem)
    }
}

pub struct App {
    pub store: TaskStore,
    pub list_state: ListState,
    pub input_mode: InputMode,
    pub title_input: String,
    pub time_input: TimePicker,
    /// 0 = title field, 1 = time picker.
    pub input_field: u8,
    pub edit_picker: TimePicker,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: TaskStore) -> Self {
        let mut list_state = ListState::default();
        if store.visible().next().is_some() {
            list_state.select(Some(0));
        }
        App {
            store,
            list_state,
            input_mode: InputMode::Normal,
            title_input: String::new(),
            time_input: TimePicker::now(),
            input_field: 0,
            edit_picker: TimePicker::now(),
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Insert => self.handle_insert_key(key),
            InputMode::EditReminder => self.handle_edit_key(key),
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('n') | KeyCode::Char('i') => {
                self.input_mode = InputMode::Insert;
                self.input_field = 0;
            }
            KeyCode::Down => self.next_item(),
            KeyCode::Up => self.previous_item(),
            KeyCode::Char(' ') | KeyCode::Enter => self.complete_selected(),
            KeyCode::Char('d') | KeyCode::Backspace => self.delete_selected(),
            KeyCode::Char('e') => self.begin_edit(),
            _ => {}
        }
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Tab | KeyCode::BackTab => self.input_field ^= 1,
            KeyCode::Enter => self.add_task(),
            KeyCode::Char(c) if self.input_field == 0 => self.title_input.push(c),
            KeyCode::Backspace if self.input_field == 0 => {
                self.title_input.pop();
            }
            KeyCode::Up if self.input_field == 1 => self.time_input.bump(1),
            KeyCode::Down if self.input_field == 1 => self.time_input.bump(-1),
            KeyCode::Left if self.input_field == 1 => self.time_input.prev_segment(),
            KeyCode::Right if self.input_field == 1 => self.time_input.next_segment(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.input_mode = InputMode::Normal,
            KeyCode::Up => self.edit_bump(1),
            KeyCode::Down => self.edit_bump(-1),
            KeyCode::Left => self.edit_picker.prev_segment(),
            KeyCode::Right => self.edit_picker.next_segment(),
            _ => {}
        }
    }

    /// Submits the input row as-is; blank titles included. The row resets
    /// for the next entry.
    fn add_task(&mut self) {
        let reminder = self.time_input.apply_to(Local::now());
        self.store.add(&self.title_input, reminder);
        self.title_input.clear();
        self.time_input = TimePicker::now();
        if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
    }

    fn complete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.complete(id);
            self.clamp_selection();
        }
    }

    /// The selected visible row is resolved to its position in the full
    /// collection by id before anything is removed.
    fn delete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            if let Some(pos) = self.store.all().iter().position(|t| t.id == id) {
                self.store.delete(&[pos]);
            }
            self.clamp_selection();
        }
    }

    fn begin_edit(&mut self) {
        let Some(id) = self.selected_id() else { return };
        if let Some(task) = self.store.all().iter().find(|t| t.id == id) {
            self.edit_picker = TimePicker::from_time(task.reminder_time);
            self.input_mode = InputMode::EditReminder;
        }
    }

    /// Every picker change writes straight through to the store.
    fn edit_bump(&mut self, delta: i32) {
        self.edit_picker.bump(delta);
        let Some(id) = self.selected_id() else { return };
        let Some(base) = self
            .store
            .all()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.reminder_time)
        else {
            return;
        };
        self.store.update_reminder_time(id, self.edit_picker.apply_to(base));
    }

    pub fn next_item(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_item(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn selected_id(&self) -> Option<Uuid> {
        let idx = self.list_state.selected()?;
        self.store.visible().nth(idx).map(|t| t.id)
    }

    fn clamp_selection(&mut self) {
        let len = self.store.visible().count();
        if len == 0 {
            self.list_state.select(None);
        } else if let Some(i) = self.list_state.selected() {
            if i >= len {
                self.list_state.select(Some(len - 1));
            }
        }
    }
}

pub fn run_tui(store: TaskStore) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key)?;
                }
            }
        }

        // Deferred removals and due reminders run on the same loop the
        // key handlers do.
        app.store.tick();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_input_row(f, app, chunks[1]);
    render_tasks(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let open = app.store.visible().count();
    let header = Paragraph::new(format!("{open} open"))
        .block(Block::default().borders(Borders::ALL).title(APP_NAME))
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_input_row(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(14)].as_ref())
        .split(area);

    let title_focused = app.input_mode == InputMode::Insert && app.input_field == 0;
    let time_focused = app.input_mode == InputMode::Insert && app.input_field == 1;

    let title_text = if title_focused {
        Line::from(format!("{}_", app.title_input))
    } else if app.title_input.is_empty() {
        Line::from(Span::styled(
            "New To-Do Item",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(app.title_input.clone())
    };
    let title_field = Paragraph::new(title_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("New")
            .border_style(focus_style(title_focused)),
    );
    f.render_widget(title_field, chunks[0]);

    let time_field = Paragraph::new(picker_line(&app.time_input, time_focused)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Time")
            .border_style(focus_style(time_focused)),
    );
    f.render_widget(time_field, chunks[1]);
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let editing = app.input_mode == InputMode::EditReminder;
    let selected = app.list_state.selected();

    let items: Vec<ListItem> = app
        .store
        .visible()
        .enumerate()
        .map(|(i, task)| {
            let mut spans = vec![
                Span::styled(task.title.clone(), Style::default().fg(Color::White)),
                Span::raw("  "),
            ];
            if editing && selected == Some(i) {
                spans.extend(picker_line(&app.edit_picker, true).spans);
            } else {
                spans.push(Span::styled(
                    task.reminder_label(),
                    Style::default().fg(Color::Cyan),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("To-Do"))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints = match app.input_mode {
        InputMode::Normal => "n: new  Space: done  d: delete  e: time  ↑/↓: move  q: quit",
        InputMode::Insert => "Enter: add  Tab: switch field  ↑/↓ ←/→: adjust time  Esc: back",
        InputMode::EditReminder => "←/→: segment  ↑/↓: adjust  Enter/Esc: done",
    };
    let footer = Paragraph::new(hints).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn picker_line(picker: &TimePicker, focused: bool) -> Line<'static> {
    let (h12, meridiem) = picker.twelve_hour();
    let seg = |text: String, segment: TimeSegment| {
        if focused && picker.segment == segment {
            Span::styled(text, Style::default().add_modifier(Modifier::REVERSED))
        } else {
            Span::raw(text)
        }
    };
    Line::from(vec![
        seg(h12.to_string(), TimeSegment::Hour),
        Span::raw(":"),
        seg(format!("{:02}", picker.minute), TimeSegment::Minute),
        Span::raw(" "),
        seg(meridiem.to_string(), TimeSegment::Meridiem),
    ])
}
