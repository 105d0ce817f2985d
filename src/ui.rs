use crate::dream_entry::{DreamDraft, DreamEntry};
use crate::dream_state::{DreamStore, StoreError};
use crate::session::SessionUser;
use crate::stats::DreamStats;
use crate::storage::BlobStorage;
use chrono::{DateTime, Utc};
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::Duration,
};
use tracing::warn;
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Date,
    Mood,
    Tags,
}

impl Field {
    const ORDER: [Field; 5] = [
        Field::Title,
        Field::Description,
        Field::Date,
        Field::Mood,
        Field::Tags,
    ];

    fn next(self) -> Field {
        let i = Field::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Field::ORDER[(i + 1) % Field::ORDER.len()]
    }

    fn prev(self) -> Field {
        let i = Field::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Field::ORDER[(i + Field::ORDER.len() - 1) % Field::ORDER.len()]
    }
}

/// The single open draft. `editing` holds the id being edited, `None` for a
/// new dream. `cursor_position` counts chars into the focused text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub draft: DreamDraft,
    pub editing: Option<u64>,
    pub focus: Field,
    pub cursor_position: usize,
    pub error: Option<String>,
}

fn field_text(draft: &mut DreamDraft, field: Field) -> Option<&mut String> {
    match field {
        Field::Title => Some(&mut draft.title),
        Field::Description => Some(&mut draft.description),
        Field::Date => Some(&mut draft.date),
        Field::Tags => Some(&mut draft.tags),
        Field::Mood => None,
    }
}

fn byte_offset(text: &str, cursor_position: usize) -> usize {
    text.char_indices()
        .nth(cursor_position)
        .map_or(text.len(), |(i, _)| i)
}

impl FormState {
    pub fn new(draft: DreamDraft, editing: Option<u64>) -> Self {
        let mut form = FormState {
            draft,
            editing,
            focus: Field::Title,
            cursor_position: 0,
            error: None,
        };
        form.move_end();
        form
    }

    pub fn focus_on(&mut self, field: Field) {
        self.focus = field;
        self.move_end();
    }

    fn text_len(&mut self) -> usize {
        field_text(&mut self.draft, self.focus).map_or(0, |t| t.chars().count())
    }

    fn move_end(&mut self) {
        self.cursor_position = self.text_len();
    }

    fn move_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor_position < self.text_len() {
            self.cursor_position += 1;
        }
    }

    fn insert(&mut self, c: char) {
        if let Some(text) = field_text(&mut self.draft, self.focus) {
            let at = byte_offset(text, self.cursor_position);
            text.insert(at, c);
            self.cursor_position += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        if let Some(text) = field_text(&mut self.draft, self.focus) {
            let at = byte_offset(text, self.cursor_position - 1);
            text.remove(at);
            self.cursor_position -= 1;
        }
    }

    fn delete(&mut self) {
        let cursor_position = self.cursor_position;
        if let Some(text) = field_text(&mut self.draft, self.focus) {
            if cursor_position < text.chars().count() {
                let at = byte_offset(text, cursor_position);
                text.remove(at);
            }
        }
    }

    /// Field contents with a `|` at the cursor when `field` has focus.
    fn display_text(&self, field: Field, text: &str) -> String {
        let mut shown = text.to_string();
        if self.focus == field {
            shown.insert(byte_offset(text, self.cursor_position), '|');
        }
        shown
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Form(FormState),
    ConfirmDelete(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    SignOut,
    Quit,
}

/// State of the journal screen. Store and clock are handed in by the caller
/// on every key press and draw.
pub struct JournalView {
    user: SessionUser,
    mode: Mode,
    selected: usize,
    status: Option<String>,
    protected: Option<String>,
}

impl JournalView {
    pub fn new(user: SessionUser) -> Self {
        JournalView {
            user,
            mode: Mode::Browse,
            selected: 0,
            status: None,
            protected: None,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_protected_message(&mut self, message: String) {
        self.protected = Some(message);
    }

    pub fn handle_key<S: BlobStorage>(
        &mut self,
        key: KeyEvent,
        store: &mut DreamStore<S>,
        now: DateTime<Utc>,
    ) -> Action {
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.handle_browse(key, store, now),
            Mode::Form(form) => {
                self.handle_form(key, form, store, now);
                Action::Continue
            }
            Mode::ConfirmDelete(id) => {
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Enter) {
                    self.report(store.remove(id), "Dream deleted");
                    self.clamp_selection(store.entries().len());
                }
                Action::Continue
            }
        }
    }

    fn handle_browse<S: BlobStorage>(
        &mut self,
        key: KeyEvent,
        store: &DreamStore<S>,
        now: DateTime<Utc>,
    ) -> Action {
        let selected = store.list().get(self.selected).map(|e| (*e).clone());
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('s') => return Action::SignOut,
            KeyCode::Char('n') => {
                self.status = None;
                self.mode = Mode::Form(FormState::new(DreamDraft::new(now.date_naive()), None));
            }
            KeyCode::Char('e') => {
                if let Some(entry) = selected {
                    self.status = None;
                    self.mode =
                        Mode::Form(FormState::new(DreamDraft::from_entry(&entry), Some(entry.id)));
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = selected {
                    self.mode = Mode::ConfirmDelete(entry.id);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < store.entries().len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        Action::Continue
    }

    fn handle_form<S: BlobStorage>(
        &mut self,
        key: KeyEvent,
        mut form: FormState,
        store: &mut DreamStore<S>,
        now: DateTime<Utc>,
    ) {
        let submit = match key.code {
            KeyCode::Esc => return,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Enter => form.focus != Field::Description,
            _ => false,
        };

        if !submit {
            match key.code {
                KeyCode::Tab => form.focus_on(form.focus.next()),
                KeyCode::BackTab => form.focus_on(form.focus.prev()),
                KeyCode::Left if form.focus == Field::Mood => {
                    form.draft.mood = form.draft.mood.prev()
                }
                KeyCode::Right if form.focus == Field::Mood => {
                    form.draft.mood = form.draft.mood.next()
                }
                KeyCode::Left => form.move_left(),
                KeyCode::Right => form.move_right(),
                KeyCode::Home => form.cursor_position = 0,
                KeyCode::End => form.move_end(),
                KeyCode::Enter => form.insert('\n'),
                KeyCode::Char(c) => form.insert(c),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Delete => form.delete(),
                _ => {}
            }
            self.mode = Mode::Form(form);
            return;
        }

        let input = match form.draft.validate() {
            Ok(input) => input,
            Err(e) => {
                form.error = Some(e.to_string());
                self.mode = Mode::Form(form);
                return;
            }
        };

        match form.editing {
            Some(id) => self.report(store.update(id, input), "Dream updated"),
            None => {
                self.report(store.create_at(input, now), "Dream saved");
                self.selected = 0;
            }
        }
    }

    fn report<T>(&mut self, result: Result<T, StoreError>, done: &str) {
        self.status = Some(match result {
            Ok(_) => done.to_string(),
            Err(e) => {
                warn!(error = %e, "journal operation failed");
                e.to_string()
            }
        });
    }

    fn clamp_selection(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn render<S: BlobStorage>(&self, f: &mut Frame, store: &DreamStore<S>, now: DateTime<Utc>) {
        match &self.mode {
            Mode::Form(form) => render_form(f, form),
            Mode::Browse => self.render_journal(f, store, now),
            Mode::ConfirmDelete(id) => {
                self.render_journal(f, store, now);
                let title = store.get(*id).map(|e| e.title.as_str()).unwrap_or("");
                render_confirm(f, title);
            }
        }
    }

    fn render_journal<S: BlobStorage>(
        &self,
        f: &mut Frame,
        store: &DreamStore<S>,
        now: DateTime<Utc>,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
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

        let mut header = vec![
            Line::from(Span::styled(
                "Dream Dashboard",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::raw(format!("Welcome back, {}! ", self.user.name)),
                Span::styled(
                    format!("({})", self.user.email),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        ];
        if let Some(message) = &self.protected {
            header.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        f.render_widget(
            Paragraph::new(header).alignment(Alignment::Center),
            chunks[0],
        );

        render_stats(f, chunks[1], &store.stats(now));

        let entries = store.list();
        let list_block = Block::default().borders(Borders::ALL).title("Your Dreams");
        if entries.is_empty() {
            let empty = Paragraph::new("No dreams recorded yet. Press n to record your first dream.")
                .alignment(Alignment::Center)
                .block(list_block);
            f.render_widget(empty, chunks[2]);
        } else {
            let width = chunks[2].width.saturating_sub(4) as usize;
            let items: Vec<ListItem> = entries.iter().map(|e| dream_item(e, width)).collect();
            let list = List::new(items)
                .block(list_block)
                .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            f.render_stateful_widget(
                list,
                chunks[2],
                &mut ListState::default().with_selected(Some(self.selected)),
            );
        }

        let footer = match &self.status {
            Some(status) => Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Green),
            )),
            None if entries.is_empty() => controls(&[("n", "new dream"), ("s", "sign out"), ("q", "quit")]),
            None => controls(&[
                ("n", "new"),
                ("e", "edit"),
                ("d", "delete"),
                ("s", "sign out"),
                ("q", "quit"),
            ]),
        };
        f.render_widget(
            Paragraph::new(footer)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center),
            chunks[3],
        );
    }
}

fn controls(keys: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("Press ")];
    for (i, (key, what)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        spans.push(Span::styled(
            key.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" to {what}")));
    }
    Line::from(spans)
}

fn render_stats(f: &mut Frame, area: Rect, stats: &DreamStats) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(area);

    let average = if stats.total > 0 {
        format!("{:.1}", stats.average_per_week)
    } else {
        "0".to_string()
    };
    let figures = [
        ("Total Dreams", stats.total.to_string(), Color::Magenta),
        ("This Week", stats.this_week.to_string(), Color::Blue),
        ("Average/Week", average, Color::LightRed),
    ];
    for ((title, value, color), area) in figures.into_iter().zip(cards.iter()) {
        let card = Paragraph::new(value)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(card, *area);
    }
}

fn dream_item(entry: &DreamEntry, width: usize) -> ListItem<'static> {
    let mut lines = vec![
        Line::from(vec![
            Span::raw(format!("{} ", entry.mood.glyph())),
            Span::styled(
                truncate(&entry.title, width.saturating_sub(16)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", entry.date.format("%Y-%m-%d")),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::raw(truncate(
            entry.description.lines().next().unwrap_or(""),
            width,
        ))),
    ];
    if !entry.tags.is_empty() {
        let tags: Vec<String> = entry.tags.iter().map(|t| format!("#{t}")).collect();
        lines.push(Line::from(Span::styled(
            truncate(&tags.join(" "), width),
            Style::default().fg(Color::Cyan),
        )));
    }
    ListItem::new(lines)
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            if width > 0 {
                while used + 1 > width {
                    match out.pop() {
                        Some(last) => used -= last.width().unwrap_or(0),
                        None => break,
                    }
                }
                out.push('…');
            }
            return out;
        }
        used += w;
        out.push(c);
    }
    out
}

fn render_form(f: &mut Frame, form: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(f.area());

    let heading = if form.editing.is_some() {
        "Edit Dream"
    } else {
        "Record Your Dream"
    };
    let title = Paragraph::new(heading)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let field_block = |field: Field, label: &'static str| {
        let style = if form.focus == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(label)
    };

    f.render_widget(
        Paragraph::new(form.display_text(Field::Title, &form.draft.title))
            .block(field_block(Field::Title, "Dream Title")),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new(form.display_text(Field::Description, &form.draft.description))
            .wrap(Wrap { trim: false })
            .block(field_block(Field::Description, "Description")),
        chunks[2],
    );

    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length(16),
                Constraint::Length(18),
                Constraint::Min(10),
            ]
            .as_ref(),
        )
        .split(chunks[3]);
    f.render_widget(
        Paragraph::new(form.display_text(Field::Date, &form.draft.date))
            .block(field_block(Field::Date, "Date")),
        row[0],
    );
    f.render_widget(
        Paragraph::new(format!(
            "< {} {} >",
            form.draft.mood.glyph(),
            form.draft.mood.label()
        ))
        .block(field_block(Field::Mood, "Mood")),
        row[1],
    );
    f.render_widget(
        Paragraph::new(form.display_text(Field::Tags, &form.draft.tags))
            .block(field_block(Field::Tags, "Tags (comma separated)")),
        row[2],
    );

    let submit = if form.editing.is_some() {
        "Update Dream"
    } else {
        "Save Dream"
    };
    let mut footer = vec![Line::from(format!(
        "Tab: next field, Left/Right: move or pick mood, Enter or Ctrl-S: {submit}, Esc: Cancel"
    ))
    .style(Style::default().fg(Color::Yellow))];
    if let Some(error) = &form.error {
        footer.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        chunks[4],
    );
}

fn render_confirm(f: &mut Frame, title: &str) {
    let area = centered_rect(50, 5, f.area());
    f.render_widget(Clear, area);
    let prompt = Paragraph::new(vec![
        Line::from(format!("Delete \"{title}\"?")),
        Line::from(Span::styled(
            "y: delete, any other key: keep",
            Style::default().fg(Color::Yellow),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Delete Dream"));
    f.render_widget(prompt, area);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height: height.min(area.height),
    }
}

/// Owns the terminal for the life of the journal session.
pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI { terminal })
    }

    pub fn display<S: BlobStorage>(
        &mut self,
        view: &JournalView,
        store: &DreamStore<S>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.terminal.draw(|f| view.render(f, store, now))?;
        Ok(())
    }

    pub fn display_message(&mut self, title: &str, message: &str) -> Result<()> {
        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Percentage(40),
                        Constraint::Length(3),
                        Constraint::Min(0),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let text = Paragraph::new(vec![
                Line::from(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(message.to_string()),
            ])
            .alignment(Alignment::Center);
            f.render_widget(text, chunks[1]);
        })?;
        Ok(())
    }

    /// Waits up to `timeout` for a key press.
    pub fn next_key(&self, timeout: Duration) -> Result<Option<KeyEvent>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
