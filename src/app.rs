use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::debug;

use crate::config::UiConfig;
use crate::model::TaskRegistry;
use crate::state::{Action, Key, Mode, SessionState};
use crate::view::{self, FILTER_PREFIX, Projection};

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Quit,
    Run(String),
}

pub fn run_tui(registry: &TaskRegistry, ui: &UiConfig) -> Result<SessionOutcome> {
    let mut terminal = init_terminal()?;
    let mut state = SessionState::with_query_limit(registry, ui.query_limit);
    let mut list_state = ListState::default();

    let outcome = run_loop(&mut terminal, &mut state, &mut list_state, &ui.placeholder);
    match outcome {
        Ok(outcome) => {
            restore_terminal(&mut terminal)?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = restore_terminal(&mut terminal);
            Err(err)
        }
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal")
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")
}

fn run_loop(
    terminal: &mut TuiTerminal,
    state: &mut SessionState<'_>,
    list_state: &mut ListState,
    placeholder: &str,
) -> Result<SessionOutcome> {
    loop {
        terminal.draw(|frame| draw_ui(frame, state, list_state, placeholder))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let Some(key) = translate_key(key) else {
                    continue;
                };
                match state.handle(key) {
                    Action::None => {}
                    Action::Quit => return Ok(SessionOutcome::Quit),
                    Action::Run(name) => return Ok(SessionOutcome::Run(name)),
                }
            }
            // The next draw picks up the new size.
            Event::Resize(width, height) => debug!(width, height, "terminal resized"),
            _ => {}
        }
    }
}

fn translate_key(key: KeyEvent) -> Option<Key> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Key::Cancel),
            KeyCode::Char('a') => Some(Key::Home),
            KeyCode::Char('e') => Some(Key::End),
            KeyCode::Char('w') => Some(Key::DeleteWord),
            KeyCode::Char('u') => Some(Key::ClearToStart),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Home => Some(Key::Home),
        KeyCode::End => Some(Key::End),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Delete => Some(Key::Delete),
        KeyCode::Char(ch)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            Some(Key::Char(ch))
        }
        _ => None,
    }
}

fn draw_ui(
    frame: &mut Frame,
    state: &SessionState<'_>,
    list_state: &mut ListState,
    placeholder: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let projection = view::render(state, placeholder);
    draw_filter_line(frame, state, &projection, chunks[1]);
    draw_task_list(frame, state, &projection, list_state, chunks[3]);
    frame.render_widget(
        Paragraph::new(projection.help_line.as_str()).style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );
}

fn draw_filter_line(
    frame: &mut Frame,
    state: &SessionState<'_>,
    projection: &Projection,
    area: Rect,
) {
    let style = if state.query().is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    frame.render_widget(
        Paragraph::new(Line::styled(format!(" {}", projection.filter_line), style)),
        area,
    );

    if state.mode() == Mode::TextEntry {
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(query_cursor_column(state))
            .min(area.right().saturating_sub(1));
        frame.set_cursor_position((x, area.y));
    }
}

/// Display width of the filter text in front of the text cursor.
fn query_cursor_column(state: &SessionState<'_>) -> u16 {
    if state.query().is_empty() {
        return 0;
    }
    let before_cursor: String = state.query().chars().take(state.query_cursor()).collect();
    let width = Line::from(format!("{FILTER_PREFIX}{before_cursor}")).width();
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn draw_task_list(
    frame: &mut Frame,
    state: &SessionState<'_>,
    projection: &Projection,
    list_state: &mut ListState,
    area: Rect,
) {
    if state.filtered_len() == 0 {
        frame.render_widget(
            Paragraph::new("No matching tasks").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let items: Vec<ListItem<'_>> = projection
        .rows
        .iter()
        .map(|row| {
            let lines: Vec<Line<'_>> = row
                .lines
                .iter()
                .map(|line| Line::from(line.as_str()))
                .collect();
            let style = if row.selected {
                Style::default()
                    .fg(Color::Indexed(170))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Indexed(252))
            };
            ListItem::new(Text::from(lines)).style(style)
        })
        .collect();

    // Selection only drives scrolling here; rows carry their own highlight.
    list_state.select(Some(state.cursor()));
    let list = List::new(items);

    frame.render_stateful_widget(list, area, list_state);
}
