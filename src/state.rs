use tracing::debug;

use crate::filter::filter_indices;
use crate::model::{TaskRecord, TaskRegistry};

pub const DEFAULT_QUERY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    TextEntry,
    Navigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    #[default]
    None,
    Description,
    DescriptionAndCommands,
}

impl DetailLevel {
    pub fn advance(self) -> Self {
        match self {
            DetailLevel::None => DetailLevel::Description,
            DetailLevel::Description => DetailLevel::DescriptionAndCommands,
            DetailLevel::DescriptionAndCommands => DetailLevel::None,
        }
    }

    pub fn shows_description(self) -> bool {
        !matches!(self, DetailLevel::None)
    }

    pub fn shows_commands(self) -> bool {
        matches!(self, DetailLevel::DescriptionAndCommands)
    }
}

/// Terminal-independent key events. `Cancel` is ctrl-c.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Enter,
    Esc,
    Cancel,
    Backspace,
    Delete,
    DeleteWord,
    ClearToStart,
    Char(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Run(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState<'a> {
    registry: &'a TaskRegistry,
    query_limit: usize,
    mode: Mode,
    query: String,
    query_cursor: usize,
    filtered: Vec<usize>,
    cursor: usize,
    detail: DetailLevel,
    terminal: bool,
}

impl<'a> SessionState<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self::with_query_limit(registry, DEFAULT_QUERY_LIMIT)
    }

    pub fn with_query_limit(registry: &'a TaskRegistry, query_limit: usize) -> Self {
        Self {
            registry,
            query_limit: query_limit.max(1),
            mode: Mode::TextEntry,
            query: String::new(),
            query_cursor: 0,
            filtered: (0..registry.len()).collect(),
            cursor: 0,
            detail: DetailLevel::None,
            terminal: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Text cursor position inside the query, in characters.
    pub fn query_cursor(&self) -> usize {
        self.query_cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail
    }

    #[cfg(test)]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered(&self) -> impl Iterator<Item = &'a TaskRecord> + '_ {
        let registry = self.registry;
        self.filtered.iter().map(move |&index| &registry[index])
    }

    pub fn selected(&self) -> Option<&'a TaskRecord> {
        let registry = self.registry;
        self.filtered.get(self.cursor).map(|&index| &registry[index])
    }

    pub fn handle(&mut self, key: Key) -> Action {
        if self.terminal {
            return Action::None;
        }

        match self.mode {
            Mode::TextEntry => self.on_text_entry_key(key),
            Mode::Navigation => self.on_navigation_key(key),
        }
    }

    fn on_text_entry_key(&mut self, key: Key) -> Action {
        match key {
            Key::Cancel => self.quit(),
            Key::Esc => {
                self.mode = Mode::Navigation;
                Action::None
            }
            Key::Enter => self.confirm(),
            Key::Up => {
                self.move_selection(-1);
                Action::None
            }
            Key::Down => {
                self.move_selection(1);
                Action::None
            }
            Key::Left => {
                self.query_cursor = self.query_cursor.saturating_sub(1);
                Action::None
            }
            Key::Right => {
                self.query_cursor = (self.query_cursor + 1).min(self.query.chars().count());
                Action::None
            }
            Key::Home => {
                self.query_cursor = 0;
                Action::None
            }
            Key::End => {
                self.query_cursor = self.query.chars().count();
                Action::None
            }
            Key::Backspace => {
                if self.query_cursor > 0 && remove_char_at(&mut self.query, self.query_cursor - 1)
                {
                    self.query_cursor -= 1;
                    self.refresh_filtered();
                }
                Action::None
            }
            Key::Delete => {
                if remove_char_at(&mut self.query, self.query_cursor) {
                    self.refresh_filtered();
                }
                Action::None
            }
            Key::DeleteWord => {
                let start = word_start_before(&self.query, self.query_cursor);
                if start < self.query_cursor {
                    remove_char_range(&mut self.query, start, self.query_cursor);
                    self.query_cursor = start;
                    self.refresh_filtered();
                }
                Action::None
            }
            Key::ClearToStart => {
                if self.query_cursor > 0 {
                    remove_char_range(&mut self.query, 0, self.query_cursor);
                    self.query_cursor = 0;
                    self.refresh_filtered();
                }
                Action::None
            }
            Key::Char(ch) => {
                if self.query.chars().count() < self.query_limit {
                    insert_char_at(&mut self.query, self.query_cursor, ch);
                    self.query_cursor += 1;
                    self.refresh_filtered();
                }
                Action::None
            }
        }
    }

    fn on_navigation_key(&mut self, key: Key) -> Action {
        match key {
            Key::Cancel | Key::Esc | Key::Char('q') => self.quit(),
            Key::Enter => self.confirm(),
            Key::Right | Key::Char('l') => {
                self.detail = self.detail.advance();
                Action::None
            }
            Key::Left | Key::Char('h') => {
                self.detail = DetailLevel::None;
                Action::None
            }
            Key::Down | Key::Char('j') => {
                self.move_selection(1);
                Action::None
            }
            Key::Up | Key::Char('k') => {
                self.move_selection(-1);
                Action::None
            }
            Key::Char('/') => {
                self.mode = Mode::TextEntry;
                self.query_cursor = self.query.chars().count();
                Action::None
            }
            Key::Char(ch) => {
                self.mode = Mode::TextEntry;
                self.query = ch.to_string();
                self.query_cursor = 1;
                self.refresh_filtered();
                Action::None
            }
            Key::Home
            | Key::End
            | Key::Backspace
            | Key::Delete
            | Key::DeleteWord
            | Key::ClearToStart => Action::None,
        }
    }

    fn quit(&mut self) -> Action {
        self.terminal = true;
        Action::Quit
    }

    fn confirm(&mut self) -> Action {
        let Some(task) = self.selected() else {
            return Action::None;
        };
        self.terminal = true;
        Action::Run(task.name.clone())
    }

    fn move_selection(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            return;
        }

        let last = self.filtered.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    fn refresh_filtered(&mut self) {
        self.filtered = filter_indices(self.registry.as_slice(), &self.query);
        self.cursor = self.cursor.min(self.filtered.len().saturating_sub(1));
        debug!(
            query = %self.query,
            matches = self.filtered.len(),
            "filtered tasks"
        );
    }
}

fn insert_char_at(value: &mut String, char_index: usize, ch: char) {
    let byte_index = byte_index_for_char(value, char_index);
    value.insert(byte_index, ch);
}

fn remove_char_at(value: &mut String, char_index: usize) -> bool {
    let start = byte_index_for_char(value, char_index);
    if start >= value.len() {
        return false;
    }
    let end = byte_index_for_char(value, char_index + 1);
    value.replace_range(start..end, "");
    true
}

fn remove_char_range(value: &mut String, start_char: usize, end_char: usize) {
    let start = byte_index_for_char(value, start_char);
    let end = byte_index_for_char(value, end_char);
    value.replace_range(start..end, "");
}

fn word_start_before(value: &str, char_index: usize) -> usize {
    let chars: Vec<char> = value.chars().take(char_index).collect();
    let mut start = chars.len();
    while start > 0 && chars[start - 1].is_whitespace() {
        start -= 1;
    }
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    start
}

fn byte_index_for_char(value: &str, char_index: usize) -> usize {
    if char_index == 0 {
        return 0;
    }
    value
        .char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(value.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> TaskRegistry {
        TaskRegistry::new(names.iter().map(|name| TaskRecord::new(*name)).collect()).unwrap()
    }

    fn type_text(state: &mut SessionState<'_>, text: &str) {
        for ch in text.chars() {
            assert_eq!(state.handle(Key::Char(ch)), Action::None);
        }
    }

    fn visible(state: &SessionState<'_>) -> Vec<String> {
        state.filtered().map(|task| task.name.clone()).collect()
    }

    #[test]
    fn starts_in_text_entry_with_full_registry() {
        let tasks = registry(&["build", "test", "deploy"]);
        let state = SessionState::new(&tasks);

        assert_eq!(state.mode(), Mode::TextEntry);
        assert_eq!(state.query(), "");
        assert_eq!(visible(&state), vec!["build", "test", "deploy"]);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.detail_level(), DetailLevel::None);
        assert!(!state.is_terminal());
    }

    #[test]
    fn typing_ts_leaves_only_test() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);

        type_text(&mut state, "ts");
        assert_eq!(visible(&state), vec!["test"]);
    }

    #[test]
    fn escape_then_enter_runs_the_remaining_task() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);

        type_text(&mut state, "bui");
        assert_eq!(state.handle(Key::Esc), Action::None);
        assert_eq!(state.mode(), Mode::Navigation);
        assert_eq!(state.query(), "bui");

        assert_eq!(state.handle(Key::Enter), Action::Run("build".to_string()));
        assert!(state.is_terminal());
    }

    #[test]
    fn enter_in_text_entry_runs_the_task_under_cursor() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);

        state.handle(Key::Down);
        assert_eq!(state.handle(Key::Enter), Action::Run("test".to_string()));
    }

    #[test]
    fn confirming_an_empty_view_is_a_no_op() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "zzz");
        assert_eq!(state.filtered_len(), 0);

        let before = state.clone();
        assert_eq!(state.handle(Key::Enter), Action::None);
        assert_eq!(state, before);
        assert!(!state.is_terminal());

        state.handle(Key::Esc);
        let before = state.clone();
        assert_eq!(state.handle(Key::Enter), Action::None);
        assert_eq!(state, before);
    }

    #[test]
    fn ctrl_c_quits_from_either_mode() {
        let tasks = registry(&["build"]);
        let mut state = SessionState::new(&tasks);
        assert_eq!(state.handle(Key::Cancel), Action::Quit);
        assert!(state.is_terminal());

        let mut state = SessionState::new(&tasks);
        state.handle(Key::Esc);
        assert_eq!(state.handle(Key::Cancel), Action::Quit);
    }

    #[test]
    fn navigation_quit_keys() {
        let tasks = registry(&["build"]);
        for key in [Key::Esc, Key::Char('q')] {
            let mut state = SessionState::new(&tasks);
            state.handle(Key::Esc);
            assert_eq!(state.handle(key), Action::Quit);
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn q_is_filter_text_in_text_entry() {
        let tasks = registry(&["build", "quality"]);
        let mut state = SessionState::new(&tasks);
        assert_eq!(state.handle(Key::Char('q')), Action::None);
        assert_eq!(state.query(), "q");
        assert_eq!(visible(&state), vec!["quality"]);
    }

    #[test]
    fn terminal_state_ignores_further_keys() {
        let tasks = registry(&["build", "test"]);
        let mut state = SessionState::new(&tasks);
        state.handle(Key::Cancel);

        let before = state.clone();
        assert_eq!(state.handle(Key::Char('t')), Action::None);
        assert_eq!(state.handle(Key::Enter), Action::None);
        assert_eq!(state, before);
    }

    #[test]
    fn cursor_movement_is_clamped() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);
        state.handle(Key::Up);
        assert_eq!(state.cursor(), 0);

        state.handle(Key::Esc);
        for _ in 0..5 {
            state.handle(Key::Char('j'));
        }
        assert_eq!(state.cursor(), 2);
        assert_eq!(state.selected().unwrap().name, "deploy");

        state.handle(Key::Char('k'));
        state.handle(Key::Up);
        state.handle(Key::Up);
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn detail_level_cycles_back_to_none() {
        assert_eq!(
            DetailLevel::None.advance().advance().advance(),
            DetailLevel::None
        );

        let tasks = registry(&["build"]);
        let mut state = SessionState::new(&tasks);
        state.handle(Key::Esc);

        state.handle(Key::Right);
        assert_eq!(state.detail_level(), DetailLevel::Description);
        state.handle(Key::Char('l'));
        assert_eq!(state.detail_level(), DetailLevel::DescriptionAndCommands);
        state.handle(Key::Right);
        assert_eq!(state.detail_level(), DetailLevel::None);
    }

    #[test]
    fn collapse_resets_detail_unconditionally() {
        let tasks = registry(&["build"]);
        let mut state = SessionState::new(&tasks);
        state.handle(Key::Esc);
        state.handle(Key::Right);
        state.handle(Key::Right);

        state.handle(Key::Char('h'));
        assert_eq!(state.detail_level(), DetailLevel::None);
        state.handle(Key::Left);
        assert_eq!(state.detail_level(), DetailLevel::None);
    }

    #[test]
    fn detail_and_navigation_leave_query_alone() {
        let tasks = registry(&["build", "build:docker", "test"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "bu");
        state.handle(Key::Esc);

        for key in [Key::Right, Key::Down, Key::Left, Key::Up, Key::Char('l')] {
            state.handle(key);
            assert_eq!(state.query(), "bu");
        }
        assert_eq!(state.filtered_len(), 2);
    }

    #[test]
    fn slash_returns_to_text_entry_with_query_intact() {
        let tasks = registry(&["build", "test"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "te");
        state.handle(Key::Esc);

        state.handle(Key::Char('/'));
        assert_eq!(state.mode(), Mode::TextEntry);
        assert_eq!(state.query(), "te");
        state.handle(Key::Char('s'));
        assert_eq!(state.query(), "tes");
    }

    #[test]
    fn stray_character_in_navigation_starts_a_new_filter() {
        let tasks = registry(&["build", "test", "deploy"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "bui");
        state.handle(Key::Esc);

        state.handle(Key::Char('d'));
        assert_eq!(state.mode(), Mode::TextEntry);
        assert_eq!(state.query(), "d");
        assert_eq!(state.query_cursor(), 1);
        assert!(visible(&state).contains(&"deploy".to_string()));
    }

    #[test]
    fn unbound_navigation_keys_are_ignored() {
        let tasks = registry(&["build", "test"]);
        let mut state = SessionState::new(&tasks);
        state.handle(Key::Esc);
        let before = state.clone();

        for key in [Key::Backspace, Key::Delete, Key::Home, Key::End, Key::DeleteWord] {
            assert_eq!(state.handle(key), Action::None);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn cursor_is_clamped_when_the_view_shrinks() {
        let tasks = registry(&["alpha", "beta", "gamma", "delta"]);
        let mut state = SessionState::new(&tasks);
        for _ in 0..3 {
            state.handle(Key::Down);
        }
        assert_eq!(state.cursor(), 3);

        type_text(&mut state, "ta");
        assert!(state.filtered_len() > 0);
        assert!(state.cursor() < state.filtered_len());

        type_text(&mut state, "xx");
        assert_eq!(state.filtered_len(), 0);
        assert_eq!(state.cursor(), 0);
        assert!(state.selected().is_none());
        state.handle(Key::Down);
        state.handle(Key::Up);
        assert_eq!(state.cursor(), 0);

        state.handle(Key::Backspace);
        state.handle(Key::Backspace);
        assert!(state.cursor() < state.filtered_len());
    }

    #[test]
    fn cursor_stays_in_bounds_for_every_query() {
        let tasks = registry(&["build", "build:docker", "test", "test:unit", "deploy", "lint"]);
        let mut state = SessionState::new(&tasks);
        let script = [
            Key::Down,
            Key::Down,
            Key::Down,
            Key::Char('t'),
            Key::Down,
            Key::Char('u'),
            Key::Backspace,
            Key::Backspace,
            Key::Char('z'),
            Key::Backspace,
            Key::Char('d'),
            Key::Down,
        ];
        for key in script {
            state.handle(key);
            if state.filtered_len() > 0 {
                assert!(state.cursor() < state.filtered_len());
            } else {
                assert_eq!(state.cursor(), 0);
            }
        }
    }

    #[test]
    fn query_editing_follows_the_text_cursor() {
        let tasks = registry(&["build", "test"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "tst");
        state.handle(Key::Left);
        state.handle(Key::Left);
        state.handle(Key::Char('e'));
        assert_eq!(state.query(), "test");
        assert_eq!(state.query_cursor(), 2);

        state.handle(Key::Delete);
        assert_eq!(state.query(), "tet");
        state.handle(Key::Home);
        state.handle(Key::Backspace);
        assert_eq!(state.query(), "tet");
        state.handle(Key::End);
        state.handle(Key::Backspace);
        assert_eq!(state.query(), "te");
        assert_eq!(visible(&state), vec!["test"]);
    }

    #[test]
    fn word_and_line_deletion() {
        let tasks = registry(&["build"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "foo bar");
        state.handle(Key::DeleteWord);
        assert_eq!(state.query(), "foo ");
        state.handle(Key::ClearToStart);
        assert_eq!(state.query(), "");
        assert_eq!(state.filtered_len(), 1);
    }

    #[test]
    fn query_length_is_limited() {
        let tasks = registry(&["build"]);
        let mut state = SessionState::with_query_limit(&tasks, 3);
        type_text(&mut state, "buil");
        assert_eq!(state.query(), "bui");
        assert_eq!(state.query_cursor(), 3);
    }

    #[test]
    fn multibyte_characters_are_edited_by_character() {
        let tasks = registry(&["déploy"]);
        let mut state = SessionState::new(&tasks);
        type_text(&mut state, "dé");
        state.handle(Key::Backspace);
        assert_eq!(state.query(), "d");
        assert_eq!(visible(&state), vec!["déploy"]);
    }
}
