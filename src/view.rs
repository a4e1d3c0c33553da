use crate::state::{Mode, SessionState};

pub const DEFAULT_PLACEHOLDER: &str = "Type to filter tasks...";
pub const FILTER_PREFIX: &str = "Filter: ";

const TEXT_ENTRY_HELP: &str =
    "↑/↓: navigate • esc: browse • enter: select • ctrl+c: quit";
const NAVIGATION_HELP: &str =
    "↑/↓: navigate • →: toggle details • ←: hide details • /: filter • enter: select • q: quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub lines: Vec<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub filter_line: String,
    pub rows: Vec<TaskRow>,
    pub help_line: String,
}

impl Projection {
    /// Flattens the projection into display lines, top to bottom.
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.filter_line.clone());
        for row in &self.rows {
            lines.extend(row.lines.iter().cloned());
        }
        lines.push(self.help_line.clone());
        lines
    }
}

pub fn render(state: &SessionState<'_>, placeholder: &str) -> Projection {
    let filter_line = if state.query().is_empty() {
        placeholder.to_string()
    } else {
        format!("{FILTER_PREFIX}{}", state.query())
    };

    let detail = state.detail_level();
    let rows = state
        .filtered()
        .enumerate()
        .map(|(index, task)| {
            let selected = index == state.cursor();
            let mut first = task.name.clone();
            if selected && detail.shows_description() && !task.description.is_empty() {
                first.push_str(" - ");
                first.push_str(&task.description);
            }

            let mut lines = vec![first];
            if selected && detail.shows_commands() && !task.commands.is_empty() {
                lines.push("  cmds:".to_string());
                lines.extend(task.commands.iter().map(|command| format!("    - {command}")));
            }

            TaskRow { lines, selected }
        })
        .collect();

    let help_line = match state.mode() {
        Mode::TextEntry => TEXT_ENTRY_HELP,
        Mode::Navigation => NAVIGATION_HELP,
    }
    .to_string();

    Projection {
        filter_line,
        rows,
        help_line,
    }
}
