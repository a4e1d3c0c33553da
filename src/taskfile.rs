use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::config::TaskfileConfig;
use crate::model::TaskRecord;

#[derive(Debug, Clone)]
pub struct LoadedTaskfile {
    pub path: PathBuf,
    pub tasks: Vec<TaskRecord>,
}

pub fn load(cwd: &Path, config: &TaskfileConfig) -> Result<LoadedTaskfile> {
    let path = match &config.path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => cwd.join(path),
        None => discover(cwd, &config.names).with_context(|| {
            format!("no Taskfile found (looked for {})", config.names.join(", "))
        })?,
    };

    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let tasks = parse_tasks(&content, config.include_internal)
        .with_context(|| format!("invalid Taskfile {}", path.display()))?;
    if tasks.is_empty() {
        bail!(
            "no tasks found in {}. Please make sure your Taskfile has tasks defined.",
            path.display()
        );
    }

    info!(path = %path.display(), task_count = tasks.len(), "loaded taskfile");
    Ok(LoadedTaskfile { path, tasks })
}

fn discover(start: &Path, names: &[String]) -> Option<PathBuf> {
    for dir in start.ancestors() {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

pub fn parse_tasks(raw: &str, include_internal: bool) -> Result<Vec<TaskRecord>> {
    let document: Value = serde_yaml::from_str(raw).context("invalid YAML")?;
    let Some(tasks) = document.get("tasks") else {
        return Ok(Vec::new());
    };
    let Some(tasks) = tasks.as_mapping() else {
        bail!("`tasks` must be a mapping of task names to definitions");
    };

    let mut records = Vec::new();
    for (key, definition) in tasks {
        let Some(name) = scalar_to_string(key) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        if !include_internal && is_internal(definition) {
            debug!(task = %name, "skipping internal task");
            continue;
        }

        records.push(task_from_definition(name, definition));
    }

    Ok(records)
}

fn task_from_definition(name: String, definition: &Value) -> TaskRecord {
    match definition {
        Value::String(command) => TaskRecord::new(name).with_commands([command.clone()]),
        Value::Sequence(items) => TaskRecord::new(name).with_commands(commands_from_items(items)),
        Value::Mapping(details) => TaskRecord::new(name)
            .with_description(description_of(details))
            .with_commands(commands_of(details)),
        _ => TaskRecord::new(name),
    }
}

fn description_of(details: &Mapping) -> String {
    ["desc", "summary"]
        .iter()
        .find_map(|key| details.get(*key).and_then(Value::as_str))
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn commands_of(details: &Mapping) -> Vec<String> {
    if let Some(items) = details.get("cmds").and_then(Value::as_sequence) {
        return commands_from_items(items);
    }
    details
        .get("cmd")
        .and_then(Value::as_str)
        .map(|command| vec![command.to_string()])
        .unwrap_or_default()
}

fn commands_from_items(items: &[Value]) -> Vec<String> {
    items.iter().filter_map(command_from_item).collect()
}

fn command_from_item(item: &Value) -> Option<String> {
    match item {
        Value::String(command) => Some(command.clone()),
        Value::Mapping(entry) => {
            if let Some(command) = entry.get("cmd").and_then(Value::as_str) {
                return Some(command.to_string());
            }
            entry
                .get("task")
                .and_then(Value::as_str)
                .map(|task| format!("task: {task}"))
        }
        _ => None,
    }
}

fn is_internal(definition: &Value) -> bool {
    definition
        .get("internal")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
