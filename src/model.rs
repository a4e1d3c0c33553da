use std::ops::Index;

use anyhow::{Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub name: String,
    pub description: String,
    pub commands: Vec<String>,
}

impl TaskRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }
}

/// The tasks of one session, in the order the Taskfile declared them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRegistry {
    tasks: Vec<TaskRecord>,
}

impl TaskRegistry {
    pub fn new(tasks: Vec<TaskRecord>) -> Result<Self> {
        if tasks.is_empty() {
            bail!("task registry cannot be empty");
        }
        if tasks.iter().any(|task| task.name.is_empty()) {
            bail!("task names cannot be empty");
        }
        for (index, task) in tasks.iter().enumerate() {
            if tasks[..index].iter().any(|other| other.name == task.name) {
                bail!("task '{}' is defined more than once", task.name);
            }
        }
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn as_slice(&self) -> &[TaskRecord] {
        &self.tasks
    }
}

impl Index<usize> for TaskRegistry {
    type Output = TaskRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tasks[index]
    }
}
