use thiserror::Error;
use tracing::{debug, error, info};

use crate::history::TitleHistory;
use crate::storage::{KeyValueStore, decode_tasks, encode_tasks, tasks_key};
use crate::task::{Priority, Task};

/// Input that cannot become a task. Nothing is mutated or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("task title is empty")]
    EmptyTitle,
    #[error("task due date is empty")]
    EmptyDueDate,
}

fn validate(title: &str, due_date: &str) -> Result<(String, String), Rejection> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Rejection::EmptyTitle);
    }
    let due_date = due_date.trim();
    if due_date.is_empty() {
        return Err(Rejection::EmptyDueDate);
    }
    Ok((title.to_string(), due_date.to_string()))
}

/// Tasks of one category. Every mutation rewrites the whole collection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    category: String,
    tasks: Vec<Task>,
}

impl TaskStore {
    #[tracing::instrument(skip(storage))]
    pub fn load<S: KeyValueStore + ?Sized>(storage: &S, category: &str) -> Self {
        let raw = storage.load(&tasks_key(category));
        let tasks = decode_tasks(raw.as_deref());
        debug!(count = tasks.len(), "loaded tasks");
        Self {
            category: category.to_string(),
            tasks,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[tracing::instrument(skip(self, storage, history), fields(category = %self.category))]
    pub fn add<S: KeyValueStore + ?Sized>(
        &mut self,
        storage: &mut S,
        history: &mut TitleHistory,
        title: &str,
        due_date: &str,
        priority: Priority,
    ) -> Result<Task, Rejection> {
        let (title, due_date) = validate(title, due_date)?;

        let task = Task::new_pending(title, due_date, priority);
        info!(id = %task.id, due = %task.due_date, "adding task");
        self.tasks.push(task.clone());
        self.persist(storage);
        history.push(storage, &task.title);
        Ok(task)
    }

    /// `Ok(None)` when no task has `id`.
    #[tracing::instrument(skip(self, storage, history), fields(category = %self.category))]
    pub fn update<S: KeyValueStore + ?Sized>(
        &mut self,
        storage: &mut S,
        history: &mut TitleHistory,
        id: &str,
        title: &str,
        due_date: &str,
        priority: Priority,
    ) -> Result<Option<Task>, Rejection> {
        let (title, due_date) = validate(title, due_date)?;

        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("task not found; nothing to update");
            return Ok(None);
        };
        task.title = title;
        task.due_date = due_date;
        task.priority = priority;
        let updated = task.clone();

        self.persist(storage);
        history.push(storage, &updated.title);
        Ok(Some(updated))
    }

    /// Returns whether a task with `id` exists.
    #[tracing::instrument(skip(self, storage), fields(category = %self.category))]
    pub fn set_done<S: KeyValueStore + ?Sized>(
        &mut self,
        storage: &mut S,
        id: &str,
        done: bool,
    ) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("task not found; nothing to mark");
            return false;
        };
        task.done = done;
        self.persist(storage);
        true
    }

    /// Returns whether a task was removed. The collection is written either way.
    #[tracing::instrument(skip(self, storage), fields(category = %self.category))]
    pub fn remove<S: KeyValueStore + ?Sized>(&mut self, storage: &mut S, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        self.persist(storage);
        removed
    }

    fn persist<S: KeyValueStore + ?Sized>(&self, storage: &mut S) {
        let key = tasks_key(&self.category);
        let result = encode_tasks(&self.tasks).and_then(|raw| storage.save(&key, &raw));
        if let Err(err) = result {
            error!(key = %key, error = %err, "failed saving tasks");
        }
    }
}
