//! The active category and everything loaded for it.
//!
//! A [`Session`] owns the storage backend. Switching category drops the
//! in-memory task and title-history collections and reloads both from storage,
//! so nothing from one category can leak into another.

use tracing::{debug, info};

use crate::history::TitleHistory;
use crate::storage::KeyValueStore;
use crate::task::{Priority, Task};
use crate::task_store::{Rejection, TaskStore};
use crate::theme::{self, Theme};
use crate::view::{self, Board, Counts};

pub const DEFAULT_CATEGORY: &str = "dcard";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Closed,
    Editing {
        task_id: String,
    },
}

/// Field values shown when the edit dialog opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub task_id: String,
    pub title: String,
    pub due_date: String,
    pub priority: Priority,
}

#[derive(Debug)]
pub struct Session<S: KeyValueStore> {
    storage: S,
    category: String,
    tasks: TaskStore,
    history: TitleHistory,
    edit: EditState,
    theme: Theme,
}

impl<S: KeyValueStore> Session<S> {
    #[tracing::instrument(skip(storage))]
    pub fn open(storage: S, category: &str) -> Self {
        let tasks = TaskStore::load(&storage, category);
        let history = TitleHistory::load(&storage, category);
        let theme = theme::load_theme(&storage);
        info!(category, tasks = tasks.all().len(), %theme, "session opened");
        Self {
            storage,
            category: category.to_string(),
            tasks,
            history,
            edit: EditState::Closed,
            theme,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    #[tracing::instrument(skip(self), fields(from = %self.category))]
    pub fn switch_to(&mut self, category: &str) {
        self.tasks = TaskStore::load(&self.storage, category);
        self.history = TitleHistory::load(&self.storage, category);
        self.category = category.to_string();
        self.edit = EditState::Closed;
        info!(to = category, tasks = self.tasks.all().len(), "switched category");
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.all()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn add(
        &mut self,
        title: &str,
        due_date: &str,
        priority: Priority,
    ) -> Result<Task, Rejection> {
        self.tasks
            .add(&mut self.storage, &mut self.history, title, due_date, priority)
    }

    pub fn update(
        &mut self,
        id: &str,
        title: &str,
        due_date: &str,
        priority: Priority,
    ) -> Result<Option<Task>, Rejection> {
        self.tasks.update(
            &mut self.storage,
            &mut self.history,
            id,
            title,
            due_date,
            priority,
        )
    }

    pub fn set_done(&mut self, id: &str, done: bool) -> bool {
        self.tasks.set_done(&mut self.storage, id, done)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.tasks.remove(&mut self.storage, id);
        if matches!(&self.edit, EditState::Editing { task_id } if task_id == id) {
            debug!("closing editor for removed task");
            self.edit = EditState::Closed;
        }
        removed
    }

    pub fn board(&self, today: &str) -> Board {
        view::classify(self.tasks.all(), today)
    }

    pub fn counts(&self, today: &str) -> Counts {
        view::counts(self.tasks.all(), today)
    }

    pub fn suggestions(&self, filter: &str) -> Vec<String> {
        self.history.suggestions(filter)
    }

    pub fn title_history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    /// Opens the editor on `id`. Unknown ids leave it closed.
    pub fn open_edit(&mut self, id: &str) -> Option<EditDraft> {
        let task = self.tasks.get(id)?;
        let draft = EditDraft {
            task_id: task.id.clone(),
            title: task.title.clone(),
            due_date: task.due_date.clone(),
            priority: task.priority,
        };
        self.edit = EditState::Editing {
            task_id: draft.task_id.clone(),
        };
        Some(draft)
    }

    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Closed;
    }

    /// Applies the editor's values. The editor stays open when the input is
    /// rejected and closes once the update goes through.
    pub fn save_edit(
        &mut self,
        title: &str,
        due_date: &str,
        priority: Priority,
    ) -> Result<Option<Task>, Rejection> {
        let EditState::Editing { task_id } = &self.edit else {
            return Ok(None);
        };
        let task_id = task_id.clone();

        let updated = self.update(&task_id, title, due_date, priority)?;
        if updated.is_some() {
            self.edit = EditState::Closed;
        }
        Ok(updated)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        theme::save_theme(&mut self.storage, theme);
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme.toggled();
        self.set_theme(next);
        next
    }
}
