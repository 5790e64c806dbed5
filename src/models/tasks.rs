// src/models/tasks.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::not_blank;
use crate::models::{Collection, Patchable, Record, dashboard::DashboardData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub account_id: Uuid,
    pub task: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTask {
    #[validate(custom(function = "not_blank", message = "A descrição da tarefa é obrigatória."))]
    pub task: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub task: Option<String>,
    // `Some(None)` limpa a data
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

impl Patchable<Task> for TaskPatch {
    fn apply(&self, task: &mut Task) {
        if let Some(text) = &self.task {
            task.task = text.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }

    fn revert(&self, task: &mut Task, snapshot: &Task) {
        if self.task.is_some() {
            task.task = snapshot.task.clone();
        }
        if self.due_date.is_some() {
            task.due_date = snapshot.due_date;
        }
        if self.completed.is_some() {
            task.completed = snapshot.completed;
        }
    }
}

impl Record for Task {
    type New = NewTask;
    type Patch = TaskPatch;

    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> Uuid {
        self.id
    }

    fn rows(data: &DashboardData) -> &Vec<Self> {
        &data.tasks
    }

    fn rows_mut(data: &mut DashboardData) -> &mut Vec<Self> {
        &mut data.tasks
    }
}
