//! Caller-facing to-do types.
//!
//! # Design
//! The wire messages nest the editable fields under `item` and carry the
//! status as a raw enum number; these types flatten that and validate the
//! status once, at the parse boundary.

use chrono::{DateTime, Utc};

use crate::error::ApiError;

pub use todo_proto::Status;

/// A stored to-do item as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields supplied to Create and Update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoInput {
    pub title: String,
    pub description: String,
    pub status: Status,
}

impl TodoInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: Status::Pending,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

impl From<&TodoInput> for todo_proto::ToDoDetails {
    fn from(input: &TodoInput) -> Self {
        todo_proto::ToDoDetails {
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status as i32,
        }
    }
}

impl TryFrom<todo_proto::ToDoItem> for Todo {
    type Error = ApiError;

    fn try_from(item: todo_proto::ToDoItem) -> Result<Self, Self::Error> {
        let details = item.item.unwrap_or_default();
        let status = Status::try_from(details.status)
            .map_err(|_| ApiError::Decode(format!("unknown status {}", details.status)))?;
        Ok(Todo {
            id: item.id,
            title: details.title,
            description: details.description,
            status,
            created_at: item
                .created_at
                .and_then(|ts| todo_proto::timestamp::to_datetime(&ts)),
        })
    }
}
