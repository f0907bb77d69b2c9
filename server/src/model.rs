//! Domain types for to-do items and their wire conversions.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::ServiceError;

pub use todo_proto::Status;

pub type TodoId = i64;

/// A stored to-do item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToDoItem {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// The mutable fields, as supplied to Create and Update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToDo {
    pub title: String,
    pub description: String,
    pub status: Status,
}

impl NewToDo {
    /// Rejects blank titles.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.title.trim().is_empty() {
            return Err(ServiceError::Validation("title must not be empty".into()));
        }
        Ok(())
    }
}

impl TryFrom<Option<todo_proto::ToDoDetails>> for NewToDo {
    type Error = ServiceError;

    fn try_from(details: Option<todo_proto::ToDoDetails>) -> Result<Self, Self::Error> {
        let details =
            details.ok_or_else(|| ServiceError::Validation("item is required".into()))?;
        Ok(NewToDo {
            status: parse_status(details.status)?,
            title: details.title,
            description: details.description,
        })
    }
}

/// Maps a wire enum value onto [`Status`], rejecting values outside it.
pub fn parse_status(value: i32) -> Result<Status, ServiceError> {
    Status::try_from(value).map_err(|_| ServiceError::Validation(format!("unknown status {value}")))
}

impl ToDoItem {
    /// Decodes a row selected as `id, title, description, status, created_at`.
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: i32 = row.try_get("status")?;
        let status = Status::try_from(status).map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: Box::new(e),
        })?;
        let created_at: NaiveDateTime = row.try_get("created_at")?;
        Ok(ToDoItem {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status,
            created_at: created_at.and_utc(),
        })
    }
}

impl From<ToDoItem> for todo_proto::ToDoItem {
    fn from(item: ToDoItem) -> Self {
        todo_proto::ToDoItem {
            id: item.id,
            item: Some(todo_proto::ToDoDetails {
                title: item.title,
                description: item.description,
                status: item.status as i32,
            }),
            created_at: Some(todo_proto::timestamp::from_datetime(item.created_at)),
        }
    }
}
