//! The six operations of `ToDoService` and their store-backed implementation.
//!
//! # Design
//! [`ToDoService`] is the whole handler surface; transport bindings only see
//! this trait. [`ToDoHandlers`] implements it with one or two store calls per
//! operation and no locking, transactions or retries. Storage failures are
//! returned immediately as [`ServiceError`]s.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::context::CallContext;
use crate::error::{ServiceError, StoreError};
use crate::model::{NewToDo, Status, ToDoItem, TodoId};
use crate::store::{Arg, Store};

const SELECT_ALL: &str = "SELECT id, title, description, status, created_at FROM todos";
const SELECT_ONE: &str =
    "SELECT id, title, description, status, created_at FROM todos WHERE id = ?";
const INSERT: &str =
    "INSERT INTO todos (title, description, status) VALUES (?, ?, ?) RETURNING id, created_at";
const UPDATE: &str = "UPDATE todos SET title = ?, description = ?, status = ? WHERE id = ? \
     RETURNING id, title, description, status, created_at";
const UPDATE_STATUS: &str = "UPDATE todos SET status = ? WHERE id = ?";
const DELETE: &str = "DELETE FROM todos WHERE id = ?";

/// The request/response contract of `greeter.ToDoService`.
#[async_trait]
pub trait ToDoService: Send + Sync + 'static {
    async fn get_all(&self, ctx: &CallContext) -> Result<Vec<ToDoItem>, ServiceError>;

    async fn get_one(&self, ctx: &CallContext, id: TodoId) -> Result<ToDoItem, ServiceError>;

    async fn create(&self, ctx: &CallContext, input: NewToDo) -> Result<ToDoItem, ServiceError>;

    async fn update(
        &self,
        ctx: &CallContext,
        id: TodoId,
        input: NewToDo,
    ) -> Result<ToDoItem, ServiceError>;

    async fn update_status(
        &self,
        ctx: &CallContext,
        id: TodoId,
        status: Status,
    ) -> Result<(), ServiceError>;

    async fn delete(&self, ctx: &CallContext, id: TodoId) -> Result<(), ServiceError>;
}

/// What `UpdateStatus` does when no row has the requested id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MissingRowPolicy {
    /// Succeed silently, as the service always has.
    #[default]
    Ignore,
    /// Fail with not-found, like Delete does.
    NotFound,
}

/// [`ToDoService`] backed by a [`Store`].
#[derive(Debug, Clone)]
pub struct ToDoHandlers {
    store: Store,
    missing_row: MissingRowPolicy,
}

impl ToDoHandlers {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            missing_row: MissingRowPolicy::default(),
        }
    }

    pub fn with_missing_row_policy(mut self, policy: MissingRowPolicy) -> Self {
        self.missing_row = policy;
        self
    }
}

fn not_found(id: TodoId) -> ServiceError {
    ServiceError::NotFound(format!("todo with id {id} not found"))
}

#[async_trait]
impl ToDoService for ToDoHandlers {
    async fn get_all(&self, ctx: &CallContext) -> Result<Vec<ToDoItem>, ServiceError> {
        info!("fetching all todo items");
        let rows = self.store.query_rows(ctx, SELECT_ALL, &[]).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match ToDoItem::from_row(row) {
                Ok(item) => items.push(item),
                Err(e) => warn!(error = %e, "skipping todo row that failed to decode"),
            }
        }
        Ok(items)
    }

    async fn get_one(&self, ctx: &CallContext, id: TodoId) -> Result<ToDoItem, ServiceError> {
        info!(id, "fetching todo item");
        let row = self
            .store
            .query_row(ctx, SELECT_ONE, &[Arg::Int(id)])
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(ToDoItem::from_row(&row).map_err(StoreError::from)?)
    }

    async fn create(&self, ctx: &CallContext, input: NewToDo) -> Result<ToDoItem, ServiceError> {
        info!(
            title = %input.title,
            description = %input.description,
            status = input.status.as_str_name(),
            "creating todo item"
        );
        input.validate()?;
        let args = [
            Arg::from(input.title.as_str()),
            Arg::from(input.description.as_str()),
            Arg::from(input.status as i32),
        ];
        let row = match self.store.query_row(ctx, INSERT, &args).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(ServiceError::Internal("insert returned no row".into()));
            }
            Err(e) => {
                warn!(error = %e, "failed to insert todo item");
                return Err(e.into());
            }
        };
        let (id, created_at) = decode_insert(&row).map_err(StoreError::from)?;
        Ok(ToDoItem {
            id,
            title: input.title,
            description: input.description,
            status: input.status,
            created_at,
        })
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: TodoId,
        input: NewToDo,
    ) -> Result<ToDoItem, ServiceError> {
        info!(id, "updating todo item");
        input.validate()?;
        let args = [
            Arg::from(input.title),
            Arg::from(input.description),
            Arg::from(input.status as i32),
            Arg::Int(id),
        ];
        let row = self
            .store
            .query_row(ctx, UPDATE, &args)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(ToDoItem::from_row(&row).map_err(StoreError::from)?)
    }

    async fn update_status(
        &self,
        ctx: &CallContext,
        id: TodoId,
        status: Status,
    ) -> Result<(), ServiceError> {
        info!(id, status = status.as_str_name(), "updating todo status");
        let affected = match self
            .store
            .exec(ctx, UPDATE_STATUS, &[Arg::from(status as i32), Arg::Int(id)])
            .await
        {
            Ok(affected) => affected,
            Err(StoreError::DeadlineExceeded) => return Err(StoreError::DeadlineExceeded.into()),
            Err(e) => return Err(ServiceError::Internal(format!("could not update: {e}"))),
        };
        if affected == 0 {
            match self.missing_row {
                MissingRowPolicy::Ignore => debug!(id, "status update matched no rows"),
                MissingRowPolicy::NotFound => return Err(not_found(id)),
            }
        }
        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, id: TodoId) -> Result<(), ServiceError> {
        info!(id, "deleting todo item");
        let affected = self.store.exec(ctx, DELETE, &[Arg::Int(id)]).await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn decode_insert(row: &SqliteRow) -> Result<(TodoId, DateTime<Utc>), sqlx::Error> {
    let id: TodoId = row.try_get("id")?;
    let created_at: NaiveDateTime = row.try_get("created_at")?;
    Ok((id, created_at.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn handlers() -> ToDoHandlers {
        ToDoHandlers::new(Store::in_memory().await.unwrap())
    }

    fn new_todo(title: &str, description: &str, status: Status) -> NewToDo {
        NewToDo {
            title: title.to_string(),
            description: description.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn create_then_get_all_round_trips() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let started = Utc::now();

        let created = svc
            .create(&ctx, new_todo("Buy milk", "2%", Status::Pending))
            .await
            .unwrap();
        assert!(created.id > 0);
        // CURRENT_TIMESTAMP has second resolution.
        assert!(created.created_at.timestamp() >= started.timestamp());

        let items = svc.get_all(&ctx).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], created);
        assert_eq!(items[0].title, "Buy milk");
        assert_eq!(items[0].description, "2%");
        assert_eq!(items[0].status, Status::Pending);
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() {
        let svc = Arc::new(handlers().await);
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move {
                    svc.create(
                        &CallContext::background(),
                        new_todo(&format!("item {i}"), "", Status::Pending),
                    )
                    .await
                    .unwrap()
                    .id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn created_at_never_decreases() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let mut last = None;
        for i in 0..5 {
            let item = svc
                .create(&ctx, new_todo(&format!("t{i}"), "", Status::Pending))
                .await
                .unwrap();
            if let Some(previous) = last {
                assert!(item.created_at >= previous);
            }
            last = Some(item.created_at);
        }
    }

    #[tokio::test]
    async fn delete_removes_then_reports_not_found() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let item = svc
            .create(&ctx, new_todo("Walk dog", "", Status::Pending))
            .await
            .unwrap();

        svc.delete(&ctx, item.id).await.unwrap();
        assert!(svc.get_all(&ctx).await.unwrap().is_empty());

        let err = svc.delete(&ctx, item.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_status_changes_only_status() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let item = svc
            .create(&ctx, new_todo("Read", "chapter 3", Status::Pending))
            .await
            .unwrap();

        svc.update_status(&ctx, item.id, Status::Done).await.unwrap();

        let after = svc.get_one(&ctx, item.id).await.unwrap();
        assert_eq!(after.status, Status::Done);
        assert_eq!(after.title, item.title);
        assert_eq!(after.description, item.description);
        assert_eq!(after.created_at, item.created_at);
    }

    #[tokio::test]
    async fn update_status_on_missing_id_succeeds_by_default() {
        let svc = handlers().await;
        svc.update_status(&CallContext::background(), 12345, Status::InProgress)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_status_on_missing_id_fails_when_strict() {
        let svc = handlers()
            .await
            .with_missing_row_policy(MissingRowPolicy::NotFound);
        let err = svc
            .update_status(&CallContext::background(), 12345, Status::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_one_finds_and_misses() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let item = svc
            .create(&ctx, new_todo("One", "", Status::InProgress))
            .await
            .unwrap();

        assert_eq!(svc.get_one(&ctx, item.id).await.unwrap(), item);
        let err = svc.get_one(&ctx, item.id + 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_rewrites_mutable_fields() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let item = svc
            .create(&ctx, new_todo("Draft", "v1", Status::Pending))
            .await
            .unwrap();

        let updated = svc
            .update(&ctx, item.id, new_todo("Final", "v2", Status::Done))
            .await
            .unwrap();
        assert_eq!(updated.id, item.id);
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, "v2");
        assert_eq!(updated.status, Status::Done);
        assert_eq!(updated.created_at, item.created_at);
        assert_eq!(svc.get_one(&ctx, item.id).await.unwrap(), updated);

        let err = svc
            .update(&ctx, item.id + 100, new_todo("x", "", Status::Done))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_titles_are_rejected() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        let err = svc
            .create(&ctx, new_todo("", "no title", Status::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(svc.get_all(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_lists_every_item_once() {
        let svc = handlers().await;
        let ctx = CallContext::background();
        for title in ["A", "B", "C"] {
            svc.create(&ctx, new_todo(title, "", Status::Pending))
                .await
                .unwrap();
        }
        let mut titles: Vec<String> = svc
            .get_all(&ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn get_all_skips_rows_that_fail_to_decode() {
        let store = Store::in_memory().await.unwrap();
        let svc = ToDoHandlers::new(store.clone());
        let ctx = CallContext::background();
        svc.create(&ctx, new_todo("good", "", Status::Pending))
            .await
            .unwrap();
        store
            .exec(
                &ctx,
                "INSERT INTO todos (title, description, status) VALUES ('bad status', '', 99)",
                &[],
            )
            .await
            .unwrap();
        store
            .exec(
                &ctx,
                "INSERT INTO todos (title, description, status, created_at) \
                 VALUES ('bad time', '', 0, 'not a time')",
                &[],
            )
            .await
            .unwrap();

        let items = svc.get_all(&ctx).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "good");
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_storage_error() {
        let store = Store::in_memory().await.unwrap();
        let svc = ToDoHandlers::new(store.clone());
        let ctx = CallContext::background();
        store.exec(&ctx, "DROP TABLE todos", &[]).await.unwrap();

        let err = svc.get_all(&ctx).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));

        let err = svc.update_status(&ctx, 1, Status::Done).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
