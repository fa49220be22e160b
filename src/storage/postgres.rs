// SPDX-License-Identifier: MIT
//! PostgreSQL-backed task store.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::config::DatabaseConfig;
use crate::tasks::model::{NewTask, Task, TaskChanges, TaskStatus};

/// Row shape of the `tasks` table. The status column is decoded into the
/// model enum after the fetch so a bad value fails loudly instead of
/// deserializing into garbage.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Task, StoreError> {
        let status = TaskStatus::from_name(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", row.status)))?;
        Ok(Task {
            id: row.id,
            name: row.name,
            description: row.description,
            status,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Duplicate
    } else {
        StoreError::Database(err)
    }
}

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    /// Connect and run pending migrations.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        Self::connect_with_slow_query(cfg, 0).await
    }

    /// Connect with slow statement logging enabled.
    /// Statements slower than `slow_query_ms` are logged at WARN level.
    /// Pass 0 to disable.
    pub async fn connect_with_slow_query(cfg: &DatabaseConfig, slow_query_ms: u64) -> Result<Self> {
        let mut opts = match &cfg.url {
            Some(url) => PgConnectOptions::from_str(url).context("invalid DATABASE_URL")?,
            None => PgConnectOptions::new()
                .host(&cfg.host)
                .port(cfg.port)
                .username(&cfg.user)
                .password(&cfg.password)
                .database(&cfg.database),
        };

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                Duration::from_millis(slow_query_ms),
            );
        }

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_with(opts)
            .await
            .context("failed to connect to PostgreSQL")?;

        sqlx::migrate!("src/storage/migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Ok(Self { pool })
    }

    /// Close the pool. Called once at shutdown so in-flight statements finish
    /// before the process exits.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, new: NewTask) -> Result<Task, StoreError> {
        let row: TaskRow = sqlx::query_as(
            "INSERT INTO tasks (id, name, description, status) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, description, status",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.try_into()
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> =
            sqlx::query_as("SELECT id, name, description, status FROM tasks WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Task::try_from).transpose()
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT id, name, description, status FROM tasks ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn update_by_name(
        &self,
        name: &str,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        // One statement for any combination of set fields. Absent fields keep
        // their stored value; description goes through a set-flag pair so a
        // replace can write NULL on purpose.
        let row: Option<TaskRow> = sqlx::query_as(
            "UPDATE tasks SET \
                name = COALESCE($2, name), \
                description = CASE WHEN $3 THEN $4 ELSE description END, \
                status = COALESCE($5, status) \
             WHERE name = $1 \
             RETURNING id, name, description, status",
        )
        .bind(name)
        .bind(&changes.name)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.map(Task::try_from).transpose()
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> = sqlx::query_as(
            "DELETE FROM tasks WHERE name = $1 RETURNING id, name, description, status",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }
}
