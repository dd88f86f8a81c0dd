use crate::database::Database;
use futures_util::TryStreamExt;
use punchclock_common::api::PendingEvent;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use time::OffsetDateTime;
use tracing::debug;

fn to_nanos(value: OffsetDateTime) -> sqlx::Result<i64> {
    i64::try_from(value.unix_timestamp_nanos())
        .map_err(|_| sqlx::Error::Encode(format!("timestamp {value} out of range").into()))
}

fn from_nanos(value: i64) -> sqlx::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(value as i128)
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

/// A pending event together with its position in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub id: i64,
    pub event: PendingEvent,
}

struct DbQueuedEvent(QueuedEvent);

impl<'r> FromRow<'r, SqliteRow> for DbQueuedEvent {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(QueuedEvent {
            id: row.try_get("id")?,
            event: PendingEvent {
                human_employee_id: row.try_get("human_employee_id")?,
                human_terminal_id: row.try_get("human_terminal_id")?,
                clock_in: row
                    .try_get::<Option<i64>, _>("clock_in")?
                    .map(from_nanos)
                    .transpose()?,
                clock_out: row
                    .try_get::<Option<i64>, _>("clock_out")?
                    .map(from_nanos)
                    .transpose()?,
                notes: row.try_get("notes")?,
                captured_at: from_nanos(row.try_get("captured_at")?)?,
            },
        }))
    }
}

/// Durable append log of clock events waiting to be reconciled.
///
/// Rows are never updated. The autoincrement id is the insertion order and is the only
/// handle used to acknowledge events.
#[derive(Clone)]
pub struct EventQueue {
    pool: SqlitePool,
}

impl EventQueue {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    pub async fn append(&self, event: &PendingEvent) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            insert into pending_events(
                human_employee_id, human_terminal_id, clock_in, clock_out, notes,
                captured_at, queued_at
            )
            values(?1, ?2, ?3, ?4, ?5, ?6, ?7)
            returning id
            "#,
        )
        .bind(event.human_employee_id.as_str())
        .bind(event.human_terminal_id.as_deref())
        .bind(event.clock_in.map(to_nanos).transpose()?)
        .bind(event.clock_out.map(to_nanos).transpose()?)
        .bind(event.notes.as_deref())
        .bind(to_nanos(event.captured_at)?)
        .bind(to_nanos(OffsetDateTime::now_utc())?)
        .fetch_one(&self.pool)
        .await?;

        debug!("queued event {id} for {}", event.human_employee_id);
        Ok(id)
    }

    pub async fn peek_all(&self) -> Result<Vec<QueuedEvent>, sqlx::Error> {
        sqlx::query_as("select * from pending_events order by id asc")
            .fetch(&self.pool)
            .map_ok(|DbQueuedEvent(event)| event)
            .try_collect()
            .await
    }

    pub async fn remove_acknowledged(&self, ids: &[i64]) -> Result<(), sqlx::Error> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("delete from pending_events where id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("removed {} acknowledged events", ids.len());
        Ok(())
    }

    /// Only drives the "N pending" indicator.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let res: (i64,) = sqlx::query_as("select count(1) from pending_events")
            .fetch_one(&self.pool)
            .await?;

        Ok(res.0)
    }
}
