use crate::error::StoreError;
use crate::models::{
    AuditRecord, CanonicalEntry, Employee, EntryFilter, NewEmployee, NewEntry, NewTerminal,
    Terminal,
};
use crate::reconcile::{AuditSink, EntityDirectory, EventStore};
use async_trait::async_trait;
use eyre::{eyre, Result};
use futures_util::TryStreamExt;
use punchclock_common::domain::EventSource;
use sql_builder::{quote, SqlBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

// clock_in/clock_out/synced_at/created_at -> unix timestamp with nanoseconds so that the
// same instant always compares equal no matter how the client spelled it.

fn to_nanos(value: OffsetDateTime) -> sqlx::Result<i64> {
    i64::try_from(value.unix_timestamp_nanos())
        .map_err(|_| sqlx::Error::Encode(format!("timestamp {value} out of range").into()))
}

fn from_nanos(value: i64) -> sqlx::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(value as i128)
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

fn parse_uuid(value: &str) -> sqlx::Result<Uuid> {
    Uuid::parse_str(value).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub struct DbEntry(pub CanonicalEntry);

impl<'r> FromRow<'r, SqliteRow> for DbEntry {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(CanonicalEntry {
            id: parse_uuid(row.try_get("id")?)?,
            employee_ref: parse_uuid(row.try_get("employee_ref")?)?,
            terminal_ref: row
                .try_get::<Option<&str>, _>("terminal_ref")?
                .map(parse_uuid)
                .transpose()?,
            clock_in: from_nanos(row.try_get("clock_in")?)?,
            clock_out: row
                .try_get::<Option<i64>, _>("clock_out")?
                .map(from_nanos)
                .transpose()?,
            notes: row.try_get("notes")?,
            source: EventSource::from_str(row.try_get("source")?)
                .map_err(|err| sqlx::Error::Decode(err.into()))?,
            flagged: row.try_get("flagged")?,
            flag_reason: row.try_get("flag_reason")?,
            synced_at: row
                .try_get::<Option<i64>, _>("synced_at")?
                .map(from_nanos)
                .transpose()?,
        }))
    }
}

pub struct DbEmployee(pub Employee);

impl<'r> FromRow<'r, SqliteRow> for DbEmployee {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(Employee {
            id: parse_uuid(row.try_get("id")?)?,
            employee_code: row.try_get("employee_code")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            department: row.try_get("department")?,
        }))
    }
}

pub struct DbTerminal(pub Terminal);

impl<'r> FromRow<'r, SqliteRow> for DbTerminal {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(Terminal {
            id: parse_uuid(row.try_get("id")?)?,
            terminal_code: row.try_get("terminal_code")?,
            name: row.try_get("name")?,
            location: row.try_get("location")?,
        }))
    }
}

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening database at {:?}", path);
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs_err::create_dir_all(dir)?;
            }
        }

        // WAL plus a busy timeout lets many devices sync at the same time.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::setup_db(&pool).await?;

        Ok(Self { pool })
    }

    async fn setup_db(pool: &SqlitePool) -> Result<()> {
        debug!("setting up database");
        sqlx::migrate!("./migrations").run(pool).await?;

        Ok(())
    }

    pub async fn add_employee(&self, employee: NewEmployee) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            insert into employees(id, employee_code, first_name, last_name, department, created_at)
            values(?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(id.to_string())
        .bind(employee.employee_code)
        .bind(employee.first_name)
        .bind(employee.last_name)
        .bind(employee.department)
        .bind(to_nanos(OffsetDateTime::now_utc())?)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn add_terminal(&self, terminal: NewTerminal) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            insert into terminals(id, terminal_code, name, location, created_at)
            values(?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id.to_string())
        .bind(terminal.terminal_code)
        .bind(terminal.name)
        .bind(terminal.location)
        .bind(to_nanos(OffsetDateTime::now_utc())?)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>> {
        let res = sqlx::query_as(
            "select * from employees where is_active = 1 order by first_name, last_name",
        )
        .fetch(&self.pool)
        .map_ok(|DbEmployee(employee)| employee)
        .try_collect()
        .await?;

        Ok(res)
    }

    pub async fn list_terminals(&self) -> Result<Vec<Terminal>> {
        let res = sqlx::query_as("select * from terminals where is_active = 1 order by name")
            .fetch(&self.pool)
            .map_ok(|DbTerminal(terminal)| terminal)
            .try_collect()
            .await?;

        Ok(res)
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<CanonicalEntry>> {
        let mut query = SqlBuilder::select_from("clock_entries");
        query.field("*").order_desc("clock_in");
        if let Some(code) = &filter.employee_code {
            query.and_where(format!(
                "employee_ref = (select id from employees where employee_code = {})",
                quote(code)
            ));
        }
        if let Some(flagged) = filter.flagged {
            query.and_where_eq("flagged", i32::from(flagged));
        }
        if let Some(limit) = filter.limit {
            query.limit(limit);
        }

        let query = query.sql().map_err(|err| eyre!("Failed to build query {err}"))?;
        let res = sqlx::query_as(&query)
            .fetch(&self.pool)
            .map_ok(|DbEntry(entry)| entry)
            .try_collect()
            .await?;

        Ok(res)
    }

    pub async fn count_entries(&self) -> Result<i64> {
        let res: (i64,) = sqlx::query_as("select count(1) from clock_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(res.0)
    }

    pub async fn latest_open_entry(&self, employee_ref: Uuid) -> Result<Option<CanonicalEntry>> {
        let res = sqlx::query_as(
            r#"
            select * from clock_entries
            where employee_ref = ?1 and clock_out is null
            order by clock_in desc
            limit 1
            "#,
        )
        .bind(employee_ref.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(|DbEntry(entry)| entry);

        Ok(res)
    }

    pub async fn close_entry(
        &self,
        id: Uuid,
        clock_out: OffsetDateTime,
        notes: Option<String>,
    ) -> Result<CanonicalEntry> {
        let DbEntry(entry) = sqlx::query_as(
            r#"
            update clock_entries set clock_out = ?2, notes = coalesce(?3, notes)
            where id = ?1
            returning *
            "#,
        )
        .bind(id.to_string())
        .bind(to_nanos(clock_out)?)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }
}

#[async_trait]
impl EntityDirectory for Database {
    async fn resolve_employee(&self, code: &str) -> Result<Option<Uuid>, StoreError> {
        let res: Option<(String,)> =
            sqlx::query_as("select id from employees where employee_code = ?1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(res.map(|(id,)| parse_uuid(&id)).transpose()?)
    }

    async fn resolve_terminal(&self, code: &str) -> Result<Option<Uuid>, StoreError> {
        let res: Option<(String,)> =
            sqlx::query_as("select id from terminals where terminal_code = ?1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(res.map(|(id,)| parse_uuid(&id)).transpose()?)
    }
}

#[async_trait]
impl EventStore for Database {
    async fn find_by_employee_and_clock_in(
        &self,
        employee_ref: Uuid,
        clock_in: OffsetDateTime,
    ) -> Result<Option<CanonicalEntry>, StoreError> {
        let res = sqlx::query_as(
            "select * from clock_entries where employee_ref = ?1 and clock_in = ?2",
        )
        .bind(employee_ref.to_string())
        .bind(to_nanos(clock_in)?)
        .fetch_optional(&self.pool)
        .await?
        .map(|DbEntry(entry)| entry);

        Ok(res)
    }

    async fn insert(&self, entry: NewEntry) -> Result<CanonicalEntry, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            insert into clock_entries(
                id, employee_ref, terminal_ref, clock_in, clock_out, notes,
                source, flagged, flag_reason, synced_at, created_at
            )
            values(
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            )
            "#,
        )
        .bind(id.to_string())
        .bind(entry.employee_ref.to_string())
        .bind(entry.terminal_ref.map(|x| x.to_string()))
        .bind(to_nanos(entry.clock_in)?)
        .bind(entry.clock_out.map(to_nanos).transpose()?)
        .bind(entry.notes.as_deref())
        .bind(entry.source.as_str())
        .bind(entry.flagged)
        .bind(entry.flag_reason.as_deref())
        .bind(entry.synced_at.map(to_nanos).transpose()?)
        .bind(to_nanos(OffsetDateTime::now_utc())?)
        .execute(&self.pool)
        .await?;

        debug!("committed clock entry {id}");
        Ok(entry.into_entry(id))
    }
}

#[async_trait]
impl AuditSink for Database {
    async fn append(&self, record: AuditRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into audit_logs(
                employee_ref, action, table_name, record_id, captured_at, new_data, created_at
            )
            values(?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(record.employee_ref.to_string())
        .bind(record.action)
        .bind(record.table_name)
        .bind(record.record_id.to_string())
        .bind(record.captured_at.map(to_nanos).transpose()?)
        .bind(record.new_data.to_string())
        .bind(to_nanos(OffsetDateTime::now_utc())?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
