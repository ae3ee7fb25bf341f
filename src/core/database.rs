// src/core/database.rs
//! Persistence: the trainer table, option storage for rolling logs and the
//! expiring counters used by the mail rate limiter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Arguments, SqlitePool};
use std::path::Path;

use crate::app_log;
use crate::core::fs_ops::ensure_dir_exists;
use crate::types::{NewTrainer, Trainer, TrainerStatus};

const TRAINER_COLUMNS: &str = "id, first_name, last_name, email, phone, company, linkedin_url, \
     specialties, intervention_regions, experience, experience_level, availability, \
     hourly_rate, hourly_rate_value, bio, cv_file, photo_file, rgpd_consent, \
     marketing_consent, status, created_at, updated_at";

/// A bound value of a dynamically built statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

/// Conjunction of conditions over `trainer_registrations`, with `?`
/// placeholders bound in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFilter {
    conditions: Vec<String>,
    params: Vec<SqlParam>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one condition; `params` must match its placeholders.
    pub fn push(&mut self, condition: impl Into<String>, params: Vec<SqlParam>) {
        self.conditions.push(condition.into());
        self.params.extend(params);
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlOrder {
    /// Most recent first.
    Newest,
    /// Tiered on where the LIKE pattern matches (specialties, then
    /// experience, then bio), most recent first inside a tier.
    Relevance { pattern: String },
}

impl SqlOrder {
    fn clause(&self) -> &'static str {
        match self {
            Self::Newest => "ORDER BY created_at DESC, id DESC",
            Self::Relevance { .. } => {
                "ORDER BY CASE \
                 WHEN specialties LIKE ? ESCAPE '\\' THEN 1 \
                 WHEN experience LIKE ? ESCAPE '\\' THEN 2 \
                 WHEN bio LIKE ? ESCAPE '\\' THEN 3 \
                 ELSE 4 END, created_at DESC, id DESC"
            }
        }
    }

    fn params(&self) -> Vec<SqlParam> {
        match self {
            Self::Newest => Vec::new(),
            Self::Relevance { pattern } => vec![SqlParam::Text(pattern.clone()); 3],
        }
    }
}

fn bind_all<'q>(params: &[SqlParam]) -> Result<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for param in params {
        let bound = match param {
            SqlParam::Text(value) => args.add(value.clone()),
            SqlParam::Int(value) => args.add(*value),
        };
        bound.map_err(|e| anyhow::anyhow!("Failed to bind query parameter: {}", e))?;
    }
    Ok(args)
}

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn insert_trainer(&self, trainer: &NewTrainer) -> Result<i64>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn count_trainers(&self, filter: &SqlFilter) -> Result<i64>;
    async fn select_trainers(
        &self,
        filter: &SqlFilter,
        order: &SqlOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trainer>>;
    async fn find_approved(&self, id: i64) -> Result<Option<Trainer>>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;
    async fn count_status_updated_since(
        &self,
        status: TrainerStatus,
        since: DateTime<Utc>,
    ) -> Result<i64>;
    async fn count_status(&self, status: TrainerStatus) -> Result<i64>;
    async fn count_pending_older_than(&self, before: DateTime<Utc>) -> Result<i64>;

    async fn load_option(&self, name: &str) -> Result<Option<String>>;
    async fn save_option(&self, name: &str, value: &str) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

/// Counters that disappear after a time-to-live.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Current value, 0 when missing or expired.
    async fn get_counter(&self, key: &str) -> Result<i64>;
    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<()>;
}

pub struct SqliteDatastore {
    pool: SqlitePool,
}

impl SqliteDatastore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir_exists(parent).await?;
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        app_log!(
            info,
            "Database connection established: {}",
            database_path.display()
        );

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trainer_registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                company TEXT NOT NULL DEFAULT '',
                linkedin_url TEXT NOT NULL DEFAULT '',
                specialties TEXT NOT NULL,
                intervention_regions TEXT NOT NULL,
                experience TEXT NOT NULL,
                experience_level TEXT NOT NULL DEFAULT 'intermediaire',
                availability TEXT NOT NULL DEFAULT '',
                hourly_rate TEXT NOT NULL DEFAULT '',
                hourly_rate_value INTEGER NOT NULL DEFAULT 0,
                bio TEXT NOT NULL DEFAULT '',
                cv_file TEXT NOT NULL DEFAULT '',
                photo_file TEXT NOT NULL DEFAULT '',
                rgpd_consent BOOLEAN NOT NULL DEFAULT FALSE,
                marketing_consent BOOLEAN NOT NULL DEFAULT FALSE,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_trainer_email ON trainer_registrations(email);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trainer_status ON trainer_registrations(status, created_at);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS options (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transients (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        app_log!(info, "Database migrations completed");
        Ok(())
    }

    async fn count_where(&self, condition: &str, params: Vec<SqlParam>) -> Result<i64> {
        let mut filter = SqlFilter::new();
        filter.push(condition, params);
        self.count_trainers(&filter).await
    }
}

#[async_trait]
impl Datastore for SqliteDatastore {
    async fn insert_trainer(&self, trainer: &NewTrainer) -> Result<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO trainer_registrations (
                first_name, last_name, email, phone, company, linkedin_url,
                specialties, intervention_regions, experience, experience_level,
                availability, hourly_rate, hourly_rate_value, bio, cv_file, photo_file,
                rgpd_consent, marketing_consent, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trainer.first_name)
        .bind(&trainer.last_name)
        .bind(&trainer.email)
        .bind(&trainer.phone)
        .bind(&trainer.company)
        .bind(&trainer.linkedin_url)
        .bind(trainer.specialties_joined())
        .bind(trainer.regions_joined())
        .bind(&trainer.experience)
        .bind(trainer.experience_level)
        .bind(&trainer.availability)
        .bind(&trainer.hourly_rate)
        .bind(trainer.hourly_rate_value())
        .bind(&trainer.bio)
        .bind(&trainer.cv_file)
        .bind(&trainer.photo_file)
        .bind(trainer.rgpd_consent)
        .bind(trainer.marketing_consent)
        .bind(trainer.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert trainer")?;

        let id = result.last_insert_rowid();
        app_log!(info, "Inserted trainer #{} with status {}", id, trainer.status);
        Ok(id)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM trainer_registrations WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn count_trainers(&self, filter: &SqlFilter) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM trainer_registrations {}",
            filter.where_clause()
        );
        let args = bind_all(filter.params())?;

        let total: i64 = sqlx::query_scalar_with(&sql, args)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Count query failed: {}", sql))?;
        Ok(total)
    }

    async fn select_trainers(
        &self,
        filter: &SqlFilter,
        order: &SqlOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trainer>> {
        let sql = format!(
            "SELECT {} FROM trainer_registrations {} {} LIMIT ? OFFSET ?",
            TRAINER_COLUMNS,
            filter.where_clause(),
            order.clause()
        );

        let mut params = filter.params().to_vec();
        params.extend(order.params());
        params.push(SqlParam::Int(limit));
        params.push(SqlParam::Int(offset));
        let args = bind_all(&params)?;

        let trainers = sqlx::query_as_with::<_, Trainer, _>(&sql, args)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Select query failed: {}", sql))?;
        Ok(trainers)
    }

    async fn find_approved(&self, id: i64) -> Result<Option<Trainer>> {
        let sql = format!(
            "SELECT {} FROM trainer_registrations WHERE id = ? AND status = ?",
            TRAINER_COLUMNS
        );
        let trainer = sqlx::query_as::<_, Trainer>(&sql)
            .bind(id)
            .bind(TrainerStatus::Approved)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trainer)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM trainer_registrations WHERE created_at >= ?")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_status_updated_since(
        &self,
        status: TrainerStatus,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trainer_registrations WHERE status = ? AND updated_at >= ?",
        )
        .bind(status)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_status(&self, status: TrainerStatus) -> Result<i64> {
        self.count_where(
            "status = ?",
            vec![SqlParam::Text(status.as_str().to_string())],
        )
        .await
    }

    async fn count_pending_older_than(&self, before: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trainer_registrations WHERE status = ? AND created_at < ?",
        )
        .bind(TrainerStatus::Pending)
        .bind(before)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn load_option(&self, name: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM options WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn save_option(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO options (name, value) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save option {}", name))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

#[async_trait]
impl TransientStore for SqliteDatastore {
    async fn get_counter(&self, key: &str) -> Result<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT value FROM transients WHERE name = ? AND expires_at > ?")
                .bind(key)
                .bind(Utc::now().timestamp())
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.unwrap_or(0))
    }

    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let expires_at = (Utc::now() + ttl).timestamp();

        sqlx::query(
            r#"
            INSERT INTO transients (name, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to set transient {}", key))?;

        // expired rows are dropped lazily on write
        sqlx::query("DELETE FROM transients WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_datastore, new_trainer};

    #[tokio::test]
    async fn test_insert_and_find_approved() {
        let db = memory_datastore().await;
        let mut trainer = new_trainer("Marie", "Dupont", "marie@example.com");
        trainer.hourly_rate = "65€/h".to_string();
        let id = db.insert_trainer(&trainer).await.unwrap();

        let found = db.find_approved(id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Marie");
        assert_eq!(found.specialties, "rust, devops");
        assert_eq!(found.hourly_rate_value, 65);
        assert!(db.email_exists("marie@example.com").await.unwrap());
        assert!(!db.email_exists("other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_trainer_is_not_found() {
        let db = memory_datastore().await;
        let mut trainer = new_trainer("Paul", "Martin", "paul@example.com");
        trainer.status = TrainerStatus::Pending;
        let id = db.insert_trainer(&trainer).await.unwrap();

        assert!(db.find_approved(id).await.unwrap().is_none());
        assert_eq!(db.count_status(TrainerStatus::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_by_index() {
        let db = memory_datastore().await;
        let trainer = new_trainer("Marie", "Dupont", "marie@example.com");
        db.insert_trainer(&trainer).await.unwrap();
        assert!(db.insert_trainer(&trainer).await.is_err());
    }

    #[tokio::test]
    async fn test_filter_binds_in_order() {
        let db = memory_datastore().await;
        db.insert_trainer(&new_trainer("A", "One", "a@example.com"))
            .await
            .unwrap();
        let mut other = new_trainer("B", "Two", "b@example.com");
        other.specialties = vec!["management".to_string()];
        db.insert_trainer(&other).await.unwrap();

        let mut filter = SqlFilter::new();
        filter.push("status = ?", vec![SqlParam::Text("approved".to_string())]);
        filter.push(
            "specialties LIKE ? ESCAPE '\\'",
            vec![SqlParam::Text("%rust%".to_string())],
        );

        assert_eq!(db.count_trainers(&filter).await.unwrap(), 1);
        let rows = db
            .select_trainers(&filter, &SqlOrder::Newest, 10, 0)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn test_options_upsert() {
        let db = memory_datastore().await;
        assert_eq!(db.load_option("k").await.unwrap(), None);

        db.save_option("k", "[1]").await.unwrap();
        db.save_option("k", "[2]").await.unwrap();
        assert_eq!(db.load_option("k").await.unwrap(), Some("[2]".to_string()));
    }

    #[tokio::test]
    async fn test_transient_counter_expires() {
        let db = memory_datastore().await;
        assert_eq!(db.get_counter("rate").await.unwrap(), 0);

        db.set_counter("rate", 3, Duration::hours(1)).await.unwrap();
        assert_eq!(db.get_counter("rate").await.unwrap(), 3);

        db.set_counter("rate", 4, Duration::seconds(-1)).await.unwrap();
        assert_eq!(db.get_counter("rate").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_statistics_counters() {
        let db = memory_datastore().await;
        let mut pending = new_trainer("P", "Ending", "p@example.com");
        pending.status = TrainerStatus::Pending;
        db.insert_trainer(&pending).await.unwrap();
        db.insert_trainer(&new_trainer("A", "Pproved", "a@example.com"))
            .await
            .unwrap();

        let week_ago = Utc::now() - Duration::days(7);
        assert_eq!(db.count_created_since(week_ago).await.unwrap(), 2);
        assert_eq!(
            db.count_status_updated_since(TrainerStatus::Approved, week_ago)
                .await
                .unwrap(),
            1
        );
        assert_eq!(db.count_pending_older_than(week_ago).await.unwrap(), 0);
        assert_eq!(
            db.count_pending_older_than(Utc::now() + Duration::minutes(1))
                .await
                .unwrap(),
            1
        );
    }
}
