// src/test_support.rs
//! Shared fixtures for the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::core::database::SqliteDatastore;
use crate::core::fs_ops::LocalFileStore;
use crate::core::mailer::{Mailer, OutgoingEmail};
use crate::core::{AppContext, ConfigManager};
use crate::types::{ExperienceLevel, NewTrainer, TrainerStatus};

pub const TEST_CONFIG: &str = r#"
local:
  database_path: unused.db
  uploads_path: unused
  site:
    name: Formateurs Pro
    url: https://formateurs.example.com
    admin_url: https://formateurs.example.com/admin
    directory_url: https://formateurs.example.com/annuaire
  notifications:
    admin_email: admin@example.com
    notification_email: notify@example.com
    contact_email: contact@example.com
    auto_approve: false
    notify_new_registration: true
    notify_weekly_summary: false
    notify_pending_review: true
  mail:
    transport:
      type: file
      path: unused-mail
  security:
    token_secret: test-secret
production:
  database_path: unused.db
  uploads_path: unused
  site:
    name: Formateurs Pro
    url: https://formateurs.example.com
  notifications:
    admin_email: admin@example.com
  mail:
    transport:
      type: file
      path: unused-mail
  security:
    token_secret: test-secret
"#;

pub async fn memory_datastore() -> SqliteDatastore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    SqliteDatastore::from_pool(pool).await.unwrap()
}

/// Approved senior trainer with two specialties.
pub fn new_trainer(first_name: &str, last_name: &str, email: &str) -> NewTrainer {
    NewTrainer {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: "+33 61 23 45 67 8".to_string(),
        company: String::new(),
        linkedin_url: String::new(),
        specialties: vec!["rust".to_string(), "devops".to_string()],
        intervention_regions: vec!["ile-de-france".to_string()],
        experience: "Dix ans de formation en entreprise sur les architectures distribuées."
            .to_string(),
        experience_level: ExperienceLevel::Senior,
        availability: "temps-partiel".to_string(),
        hourly_rate: String::new(),
        bio: String::new(),
        cv_file: "cv/1700000000_cv.pdf".to_string(),
        photo_file: String::new(),
        rgpd_consent: true,
        marketing_consent: false,
        status: TrainerStatus::Approved,
    }
}

/// Mailer double keeping every message; can be switched to failing.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failure: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_with(&self, detail: &str) {
        *self.failure.lock().unwrap() = Some(detail.to_string());
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if let Some(detail) = self.failure.lock().unwrap().clone() {
            anyhow::bail!("{}", detail);
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub mailer: Arc<RecordingMailer>,
    pub db: Arc<SqliteDatastore>,
    pub uploads: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_yaml_patch(|yaml| yaml.to_string()).await
    }

    /// Harness over an edited copy of [`TEST_CONFIG`].
    pub async fn with_yaml_patch(patch: impl FnOnce(&str) -> String) -> Self {
        let mut config = ConfigManager::from_yaml_str(&patch(TEST_CONFIG), "local").unwrap();
        let uploads = tempfile::tempdir().unwrap();
        config.settings.uploads_path = uploads.path().to_path_buf();

        let db = Arc::new(memory_datastore().await);
        let mailer = Arc::new(RecordingMailer::default());
        let files = Arc::new(LocalFileStore::new(uploads.path()));

        let ctx = AppContext::from_parts(
            Arc::new(config),
            db.clone(),
            db.clone(),
            files,
            mailer.clone(),
        );

        Self {
            ctx,
            mailer,
            db,
            uploads,
        }
    }

    /// Move a trainer's timestamps `days` into the past.
    pub async fn backdate(&self, id: i64, days: i64) {
        let at = Utc::now() - Duration::days(days);
        sqlx::query("UPDATE trainer_registrations SET created_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(self.db.pool())
            .await
            .unwrap();
    }
}
