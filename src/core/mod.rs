// src/core/mod.rs
//! Core services shared by the HTTP handlers and the operator CLI.

pub mod config_manager;
pub mod database;
pub mod fs_ops;
pub mod log_store;
pub mod mailer;
pub mod security;

pub use config_manager::ConfigManager;
pub use database::{Datastore, SqliteDatastore, TransientStore};
pub use fs_ops::{FileStore, LocalFileStore};
pub use mailer::{LettreMailer, Mailer};
pub use security::NonceGuard;

use anyhow::Result;
use std::sync::Arc;

use crate::app_log;
use crate::email::EmailManager;

/// Component graph built once at startup and shared with every request.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ConfigManager>,
    pub datastore: Arc<dyn Datastore>,
    pub files: Arc<dyn FileStore>,
    pub nonces: NonceGuard,
    pub email: Arc<EmailManager>,
}

impl AppContext {
    pub async fn build(config: ConfigManager) -> Result<Self> {
        let config = Arc::new(config);

        let sqlite = Arc::new(SqliteDatastore::connect(&config.settings.database_path).await?);
        let mailer: Arc<dyn Mailer> = Arc::new(LettreMailer::new(&config.settings.mail)?);

        let files = LocalFileStore::new(&config.settings.uploads_path);
        files.secure_root().await?;

        app_log!(
            info,
            "Application context ready (environment: {})",
            config.environment
        );

        Ok(Self::from_parts(
            config,
            sqlite.clone(),
            sqlite,
            Arc::new(files),
            mailer,
        ))
    }

    /// Wire the graph from already constructed collaborators.
    pub fn from_parts(
        config: Arc<ConfigManager>,
        datastore: Arc<dyn Datastore>,
        transients: Arc<dyn TransientStore>,
        files: Arc<dyn FileStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let nonces = NonceGuard::new(
            config.settings.security.token_secret.clone(),
            config.settings.security.token_ttl_minutes,
        );
        let email = Arc::new(EmailManager::new(
            config.clone(),
            mailer,
            datastore.clone(),
            transients,
        ));

        Self {
            config,
            datastore,
            files,
            nonces,
            email,
        }
    }
}
