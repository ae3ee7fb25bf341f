// src/core/config_manager.rs
//! Configuration loading: `config.yaml` with one section per environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::app_log;
use crate::core::fs_ops::ensure_dir_exists;
use crate::utils::{is_valid_email, sanitize_text_field};

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: String,
    pub settings: AppSettings,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: AppSettings,
    production: AppSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub database_path: PathBuf,
    pub uploads_path: PathBuf,
    #[serde(default = "default_uploads_base_url")]
    pub uploads_base_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    pub site: SiteSettings,
    pub notifications: NotificationSettings,
    pub mail: MailSettings,
    pub security: SecuritySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub admin_url: String,
    #[serde(default)]
    pub directory_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    pub admin_email: String,
    #[serde(default)]
    pub notification_email: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default = "default_true")]
    pub notify_new_registration: bool,
    #[serde(default)]
    pub notify_weekly_summary: bool,
    #[serde(default = "default_true")]
    pub notify_pending_review: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub from_email: Option<String>,
    pub transport: MailTransportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default = "default_true")]
        use_tls: bool,
    },
    File {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    pub token_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
}

fn default_uploads_base_url() -> String {
    "/uploads".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_token_ttl() -> i64 {
    720
}

impl ConfigManager {
    /// Load `config.yaml` from the working directory for the active environment.
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        app_log!(info, "Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from("config.yaml");
        if !config_path.exists() {
            anyhow::bail!(
                "config.yaml not found in current directory. Server cannot start without configuration."
            );
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;
        let mut manager = Self::from_yaml_str(&content, &environment)?;
        manager.resolve_paths()?;
        Ok(manager)
    }

    fn get_environment() -> String {
        std::env::var("TRAINER_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Parse a configuration document and pick the section for `environment`.
    pub fn from_yaml_str(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;

        let settings = match environment {
            "production" => config_file.production,
            _ => config_file.local,
        };

        let mut manager = Self {
            environment: environment.to_string(),
            settings,
        };
        manager.validate_email_settings();
        Ok(manager)
    }

    fn resolve_paths(&mut self) -> Result<()> {
        self.settings.database_path = resolve_path(&self.settings.database_path)?;
        self.settings.uploads_path = resolve_path(&self.settings.uploads_path)?;
        if let MailTransportConfig::File { path } = &mut self.settings.mail.transport {
            *path = resolve_path(path)?;
        }
        Ok(())
    }

    /// Invalid contact address falls back to the admin address; the company
    /// name is plain text.
    fn validate_email_settings(&mut self) {
        let notifications = &mut self.settings.notifications;

        if !notifications.contact_email.is_empty() && !is_valid_email(&notifications.contact_email)
        {
            app_log!(
                warn,
                "Invalid contact email '{}', falling back to admin email",
                notifications.contact_email
            );
            notifications.contact_email = notifications.admin_email.clone();
        }

        notifications.company_name = sanitize_text_field(&notifications.company_name);
    }

    /// Address receiving contact requests, if any valid one is configured.
    pub fn contact_email(&self) -> Option<&str> {
        let notifications = &self.settings.notifications;
        [&notifications.contact_email, &notifications.admin_email]
            .into_iter()
            .find(|email| is_valid_email(email))
            .map(|email| email.as_str())
    }

    /// Address receiving new-registration and digest notifications.
    pub fn notification_email(&self) -> &str {
        let notifications = &self.settings.notifications;
        if is_valid_email(&notifications.notification_email) {
            &notifications.notification_email
        } else {
            &notifications.admin_email
        }
    }

    pub fn company_name(&self) -> &str {
        if self.settings.notifications.company_name.is_empty() {
            &self.settings.site.name
        } else {
            &self.settings.notifications.company_name
        }
    }

    pub fn directory_url(&self) -> &str {
        if self.settings.site.directory_url.is_empty() {
            &self.settings.site.url
        } else {
            &self.settings.site.directory_url
        }
    }

    /// Ensure all required directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.settings.database_path.parent() {
            if !db_parent.as_os_str().is_empty() {
                ensure_dir_exists(db_parent).await?;
            }
        }
        ensure_dir_exists(&self.settings.uploads_path).await?;
        if let MailTransportConfig::File { path } = &self.settings.mail.transport {
            ensure_dir_exists(path).await?;
        }

        app_log!(info, "All configured directories ensured to exist");
        Ok(())
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(current_dir.join(path))
    }
}
