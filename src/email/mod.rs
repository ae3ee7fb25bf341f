// src/email/mod.rs
//! Templated notification emails with per-recipient rate limiting and a
//! rolling send log.

pub mod templates;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::app_log;
use crate::core::config_manager::ConfigManager;
use crate::core::database::{Datastore, TransientStore};
use crate::core::log_store;
use crate::core::mailer::{Mailer, OutgoingEmail};
use crate::core::security::{hash_recipient, rate_limit_key};
use crate::types::logs::{EmailLogEntry, EMAIL_LOG_KEY, EMAIL_LOG_RETENTION_DAYS};
use crate::types::TrainerStatus;
use crate::utils::{is_valid_email, sanitize_key, sanitize_text_field, truncate_chars};

pub use templates::{EmailTemplate, TemplateContext};

pub const MAX_EMAILS_PER_HOUR: i64 = 5;
const MAX_SUBJECT_CHARS: usize = 200;
const MAX_BODY_CHARS: usize = 10_000;
const MAX_FIELD_CHARS: usize = 2_000;
const MAX_DATA_BYTES: usize = 10_000;
const TRUNCATION_NOTE: &str = "\n\n[Message tronqué pour des raisons de sécurité]";
const BLOCKED_TAGS: [&str; 4] = ["script", "iframe", "object", "embed"];
const FORBIDDEN_HEADERS: [&str; 6] = [
    "to:",
    "cc:",
    "bcc:",
    "subject:",
    "content-type:",
    "mime-version:",
];

/// Why a send did not happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    InvalidRecipient,
    EmptyContent,
    RateLimited,
    Transport(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecipient => f.write_str("invalid recipient"),
            Self::EmptyContent => f.write_str("empty subject or body"),
            Self::RateLimited => f.write_str("rate limit exceeded"),
            Self::Transport(detail) => write!(f, "transport failure: {}", detail),
        }
    }
}

impl std::error::Error for SendError {}

#[derive(Debug, Clone, Serialize)]
pub struct EmailStats {
    pub total_sent: usize,
    pub sent_today: usize,
    pub sent_this_week: usize,
    pub recent_logs: Vec<EmailLogEntry>,
}

#[derive(Clone)]
pub struct EmailManager {
    config: Arc<ConfigManager>,
    mailer: Arc<dyn Mailer>,
    datastore: Arc<dyn Datastore>,
    transients: Arc<dyn TransientStore>,
}

impl EmailManager {
    pub fn new(
        config: Arc<ConfigManager>,
        mailer: Arc<dyn Mailer>,
        datastore: Arc<dyn Datastore>,
        transients: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            config,
            mailer,
            datastore,
            transients,
        }
    }

    pub fn template_context(&self) -> TemplateContext {
        let notifications = &self.config.settings.notifications;
        TemplateContext {
            company_name: self.config.company_name().to_string(),
            contact_email: self
                .config
                .contact_email()
                .unwrap_or(&notifications.admin_email)
                .to_string(),
            admin_url: self.config.settings.site.admin_url.clone(),
        }
    }

    fn sender(&self) -> String {
        let address = self
            .config
            .settings
            .mail
            .from_email
            .as_deref()
            .filter(|email| is_valid_email(email))
            .or_else(|| self.config.contact_email())
            .unwrap_or(&self.config.settings.notifications.admin_email);

        format!(
            "\"{}\" <{}>",
            self.config.company_name().replace(['"', '\\'], ""),
            address
        )
    }

    /// Prepare a message with the default sender and the caller's screened
    /// headers. The body is used as given.
    fn compose(&self, to: &str, subject: &str, html_body: String, headers: &[String]) -> OutgoingEmail {
        let mut email = OutgoingEmail {
            from: self.sender(),
            to: to.to_string(),
            reply_to: None,
            subject: subject.to_string(),
            html_body,
            headers: vec![("X-Mailer".to_string(), "Trainer Directory".to_string())],
        };

        for header in filter_headers(headers) {
            let Some((name, value)) = header.split_once(':') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                continue;
            }

            match name.to_ascii_lowercase().as_str() {
                "from" => email.from = value.to_string(),
                "reply-to" => email.reply_to = Some(value.to_string()),
                "x-mailer" => email.headers[0].1 = value.to_string(),
                _ => email.headers.push((name.to_string(), value.to_string())),
            }
        }

        email
    }

    /// [`Self::try_send_email`] for call sites that only care whether it went out.
    pub async fn send_email(&self, to: &str, subject: &str, html: &str, headers: &[String]) -> bool {
        match self.try_send_email(to, subject, html, headers).await {
            Ok(()) => true,
            Err(e) => {
                app_log!(warn, "Email to {} not sent: {}", to, e);
                false
            }
        }
    }

    /// Sanitise, wrap, rate-limit, send and log one message.
    pub async fn try_send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        headers: &[String],
    ) -> Result<(), SendError> {
        if !is_valid_email(to) {
            app_log!(error, "Invalid recipient email: {}", to);
            return Err(SendError::InvalidRecipient);
        }

        let subject = truncate_chars(&sanitize_text_field(subject), MAX_SUBJECT_CHARS);
        let body = sanitize_email_body(html);
        if subject.is_empty() || body.trim().is_empty() {
            app_log!(error, "Empty subject or message for {}", to);
            return Err(SendError::EmptyContent);
        }

        let rate_key = rate_limit_key(to);
        let sent_last_hour = self.transients.get_counter(&rate_key).await.unwrap_or_else(|e| {
            app_log!(error, "Failed to read rate counter: {:#}", e);
            0
        });
        if sent_last_hour >= MAX_EMAILS_PER_HOUR {
            app_log!(warn, "Email rate limit exceeded for {}", to);
            return Err(SendError::RateLimited);
        }

        let wrapped = templates::wrap_email_content(&body, &subject);
        let email = self.compose(to, &subject, wrapped, headers);
        let outcome = self.mailer.send(&email).await;

        let status = match &outcome {
            Ok(()) => {
                if let Err(e) = self
                    .transients
                    .set_counter(&rate_key, sent_last_hour + 1, Duration::hours(1))
                    .await
                {
                    app_log!(error, "Failed to update rate counter: {:#}", e);
                }
                app_log!(info, "Email sent to {}: {}", to, subject);
                "sent"
            }
            Err(e) => {
                app_log!(error, "Email send failed to {}: {:#}", to, e);
                "failed"
            }
        };

        self.log_email(to, &subject, status).await;

        outcome.map_err(|e| SendError::Transport(format!("{:#}", e)))
    }

    /// Send a complete document outside the rate limiter and the send log.
    /// Errors carry the transport detail.
    pub async fn send_unthrottled(
        &self,
        to: &str,
        subject: &str,
        html_document: String,
        headers: &[String],
    ) -> Result<()> {
        if !is_valid_email(to) {
            anyhow::bail!("Invalid recipient email: {}", to);
        }
        let subject = truncate_chars(&sanitize_text_field(subject), MAX_SUBJECT_CHARS);
        let email = self.compose(to, &subject, html_document, headers);
        self.mailer
            .send(&email)
            .await
            .with_context(|| format!("Failed to send email to {}", to))
    }

    /// Render a registered template and send it now, or after `schedule`.
    pub async fn send_template_email(
        &self,
        template_key: &str,
        to: &str,
        data: &Value,
        schedule: Option<std::time::Duration>,
    ) -> bool {
        let Some(template) = EmailTemplate::from_key(template_key) else {
            app_log!(error, "Email template not found: {}", template_key);
            return false;
        };

        if !is_valid_email(to) {
            app_log!(error, "Invalid recipient email: {}", to);
            return false;
        }

        let data = sanitize_email_data(data);
        let size = serde_json::to_string(&data).map(|s| s.len()).unwrap_or(usize::MAX);
        if size > MAX_DATA_BYTES {
            app_log!(error, "Email data too large for template {}: {} bytes", template_key, size);
            return false;
        }

        let subject = templates::parse_template_vars(template.subject(), &data);
        let html = template.render(&data, &self.template_context());

        match schedule {
            Some(delay) => {
                self.schedule_email(to, &subject, &html, delay);
                true
            }
            None => self.send_email(to, &subject, &html, &[]).await,
        }
    }

    /// Send later on the runtime; the outcome is only logged.
    pub fn schedule_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        delay: std::time::Duration,
    ) -> tokio::task::JoinHandle<bool> {
        let manager = self.clone();
        let (to, subject, html) = (to.to_string(), subject.to_string(), html.to_string());

        app_log!(info, "Email to {} scheduled in {}s", to, delay.as_secs());

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.send_email(&to, &subject, &html, &[]).await
        })
    }

    async fn log_email(&self, to: &str, subject: &str, status: &str) {
        let entry = EmailLogEntry {
            timestamp: Utc::now(),
            to: hash_recipient(&self.config.settings.security.token_secret, to),
            subject: subject.to_string(),
            status: status.to_string(),
        };

        if let Err(e) = log_store::append_log(self.datastore.as_ref(), EMAIL_LOG_KEY, entry).await {
            app_log!(error, "Failed to record email log: {:#}", e);
        }
    }

    /// Drop send log entries past retention. Returns how many were removed.
    pub async fn cleanup_email_logs(&self) -> Result<usize> {
        let mut log =
            log_store::load_log::<EmailLogEntry>(self.datastore.as_ref(), EMAIL_LOG_KEY).await?;
        let removed = log.retain_newer_than(Utc::now(), Duration::days(EMAIL_LOG_RETENTION_DAYS));
        log_store::save_log(self.datastore.as_ref(), EMAIL_LOG_KEY, &log).await?;

        app_log!(info, "Email log cleanup removed {} entries", removed);
        Ok(removed)
    }

    pub async fn email_stats(&self) -> Result<EmailStats> {
        let log =
            log_store::load_log::<EmailLogEntry>(self.datastore.as_ref(), EMAIL_LOG_KEY).await?;
        let now = Utc::now();
        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        let week_ago = now - Duration::days(7);

        let sent: Vec<&EmailLogEntry> = log
            .entries()
            .iter()
            .filter(|entry| entry.status == "sent")
            .collect();

        Ok(EmailStats {
            total_sent: sent.len(),
            sent_today: sent.iter().filter(|entry| entry.timestamp >= today).count(),
            sent_this_week: sent.iter().filter(|entry| entry.timestamp >= week_ago).count(),
            recent_logs: log.entries().iter().take(10).cloned().collect(),
        })
    }

    pub async fn send_weekly_summary(&self) -> bool {
        if !self.config.settings.notifications.notify_weekly_summary {
            app_log!(info, "Weekly summary disabled");
            return false;
        }

        let week_ago = Utc::now() - Duration::days(7);
        let counts = async {
            Ok::<_, anyhow::Error>((
                self.datastore.count_created_since(week_ago).await?,
                self.datastore
                    .count_status_updated_since(TrainerStatus::Approved, week_ago)
                    .await?,
                self.datastore.count_status(TrainerStatus::Pending).await?,
            ))
        }
        .await;

        let (new_registrations, approved_this_week, pending_total) = match counts {
            Ok(counts) => counts,
            Err(e) => {
                app_log!(error, "Failed to compute weekly summary: {:#}", e);
                return false;
            }
        };

        let data = serde_json::json!({
            "new_registrations": new_registrations,
            "approved_this_week": approved_this_week,
            "pending_total": pending_total,
        });

        self.send_template_email(
            EmailTemplate::WeeklySummary.key(),
            self.config.notification_email(),
            &data,
            None,
        )
        .await
    }

    pub async fn send_pending_reminders(&self) -> bool {
        if !self.config.settings.notifications.notify_pending_review {
            app_log!(info, "Pending review reminders disabled");
            return false;
        }

        let cutoff = Utc::now() - Duration::days(7);
        let pending_count = match self.datastore.count_pending_older_than(cutoff).await {
            Ok(count) => count,
            Err(e) => {
                app_log!(error, "Failed to count pending trainers: {:#}", e);
                return false;
            }
        };

        if pending_count == 0 {
            app_log!(info, "No trainer pending for more than 7 days");
            return false;
        }

        self.send_template_email(
            EmailTemplate::PendingReminder.key(),
            self.config.notification_email(),
            &serde_json::json!({ "pending_count": pending_count }),
            None,
        )
        .await
    }

    /// Delivery check, to the admin address unless `to` is given.
    pub async fn test_email_sending(&self, to: Option<&str>) -> bool {
        let to = to.unwrap_or(&self.config.settings.notifications.admin_email);
        let body = templates::test_email_body(Utc::now());
        self.send_email(to, "Test Email - Trainer Directory", &body, &[])
            .await
    }
}

/// Drop any header that would override addressing or content framing, or
/// that carries a line break.
pub fn filter_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|header| {
            let lower = header.trim_start().to_ascii_lowercase();
            let forbidden = FORBIDDEN_HEADERS
                .iter()
                .any(|prefix| lower.starts_with(prefix));
            let injected = header.contains(['\r', '\n', '\0']);
            if forbidden || injected {
                app_log!(warn, "Dropped unsafe email header: {:?}", header);
            }
            !forbidden && !injected
        })
        .cloned()
        .collect()
}

/// Remove active-content blocks and cap the length.
pub fn sanitize_email_body(html: &str) -> String {
    let mut body = html.to_string();

    for tag in BLOCKED_TAGS {
        let open = format!("<{}", tag);
        let close = format!("</{}>", tag);
        loop {
            // ASCII lowering keeps byte offsets aligned with `body`
            let lower = body.to_ascii_lowercase();
            let Some(start) = lower.find(&open) else {
                break;
            };
            let Some(close_at) = lower[start..].find(&close) else {
                break;
            };
            body.replace_range(start..start + close_at + close.len(), "");
        }
    }

    if body.chars().count() > MAX_BODY_CHARS {
        body = truncate_chars(&body, MAX_BODY_CHARS);
        body.push_str(TRUNCATION_NOTE);
    }

    body
}

/// Substitution data with normalised keys, plain-text strings and only
/// string, number, list and map values.
pub fn sanitize_email_data(data: &Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => sanitize_map(map),
        _ => Map::new(),
    }
}

fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter_map(|(key, value)| sanitize_value(value).map(|value| (sanitize_key(key), value)))
        .collect()
}

fn sanitize_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => {
            let s = if s.chars().count() > MAX_FIELD_CHARS {
                format!("{}...", truncate_chars(s, MAX_FIELD_CHARS))
            } else {
                s.clone()
            };
            Some(Value::String(sanitize_text_field(&s)))
        }
        Value::Number(_) => Some(value.clone()),
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(sanitize_value).collect(),
        )),
        Value::Object(map) => Some(Value::Object(sanitize_map(map))),
        Value::Bool(_) | Value::Null => None,
    }
}
