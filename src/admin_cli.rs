// src/admin_cli.rs
use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app_log;
use crate::core::log_store::load_log;
use crate::core::{AppContext, ConfigManager};
use crate::types::logs::{ContactEvent, CONTACT_LOG_KEY};

#[derive(Parser)]
#[command(name = "trainer-admin")]
#[command(about = "Maintenance tasks for the trainer directory")]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Create directories and run database migrations
    Init,
    /// Send the weekly activity digest to the notification address
    WeeklySummary,
    /// Remind the notification address about trainers waiting for review
    PendingReminders,
    /// Drop email log entries older than 30 days
    CleanupEmailLogs,
    /// Show email sending statistics
    EmailStats,
    /// Send a test email
    TestEmail {
        /// Recipient, defaults to the admin address
        #[arg(long)]
        to: Option<String>,
    },
    /// Show the most recent contact requests
    ContactLog,
}

pub async fn handle_admin_command(cli: AdminCli) -> Result<()> {
    let config = ConfigManager::load()?;
    config.ensure_directories().await?;
    let ctx = AppContext::build(config).await?;

    match cli.command {
        AdminCommand::Init => {
            app_log!(info, "✅ Trainer directory initialized");
            app_log!(info, "   Database: {}", ctx.config.settings.database_path.display());
            app_log!(info, "   Uploads: {}", ctx.config.settings.uploads_path.display());
        }

        AdminCommand::WeeklySummary => {
            if ctx.email.send_weekly_summary().await {
                app_log!(info, "✅ Weekly summary sent to {}", ctx.config.notification_email());
            } else {
                app_log!(info, "❌ Weekly summary not sent (disabled or delivery failed)");
            }
        }

        AdminCommand::PendingReminders => {
            if ctx.email.send_pending_reminders().await {
                app_log!(info, "✅ Pending review reminder sent");
            } else {
                app_log!(info, "No reminder sent (disabled, nothing overdue, or delivery failed)");
            }
        }

        AdminCommand::CleanupEmailLogs => match ctx.email.cleanup_email_logs().await {
            Ok(removed) => app_log!(info, "✅ Removed {} old email log entries", removed),
            Err(e) => {
                app_log!(error, "Failed to clean email logs: {:#}", e);
                app_log!(info, "❌ Error: {}", e);
            }
        },

        AdminCommand::EmailStats => match ctx.email.email_stats().await {
            Ok(stats) => {
                app_log!(info, "Email statistics:");
                app_log!(info, "   Total logged: {}", stats.total_sent);
                app_log!(info, "   Sent today: {}", stats.sent_today);
                app_log!(info, "   Sent this week: {}", stats.sent_this_week);
                app_log!(info, "{:<20} {:<10} {}", "Date", "Status", "Subject");
                app_log!(info, "{}", "-".repeat(70));
                for entry in stats.recent_logs {
                    app_log!(
                        info,
                        "{:<20} {:<10} {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        entry.status,
                        entry.subject
                    );
                }
            }
            Err(e) => {
                app_log!(error, "Failed to read email stats: {:#}", e);
                app_log!(info, "❌ Error: {}", e);
            }
        },

        AdminCommand::TestEmail { to } => {
            if ctx.email.test_email_sending(to.as_deref()).await {
                app_log!(info, "✅ Test email sent");
            } else {
                app_log!(info, "❌ Test email failed, see logs for details");
            }
        }

        AdminCommand::ContactLog => {
            let log = load_log::<ContactEvent>(ctx.datastore.as_ref(), CONTACT_LOG_KEY).await?;
            if log.is_empty() {
                app_log!(info, "No contact requests recorded.");
            } else {
                app_log!(
                    info,
                    "{:<20} {:<8} {:<30} {:<8} {}",
                    "Date", "Trainer", "From", "Sent", "IP"
                );
                app_log!(info, "{}", "-".repeat(85));
                for event in log.entries() {
                    app_log!(
                        info,
                        "{:<20} {:<8} {:<30} {:<8} {}",
                        event.timestamp.format("%Y-%m-%d %H:%M"),
                        format!("#{:04}", event.trainer_id),
                        event.from_email,
                        if event.success { "yes" } else { "no" },
                        event.ip
                    );
                }
            }
        }
    }

    Ok(())
}
