// src/types/logs.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const CONTACT_LOG_KEY: &str = "trainer_contact_logs";
pub const EMAIL_LOG_KEY: &str = "trainer_email_logs";
pub const ROLLING_LOG_CAPACITY: usize = 50;
pub const EMAIL_LOG_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub timestamp: DateTime<Utc>,
    pub trainer_id: i64,
    pub from_email: String,
    pub to_email: String,
    pub success: bool,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailLogEntry {
    pub timestamp: DateTime<Utc>,
    /// Keyed hash of the recipient address.
    pub to: String,
    pub subject: String,
    pub status: String,
}

pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for ContactEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for EmailLogEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Most-recent-first list bounded by count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollingLog<T> {
    entries: Vec<T>,
}

impl<T> Default for RollingLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Timestamped> RollingLog<T> {
    pub fn from_entries(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.insert(0, entry);
        self.entries.truncate(ROLLING_LOG_CAPACITY);
    }

    /// Drops everything at or before `now - max_age`. Returns how many were removed.
    pub fn retain_newer_than(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let cutoff = now - max_age;
        let before = self.entries.len();
        self.entries.retain(|entry| entry.timestamp() > cutoff);
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at: DateTime<Utc>, subject: &str) -> EmailLogEntry {
        EmailLogEntry {
            timestamp: at,
            to: "hash".to_string(),
            subject: subject.to_string(),
            status: "sent".to_string(),
        }
    }

    #[test]
    fn test_push_keeps_most_recent_first_and_caps() {
        let now = Utc::now();
        let mut log = RollingLog::default();
        for i in 0..60 {
            log.push(entry(now, &format!("mail {}", i)));
        }

        assert_eq!(log.len(), ROLLING_LOG_CAPACITY);
        assert_eq!(log.entries()[0].subject, "mail 59");
        assert_eq!(log.entries()[49].subject, "mail 10");
    }

    #[test]
    fn test_retention_drops_old_entries() {
        let now = Utc::now();
        let mut log = RollingLog::from_entries(vec![
            entry(now - Duration::days(1), "recent"),
            entry(now - Duration::days(31), "old"),
        ]);

        let removed = log.retain_newer_than(now, Duration::days(EMAIL_LOG_RETENTION_DAYS));

        assert_eq!(removed, 1);
        assert_eq!(log.entries()[0].subject, "recent");
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut log = RollingLog::default();
        log.push(entry(Utc::now(), "hello"));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
    }
}
