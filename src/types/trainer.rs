// src/types/trainer.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TrainerStatus {
    Pending,
    Approved,
    Rejected,
}

impl TrainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TrainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Junior,
    Intermediaire,
    Senior,
    Expert,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 4] = [
        Self::Junior,
        Self::Intermediaire,
        Self::Senior,
        Self::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Intermediaire => "intermediaire",
            Self::Senior => "senior",
            Self::Expert => "expert",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown experience level: {}", s))
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trainer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub linkedin_url: String,
    pub specialties: String,
    pub intervention_regions: String,
    pub experience: String,
    pub experience_level: ExperienceLevel,
    pub availability: String,
    pub hourly_rate: String,
    pub hourly_rate_value: i64,
    pub bio: String,
    pub cv_file: String,
    pub photo_file: String,
    pub rgpd_consent: bool,
    pub marketing_consent: bool,
    pub status: TrainerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trainer {
    pub fn specialty_list(&self) -> Vec<String> {
        split_list(&self.specialties)
    }

    pub fn region_list(&self) -> Vec<String> {
        split_list(&self.intervention_regions)
    }

    pub fn has_cv(&self) -> bool {
        !self.cv_file.is_empty()
    }

    /// Four-digit public reference, e.g. `0007`.
    pub fn public_reference(&self) -> String {
        format!("{:04}", self.id)
    }
}

/// Record about to be inserted; the id and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewTrainer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub linkedin_url: String,
    pub specialties: Vec<String>,
    pub intervention_regions: Vec<String>,
    pub experience: String,
    pub experience_level: ExperienceLevel,
    pub availability: String,
    pub hourly_rate: String,
    pub bio: String,
    pub cv_file: String,
    pub photo_file: String,
    pub rgpd_consent: bool,
    pub marketing_consent: bool,
    pub status: TrainerStatus,
}

impl NewTrainer {
    pub fn specialties_joined(&self) -> String {
        self.specialties.join(", ")
    }

    pub fn regions_joined(&self) -> String {
        self.intervention_regions.join(", ")
    }

    /// Numeric rate used by the rate-bucket filter: every non-digit is dropped,
    /// an empty result counts as 0.
    pub fn hourly_rate_value(&self) -> i64 {
        rate_value(&self.hourly_rate)
    }
}

pub fn rate_value(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(if digits.is_empty() { 0 } else { i64::MAX })
}

pub fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Public projection used by the directory listings: no contact details.
#[derive(Debug, Clone, Serialize)]
pub struct TrainerCard {
    pub id: i64,
    pub display_name: String,
    pub company: String,
    pub specialties: Vec<String>,
    pub intervention_regions: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub availability: String,
    pub hourly_rate: String,
    pub photo_url: Option<String>,
    pub cv_available: bool,
    pub created_at: DateTime<Utc>,
}

/// Detailed profile returned by `get_trainer_profile`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainerProfile {
    pub id: i64,
    pub display_name: String,
    pub company: String,
    pub specialties: Vec<String>,
    pub intervention_regions: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub availability: String,
    pub hourly_rate: String,
    pub experience: String,
    pub bio: String,
    pub linkedin_url: String,
    pub created_at: DateTime<Utc>,
    pub photo_url: String,
    pub cv_available: bool,
}
