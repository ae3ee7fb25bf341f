// src/search.rs
//! Directory search: filter criteria to a parameterised WHERE clause, with
//! relevance ordering and pagination.

use anyhow::Result;
use serde::Serialize;
use std::str::FromStr;

use crate::core::database::{Datastore, SqlFilter, SqlOrder, SqlParam};
use crate::types::{Trainer, TrainerStatus};

pub const DEFAULT_PER_PAGE: i64 = 12;
pub const MAX_PER_PAGE: i64 = 50;

/// Value a select box sends for "no restriction".
const ANY: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateBucket {
    #[serde(rename = "0-50")]
    Under50,
    #[serde(rename = "50-80")]
    From50To80,
    #[serde(rename = "80-120")]
    From80To120,
    #[serde(rename = "120+")]
    Over120,
}

impl RateBucket {
    /// Condition on the numeric rate derived at insert.
    fn condition(&self) -> &'static str {
        match self {
            Self::Under50 => "hourly_rate_value < 50",
            Self::From50To80 => "hourly_rate_value BETWEEN 50 AND 80",
            Self::From80To120 => "hourly_rate_value BETWEEN 80 AND 120",
            Self::Over120 => "hourly_rate_value > 120",
        }
    }
}

impl FromStr for RateBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0-50" => Ok(Self::Under50),
            "50-80" => Ok(Self::From50To80),
            "80-120" => Ok(Self::From80To120),
            "120+" => Ok(Self::Over120),
            other => Err(anyhow::anyhow!("Unknown rate bucket: {}", other)),
        }
    }
}

/// Filters of a directory search. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub search_term: String,
    pub specialty: String,
    pub region: String,
    pub multi_regions: Vec<String>,
    pub experience_level: String,
    pub availability: String,
    pub rate: Option<RateBucket>,
}

impl SearchCriteria {
    fn specialty(&self) -> Option<&str> {
        active(&self.specialty)
    }

    fn region(&self) -> Option<&str> {
        active(&self.region)
    }

    fn term(&self) -> Option<&str> {
        let term = self.search_term.trim();
        (!term.is_empty()).then_some(term)
    }

    /// Which basic filters are in effect, as reported back to the page.
    pub fn applied(&self) -> FiltersApplied {
        FiltersApplied {
            search: self.term().is_some(),
            specialty: self.specialty().is_some(),
            region: self.region().is_some(),
            experience: !self.experience_level.is_empty(),
            availability: !self.availability.is_empty(),
        }
    }
}

fn active(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != ANY).then_some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FiltersApplied {
    pub search: bool,
    pub specialty: bool,
    pub region: bool,
    pub experience: bool,
    pub availability: bool,
}

/// Escape LIKE wildcards; statements pair this with `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

/// Conjunction of every active criterion, always limited to approved trainers.
pub fn build_filter(criteria: &SearchCriteria) -> SqlFilter {
    let mut filter = SqlFilter::new();
    filter.push(
        "status = ?",
        vec![SqlParam::Text(TrainerStatus::Approved.as_str().to_string())],
    );

    if let Some(term) = criteria.term() {
        let columns = [
            "first_name",
            "last_name",
            "company",
            "specialties",
            "experience",
            "bio",
        ];
        let condition = columns
            .iter()
            .map(|column| format!("{} LIKE ? ESCAPE '\\'", column))
            .collect::<Vec<_>>()
            .join(" OR ");
        let pattern = contains_pattern(term);
        filter.push(
            format!("({})", condition),
            vec![SqlParam::Text(pattern); columns.len()],
        );
    }

    if let Some(specialty) = criteria.specialty() {
        filter.push(
            "specialties LIKE ? ESCAPE '\\'",
            vec![SqlParam::Text(contains_pattern(specialty))],
        );
    }

    if let Some(region) = criteria.region() {
        filter.push(
            "intervention_regions LIKE ? ESCAPE '\\'",
            vec![SqlParam::Text(contains_pattern(region))],
        );
    }

    let regions: Vec<&str> = criteria
        .multi_regions
        .iter()
        .map(|region| region.trim())
        .filter(|region| !region.is_empty())
        .collect();
    if !regions.is_empty() {
        let condition = vec!["intervention_regions LIKE ? ESCAPE '\\'"; regions.len()].join(" OR ");
        filter.push(
            format!("({})", condition),
            regions
                .iter()
                .map(|region| SqlParam::Text(contains_pattern(region)))
                .collect(),
        );
    }

    if !criteria.availability.is_empty() {
        filter.push(
            "availability = ?",
            vec![SqlParam::Text(criteria.availability.clone())],
        );
    }

    if !criteria.experience_level.is_empty() {
        filter.push(
            "experience_level = ?",
            vec![SqlParam::Text(criteria.experience_level.clone())],
        );
    }

    if let Some(rate) = criteria.rate {
        filter.push(rate.condition(), Vec::new());
    }

    filter
}

pub fn order_for(criteria: &SearchCriteria) -> SqlOrder {
    match criteria.term() {
        Some(term) => SqlOrder::Relevance {
            pattern: contains_pattern(term),
        },
        None => SqlOrder::Newest,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: i64, per_page: i64, page: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = (total.max(0) + per_page - 1) / per_page;
        Self {
            total,
            per_page,
            current_page: page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.current_page - 1).max(0) * self.per_page
    }
}

/// `per_page` clamped to 1..=50, 12 when absent.
pub fn clamp_per_page(per_page: Option<i64>) -> i64 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub trainers: Vec<Trainer>,
    pub pagination: Pagination,
}

/// Count, then fetch one page.
pub async fn search_trainers(
    datastore: &dyn Datastore,
    criteria: &SearchCriteria,
    page: i64,
    per_page: i64,
) -> Result<SearchPage> {
    let filter = build_filter(criteria);
    let total = datastore.count_trainers(&filter).await?;
    let pagination = Pagination::new(total, per_page, page);

    let trainers = datastore
        .select_trainers(
            &filter,
            &order_for(criteria),
            pagination.per_page,
            pagination.offset(),
        )
        .await?;

    Ok(SearchPage {
        trainers,
        pagination,
    })
}
