// src/web/types.rs
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::request::{FromRequest, Outcome};
use rocket::serde::Serialize;
use rocket::Request;
use std::convert::Infallible;

use crate::search::{FiltersApplied, Pagination, RateBucket, SearchCriteria};
use crate::types::{TrainerCard, TrainerProfile, TrainerStatus};

const MAX_USER_AGENT_CHARS: usize = 255;

// ===== Forms =====

#[derive(FromForm)]
pub struct RegistrationForm<'r> {
    #[field(default = String::new())]
    pub nonce: String,
    #[field(default = String::new())]
    pub first_name: String,
    #[field(default = String::new())]
    pub last_name: String,
    #[field(default = String::new())]
    pub email: String,
    #[field(default = String::new())]
    pub country_code: String,
    #[field(default = String::new())]
    pub custom_country_code: String,
    #[field(default = String::new())]
    pub phone: String,
    #[field(default = String::new())]
    pub company: String,
    #[field(default = String::new())]
    pub linkedin_url: String,
    #[field(default = Vec::new())]
    pub specialties: Vec<String>,
    #[field(default = Vec::new())]
    pub intervention_regions: Vec<String>,
    #[field(default = String::new())]
    pub experience: String,
    #[field(default = String::new())]
    pub experience_level: String,
    #[field(default = String::new())]
    pub availability: String,
    #[field(default = String::new())]
    pub hourly_rate: String,
    #[field(default = String::new())]
    pub bio: String,
    pub rgpd_consent: bool,
    pub marketing_consent: bool,
    pub cv_file: Option<TempFile<'r>>,
    pub photo_file: Option<TempFile<'r>>,
}

#[derive(Debug, FromForm)]
pub struct SearchForm {
    #[field(default = String::new())]
    pub nonce: String,
    #[field(default = String::new())]
    pub search_term: String,
    #[field(default = String::new())]
    pub specialty_filter: String,
    #[field(default = String::new())]
    pub region_filter: String,
    #[field(default = String::new())]
    pub experience_filter: String,
    #[field(default = String::new())]
    pub availability_filter: String,
    pub page: Option<i64>,
}

impl SearchForm {
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            search_term: clean(&self.search_term),
            specialty: clean(&self.specialty_filter),
            region: clean(&self.region_filter),
            multi_regions: Vec::new(),
            experience_level: clean(&self.experience_filter),
            availability: clean(&self.availability_filter),
            rate: None,
        }
    }
}

#[derive(Debug, FromForm)]
pub struct AdvancedSearchForm {
    #[field(default = String::new())]
    pub nonce: String,
    #[field(default = String::new())]
    pub search_term: String,
    #[field(default = String::new())]
    pub specialty_filter: String,
    #[field(default = String::new())]
    pub region_filter: String,
    #[field(default = Vec::new())]
    pub multi_regions: Vec<String>,
    #[field(default = String::new())]
    pub availability_filter: String,
    #[field(default = String::new())]
    pub experience_filter: String,
    #[field(default = String::new())]
    pub rate_filter: String,
    pub per_page: Option<i64>,
    pub page: Option<i64>,
}

/// Echo of the normalised advanced search parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AdvancedSearchParams {
    pub search_term: String,
    pub specialty_filter: String,
    pub region_filter: String,
    pub multi_regions: Vec<String>,
    pub availability_filter: String,
    pub experience_filter: String,
    pub rate_filter: String,
    pub per_page: i64,
    pub page: i64,
}

impl AdvancedSearchForm {
    pub fn params(&self) -> AdvancedSearchParams {
        AdvancedSearchParams {
            search_term: clean(&self.search_term),
            specialty_filter: clean(&self.specialty_filter),
            region_filter: clean(&self.region_filter),
            multi_regions: self
                .multi_regions
                .iter()
                .map(|region| clean(region))
                .filter(|region| !region.is_empty())
                .collect(),
            availability_filter: clean(&self.availability_filter),
            experience_filter: clean(&self.experience_filter),
            rate_filter: clean(&self.rate_filter),
            per_page: crate::search::clamp_per_page(self.per_page),
            page: crate::search::clamp_page(self.page),
        }
    }
}

impl AdvancedSearchParams {
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            search_term: self.search_term.clone(),
            specialty: self.specialty_filter.clone(),
            region: self.region_filter.clone(),
            multi_regions: self.multi_regions.clone(),
            experience_level: self.experience_filter.clone(),
            availability: self.availability_filter.clone(),
            // an unknown bucket applies no rate restriction
            rate: self.rate_filter.parse::<RateBucket>().ok(),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct ProfileForm {
    #[field(default = String::new())]
    pub nonce: String,
    pub trainer_id: Option<i64>,
}

#[derive(Debug, FromForm)]
pub struct ContactForm {
    #[field(default = String::new())]
    pub nonce: String,
    #[field(default = String::new())]
    pub contact_name: String,
    #[field(default = String::new())]
    pub contact_email: String,
    #[field(default = String::new())]
    pub contact_company: String,
    #[field(default = String::new())]
    pub contact_message: String,
    pub trainer_id: Option<i64>,
}

fn clean(value: &str) -> String {
    crate::utils::sanitize_text_field(value)
}

/// Requester address and agent, recorded with contact requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let user_agent = req
            .headers()
            .get_one("User-Agent")
            .map(|agent| crate::utils::truncate_chars(agent, MAX_USER_AGENT_CHARS))
            .unwrap_or_default();

        Outcome::Success(ClientInfo { ip, user_agent })
    }
}

// ===== Responses =====

/// Failure body of every endpoint, delivered with HTTP 200.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<String>,
}

impl StandardErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
            code: code.into(),
            suggestion: None,
            technical: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_technical(mut self, technical: impl Into<String>) -> Self {
        self.technical = Some(technical.into());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct NonceResponse {
    pub success: bool,
    pub nonce: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub trainer_id: i64,
    pub redirect: String,
    pub status: TrainerStatus,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SearchResponse {
    pub success: bool,
    pub trainers: Vec<TrainerCard>,
    pub html: String,
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub filters_applied: FiltersApplied,
}

impl SearchResponse {
    pub fn new(
        trainers: Vec<TrainerCard>,
        html: String,
        pagination: Pagination,
        filters_applied: FiltersApplied,
    ) -> Self {
        Self {
            success: true,
            trainers,
            html,
            total: pagination.total,
            per_page: pagination.per_page,
            current_page: pagination.current_page,
            total_pages: pagination.total_pages,
            has_next: pagination.has_next,
            has_prev: pagination.has_prev,
            filters_applied,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AdvancedSearchResponse {
    pub success: bool,
    pub trainers: Vec<TrainerCard>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub search_params: AdvancedSearchParams,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub profile: TrainerProfile,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    pub details: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub database: String,
}
