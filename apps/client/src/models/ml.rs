//! Recommendation and analytics payloads from the ML service.
//! These are returned bare, without the `{ success, data }` envelope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tier {
    S,
    A,
    B,
    C,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanySnapshot {
    #[serde(default)]
    pub response_rate: Option<f64>,
    #[serde(default)]
    pub average_response_time_days: Option<f64>,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub total_applications: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserHistory {
    #[serde(default)]
    pub previous_applications_to_company: Option<u64>,
    #[serde(default)]
    pub previous_success_with_company: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub application_id: String,
    pub score: f64,
    pub tier: Tier,
    pub explanation: String,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company_metrics: Option<CompanySnapshot>,
    #[serde(default)]
    pub user_metrics: Option<UserHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
    pub count: u32,
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalaryRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMetrics {
    pub total_applications: u64,
    #[serde(default)]
    pub accepted_count: Option<u64>,
    #[serde(default)]
    pub rejected_count: Option<u64>,
    #[serde(default)]
    pub pending_count: Option<u64>,
    pub success_rate: f64,
    #[serde(default)]
    pub avg_response_time: Option<f64>,
    #[serde(default)]
    pub average_response_time_days: Option<f64>,
    #[serde(default)]
    pub fastest_response_days: Option<f64>,
    #[serde(default)]
    pub slowest_response_days: Option<f64>,
    #[serde(default)]
    pub avg_salary_range: Option<SalaryRange>,
    #[serde(default)]
    pub preferred_company_sizes: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyMetrics {
    pub company_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub normalized_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub response_rate: Option<f64>,
    // The service has emitted both spellings over time.
    #[serde(default, alias = "avg_response_time_days")]
    pub average_response_time_days: Option<f64>,
    #[serde(default)]
    pub success_rate: Option<f64>,
    pub total_applications: u64,
    #[serde(default)]
    pub company_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityPoint {
    pub date: String,
    pub applications_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsOverview {
    pub total_applications: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
    #[serde(default)]
    pub avg_salary_range: Option<SalaryRange>,
    #[serde(default)]
    pub preferred_company_sizes: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub user_metrics: Option<UserMetrics>,
    #[serde(default)]
    pub top_companies: Vec<CompanyMetrics>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct GetRecommendationsParams {
    pub limit: Option<u32>,
    pub tier: Option<Tier>,
}
