pub mod auth;
pub mod catalog;
pub mod interview_stage;
pub mod job_application;
pub mod ml;
pub mod objectives;
pub mod resume;

use serde::Deserialize;

/// Success envelope wrapped around every auth and jobs service payload:
/// `{ success, message?, data }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

fn default_success() -> bool {
    true
}
