use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyObjective {
    pub id: String,
    pub user_id: String,
    pub total_target: u32,
    pub junior_target: u32,
    pub pleno_target: u32,
    pub senior_target: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts for one day against the targets in force that day.
/// The `*_progress` fields are percentages (0 to 100).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub total_count: u32,
    pub junior_count: u32,
    pub pleno_count: u32,
    pub senior_count: u32,
    pub total_target: u32,
    pub junior_target: u32,
    pub pleno_target: u32,
    pub senior_target: u32,
    pub total_progress: f64,
    pub junior_progress: f64,
    pub pleno_progress: f64,
    pub senior_progress: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateObjectiveRequest {
    pub total_target: u32,
    pub junior_target: u32,
    pub pleno_target: u32,
    pub senior_target: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryPreset {
    #[default]
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "90days")]
    NinetyDays,
}

impl HistoryPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryPreset::SevenDays => "7days",
            HistoryPreset::ThirtyDays => "30days",
            HistoryPreset::NinetyDays => "90days",
        }
    }
}

impl std::str::FromStr for HistoryPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7days" => Ok(HistoryPreset::SevenDays),
            "30days" => Ok(HistoryPreset::ThirtyDays),
            "90days" => Ok(HistoryPreset::NinetyDays),
            other => Err(format!("unknown history preset '{other}'")),
        }
    }
}

/// Which slice of history to load. An explicit date range wins over a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Preset(HistoryPreset),
    Range { from: NaiveDate, to: NaiveDate },
}

impl Default for HistoryWindow {
    fn default() -> Self {
        HistoryWindow::Preset(HistoryPreset::default())
    }
}

impl HistoryWindow {
    pub fn new(preset: Option<HistoryPreset>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => HistoryWindow::Range { from, to },
            _ => HistoryWindow::Preset(preset.unwrap_or_default()),
        }
    }
}
