use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::api::{decode_shape, ServiceClient};
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::objectives::{
    CreateObjectiveRequest, DailyObjective, DailyProgress, HistoryWindow,
};

const ENDPOINT_HISTORY: &str = "GET /job-applications/daily-progress/history";

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgressHistory {
    Wrapped { data: Vec<DailyProgress> },
    Bare(Vec<DailyProgress>),
}

/// Client for daily objectives and progress, mounted under
/// `{jobs}/job-applications`.
#[derive(Clone)]
pub struct DailyObjectivesClient {
    service: ServiceClient,
}

impl DailyObjectivesClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, format!("{jobs_api_url}/job-applications")),
        }
    }

    pub async fn create_objective(
        &self,
        request: &CreateObjectiveRequest,
    ) -> Result<DailyObjective, ApiError> {
        self.service
            .send(ApiRequest::post(self.service.url("/daily-objectives")).json(request)?)
            .await
    }

    pub async fn get_objective(&self) -> Result<DailyObjective, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url("/daily-objectives")))
            .await
    }

    pub async fn update_objective(
        &self,
        request: &CreateObjectiveRequest,
    ) -> Result<DailyObjective, ApiError> {
        self.service
            .send(ApiRequest::patch(self.service.url("/daily-objectives")).json(request)?)
            .await
    }

    pub async fn get_today_progress(&self) -> Result<DailyProgress, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url("/daily-progress/today")))
            .await
    }

    /// A date range is sent as `from`/`to`; otherwise the preset is sent.
    pub async fn get_historical_progress(
        &self,
        window: HistoryWindow,
    ) -> Result<Vec<DailyProgress>, ApiError> {
        let request = ApiRequest::get(self.service.url("/daily-progress/history"));
        let request = match window {
            HistoryWindow::Range { from, to } => request
                .query("from", from.format("%Y-%m-%d"))
                .query("to", to.format("%Y-%m-%d")),
            HistoryWindow::Preset(preset) => request.query("preset", preset.as_str()),
        };

        let data: Value = self.service.send(request).await?;
        Ok(match decode_shape(ENDPOINT_HISTORY, data)? {
            ProgressHistory::Wrapped { data } | ProgressHistory::Bare(data) => data,
        })
    }
}
