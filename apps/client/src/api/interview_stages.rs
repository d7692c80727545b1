use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::api::{decode_shape, ServiceClient};
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::interview_stage::{
    CreateInterviewStageRequest, InterviewStage, ListInterviewStagesParams,
    UpdateInterviewStageRequest,
};

/// Payload shapes returned by `POST .../interview-stages`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedStage {
    List(Vec<InterviewStage>),
    Wrapped { stages: Vec<InterviewStage> },
    Single(InterviewStage),
}

/// Payload shapes returned by `GET .../interview-stages`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StageList {
    Bare(Vec<InterviewStage>),
    Stages { stages: Vec<InterviewStage> },
    Data { data: Vec<InterviewStage> },
}

impl From<StageList> for Vec<InterviewStage> {
    fn from(list: StageList) -> Self {
        match list {
            StageList::Bare(stages) | StageList::Stages { stages } | StageList::Data { data: stages } => {
                stages
            }
        }
    }
}

/// Client for `{jobs}/job-applications/{appId}/interview-stages`.
#[derive(Clone)]
pub struct InterviewStagesClient {
    service: ServiceClient,
}

impl InterviewStagesClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, format!("{jobs_api_url}/job-applications")),
        }
    }

    fn stages_url(&self, job_application_id: &str) -> String {
        self.service
            .url(&format!("/{job_application_id}/interview-stages"))
    }

    fn stage_url(&self, job_application_id: &str, stage_id: &str) -> String {
        format!("{}/{stage_id}", self.stages_url(job_application_id))
    }

    /// Returns the created stage; when the backend answers with a list,
    /// the first element.
    pub async fn create(
        &self,
        job_application_id: &str,
        request: &CreateInterviewStageRequest,
    ) -> Result<InterviewStage, ApiError> {
        let data: Value = self
            .service
            .send(ApiRequest::post(self.stages_url(job_application_id)).json(request)?)
            .await?;

        match decode_shape(ENDPOINT_CREATE, data)? {
            CreatedStage::Single(stage) => Ok(stage),
            CreatedStage::List(stages) | CreatedStage::Wrapped { stages } => stages
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::unexpected_shape(ENDPOINT_CREATE, "empty stage list")),
        }
    }

    pub async fn get(
        &self,
        job_application_id: &str,
        stage_id: &str,
    ) -> Result<InterviewStage, ApiError> {
        self.service
            .send(ApiRequest::get(self.stage_url(job_application_id, stage_id)))
            .await
    }

    pub async fn update(
        &self,
        job_application_id: &str,
        stage_id: &str,
        request: &UpdateInterviewStageRequest,
    ) -> Result<InterviewStage, ApiError> {
        self.service
            .send(ApiRequest::put(self.stage_url(job_application_id, stage_id)).json(request)?)
            .await
    }

    pub async fn delete(&self, job_application_id: &str, stage_id: &str) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::delete(self.stage_url(job_application_id, stage_id)))
            .await
    }

    pub async fn list(
        &self,
        params: &ListInterviewStagesParams,
    ) -> Result<Vec<InterviewStage>, ApiError> {
        let request = ApiRequest::get(self.stages_url(&params.job_application_id))
            .query_opt("page", params.page.filter(|p| *p > 0))
            .query_opt("limit", params.limit.filter(|l| *l > 0));
        let data: Value = self.service.send(request).await?;
        Ok(decode_shape::<StageList>(ENDPOINT_LIST, data)?.into())
    }
}

const ENDPOINT_CREATE: &str = "POST /job-applications/{id}/interview-stages";
const ENDPOINT_LIST: &str = "GET /job-applications/{id}/interview-stages";
