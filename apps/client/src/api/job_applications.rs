use std::sync::Arc;

use crate::api::ServiceClient;
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::job_application::{
    CreateJobApplicationRequest, JobApplication, ListJobApplicationsParams,
    PaginatedApplications, UpdateJobApplicationRequest, UpdateJobApplicationStatusRequest,
};

/// Client for `{jobs}/job-applications`.
#[derive(Clone)]
pub struct JobApplicationsClient {
    service: ServiceClient,
}

impl JobApplicationsClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, format!("{jobs_api_url}/job-applications")),
        }
    }

    pub async fn create(
        &self,
        request: &CreateJobApplicationRequest,
    ) -> Result<JobApplication, ApiError> {
        self.service
            .send(ApiRequest::post(self.service.url("/")).json(request)?)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<JobApplication, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url(&format!("/{id}"))))
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateJobApplicationRequest,
    ) -> Result<JobApplication, ApiError> {
        self.service
            .send(ApiRequest::patch(self.service.url(&format!("/{id}"))).json(request)?)
            .await
    }

    pub async fn update_status(
        &self,
        id: &str,
        request: &UpdateJobApplicationStatusRequest,
    ) -> Result<JobApplication, ApiError> {
        self.service
            .send(ApiRequest::patch(self.service.url(&format!("/{id}/status"))).json(request)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::delete(self.service.url(&format!("/{id}"))))
            .await
    }

    pub async fn list(
        &self,
        params: &ListJobApplicationsParams,
    ) -> Result<PaginatedApplications, ApiError> {
        self.service
            .send(list_request(self.service.url("/"), params))
            .await
    }
}

/// Page and limit of zero are treated as unset.
fn list_request(url: String, params: &ListJobApplicationsParams) -> ApiRequest {
    let mut request = ApiRequest::get(url)
        .query_opt("page", params.page.filter(|p| *p > 0))
        .query_opt("limit", params.limit.filter(|l| *l > 0))
        .query_opt("website", params.website.as_deref())
        .query_opt("status", params.status.map(|s| s.as_str()))
        .query_opt("resumeId", params.resume_id.as_deref())
        .query_opt("interestLevel", params.interest_level.map(|l| l.as_str()))
        .query_opt("source", params.source.as_deref())
        .query_opt("applicationMethod", params.application_method.as_deref())
        .query_opt("language", params.language.as_deref())
        .query_opt("appliedDateFrom", params.applied_date_from.as_deref())
        .query_opt("appliedDateTo", params.applied_date_to.as_deref());
    for tag in &params.tags {
        request = request.query("tags", tag);
    }
    request
}
