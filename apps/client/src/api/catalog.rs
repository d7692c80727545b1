//! Read-only reference data: contract types and job levels.

use std::sync::Arc;

use crate::api::ServiceClient;
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::catalog::{ContractType, JobLevel};

#[derive(Clone)]
pub struct ContractTypesClient {
    service: ServiceClient,
}

impl ContractTypesClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(
                gateway,
                format!("{jobs_api_url}/job-applications/contract-types"),
            ),
        }
    }

    pub async fn get(&self, id: &str) -> Result<ContractType, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url(&format!("/{id}"))))
            .await
    }

    pub async fn list(&self) -> Result<Vec<ContractType>, ApiError> {
        self.service.send(ApiRequest::get(self.service.url("/"))).await
    }
}

#[derive(Clone)]
pub struct JobLevelsClient {
    service: ServiceClient,
}

impl JobLevelsClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, format!("{jobs_api_url}/job-applications/job-levels")),
        }
    }

    pub async fn get(&self, id: &str) -> Result<JobLevel, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url(&format!("/{id}"))))
            .await
    }

    pub async fn list(&self) -> Result<Vec<JobLevel>, ApiError> {
        self.service.send(ApiRequest::get(self.service.url("/"))).await
    }
}
