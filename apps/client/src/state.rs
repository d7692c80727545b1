use std::sync::Arc;

use crate::api::auth::AuthClient;
use crate::api::catalog::{ContractTypesClient, JobLevelsClient};
use crate::api::interview_stages::InterviewStagesClient;
use crate::api::job_applications::JobApplicationsClient;
use crate::api::ml::MlClient;
use crate::api::objectives::DailyObjectivesClient;
use crate::api::resumes::ResumesClient;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::errors::ApiError;
use crate::gateway::{Gateway, ReqwestTransport, Transport};
use crate::stores::{AuthStore, ObjectivesStore, ToastStore};

/// Every client and store, built once over a single shared gateway so all
/// services share one credential store and one refresh state.
#[derive(Clone)]
pub struct Services {
    pub config: Config,
    pub gateway: Arc<Gateway>,
    pub auth: AuthClient,
    pub job_applications: JobApplicationsClient,
    pub interview_stages: InterviewStagesClient,
    pub contract_types: ContractTypesClient,
    pub job_levels: JobLevelsClient,
    pub resumes: ResumesClient,
    pub objectives: DailyObjectivesClient,
    pub ml: MlClient,
    pub toasts: ToastStore,
    pub auth_store: AuthStore,
    pub objectives_store: ObjectivesStore,
}

impl Services {
    /// Production wiring: reqwest transport and the on-disk credential file.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        let credentials = FileCredentialStore::from_optional_path(config.credentials_path.clone());
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(credentials)))
    }

    pub fn with_parts(
        config: &Config,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let gateway = Arc::new(Gateway::new(
            transport,
            credentials,
            &config.auth_base_url(),
            config.refresh_timeout,
        ));

        let jobs = config.jobs_api_url.as_str();
        let auth = AuthClient::new(gateway.clone(), &config.auth_base_url());
        let objectives = DailyObjectivesClient::new(gateway.clone(), jobs);
        let toasts = ToastStore::new();
        let auth_store = AuthStore::new(auth.clone());
        let objectives_store =
            ObjectivesStore::new(objectives.clone(), auth_store.clone(), toasts.clone());

        Self {
            config: config.clone(),
            job_applications: JobApplicationsClient::new(gateway.clone(), jobs),
            interview_stages: InterviewStagesClient::new(gateway.clone(), jobs),
            contract_types: ContractTypesClient::new(gateway.clone(), jobs),
            job_levels: JobLevelsClient::new(gateway.clone(), jobs),
            resumes: ResumesClient::new(gateway.clone(), jobs),
            ml: MlClient::new(gateway.clone(), &config.ml_api_url),
            gateway,
            auth,
            objectives,
            toasts,
            auth_store,
            objectives_store,
        }
    }
}
