use std::sync::Arc;

use tracing::info;

use crate::api::ServiceClient;
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, Profile,
    ProfileUpdateRequest, RefreshTokenRequest, RegisterRequest,
};

/// Client for the auth service's `/auth` routes.
///
/// Register, login and refresh write the issued pair into the credential
/// store after a successful response; logout and logout-all clear it after
/// the remote call succeeds.
#[derive(Clone)]
pub struct AuthClient {
    service: ServiceClient,
}

impl AuthClient {
    pub fn new(gateway: Arc<Gateway>, auth_base_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, auth_base_url),
        }
    }

    /// POST /auth/register
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let auth = self
            .issue(ApiRequest::post(self.service.url("/register")).json(request)?)
            .await?;
        info!("Registered user {}", auth.user.username);
        Ok(auth)
    }

    /// POST /auth/login
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let auth = self
            .issue(ApiRequest::post(self.service.url("/login")).json(request)?)
            .await?;
        info!("Logged in as {}", auth.user.username);
        Ok(auth)
    }

    /// POST /auth/refresh. Explicit exchange, outside the gateway's own
    /// refresh path.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.issue(ApiRequest::post(self.service.url("/refresh")).json(&body)?)
            .await
    }

    /// POST /auth/logout
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.service
            .send_empty(ApiRequest::post(self.service.url("/logout")).json(&body)?)
            .await?;
        self.credentials().clear_tokens();
        info!("Logged out; credentials cleared");
        Ok(())
    }

    /// POST /auth/logout-all
    pub async fn logout_all(&self) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::post(self.service.url("/logout-all")))
            .await?;
        self.credentials().clear_tokens();
        info!("Logged out of all devices; credentials cleared");
        Ok(())
    }

    /// GET /auth/verify-email?token=
    pub async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::get(self.service.url("/verify-email")).query("token", token))
            .await
    }

    /// GET /auth/profile
    pub async fn get_profile(&self) -> Result<Profile, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url("/profile")))
            .await
    }

    /// PUT /auth/profile
    pub async fn update_profile(&self, request: &ProfileUpdateRequest) -> Result<Profile, ApiError> {
        self.service
            .send(ApiRequest::put(self.service.url("/profile")).json(request)?)
            .await
    }

    /// POST /auth/change-password
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::post(self.service.url("/change-password")).json(request)?)
            .await
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials().access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.credentials().refresh_token()
    }

    /// Local sign-out without contacting the auth service.
    pub fn clear_credentials(&self) {
        self.credentials().clear_tokens();
    }

    fn credentials(&self) -> &Arc<dyn crate::credentials::CredentialStore> {
        self.service.gateway().credentials()
    }

    /// Credential-issuing calls are public endpoints: a 401 means bad
    /// credentials, so it is returned as-is instead of triggering a refresh.
    async fn issue(&self, request: ApiRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self.service.send(request.no_refresh()).await?;
        self.credentials().set_tokens(&auth.credentials());
        Ok(auth)
    }
}
