use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::auth::AuthClient;
use crate::models::auth::{Profile, User};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            profile: None,
            is_authenticated: false,
            is_loading: true,
        }
    }
}

/// Observable session state, backed by the credential store.
#[derive(Clone)]
pub struct AuthStore {
    auth: AuthClient,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthStore {
    pub fn new(auth: AuthClient) -> Self {
        let (tx, _) = watch::channel(AuthState::default());
        Self {
            auth,
            state: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Restores the session from stored credentials by fetching the profile.
    /// A failed fetch means the stored tokens are unusable and they are
    /// discarded.
    pub async fn init(&self) {
        if !self.auth.is_authenticated() {
            self.state.send_modify(|s| s.is_loading = false);
            return;
        }

        match self.auth.get_profile().await {
            Ok(profile) => {
                let user = profile.user.as_deref().cloned();
                self.state.send_modify(|s| {
                    s.user = user;
                    s.profile = Some(profile);
                    s.is_authenticated = true;
                    s.is_loading = false;
                });
            }
            Err(e) => {
                warn!("Stored session is not usable, signing out: {e}");
                self.clear();
            }
        }
    }

    pub fn set_user(&self, user: User, profile: Option<Profile>) {
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.profile = profile;
            s.is_authenticated = true;
            s.is_loading = false;
        });
    }

    pub fn set_profile(&self, profile: Profile) {
        self.state.send_modify(|s| s.profile = Some(profile));
    }

    /// Local sign-out: drops stored credentials and resets the state.
    pub fn clear(&self) {
        self.auth.clear_credentials();
        self.state.send_modify(|s| {
            s.user = None;
            s.profile = None;
            s.is_authenticated = false;
            s.is_loading = false;
        });
        info!("Session cleared");
    }

    pub async fn refresh_profile(&self) {
        match self.auth.get_profile().await {
            Ok(profile) => self.set_profile(profile),
            Err(e) => {
                warn!("Profile refresh failed, signing out: {e}");
                self.clear();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::gateway::testing::*;
    use serde_json::{json, Value};

    pub(crate) fn profile_json() -> Value {
        json!({
            "id": "p-1",
            "user_id": "u-1",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "user": user_json()
        })
    }

    pub(crate) fn auth_store(
        transport: Arc<FakeTransport>,
        creds: Arc<dyn CredentialStore>,
    ) -> AuthStore {
        AuthStore::new(AuthClient::new(gateway(transport, creds), AUTH_BASE))
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let transport = FakeTransport::new(|_| ok(profile_json()));
        let store = auth_store(transport, Arc::new(MemoryCredentialStore::new()));
        assert!(store.is_loading());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_init_without_token_skips_network() {
        let transport = FakeTransport::new(|_| ok(profile_json()));
        let store = auth_store(transport.clone(), Arc::new(MemoryCredentialStore::new()));

        store.init().await;

        assert!(!store.is_loading());
        assert!(!store.is_authenticated());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_init_with_valid_session_loads_profile_and_user() {
        let transport = FakeTransport::new(|_| ok(profile_json()));
        let store = auth_store(transport, credentials("a1", "r1"));

        store.init().await;

        let state = store.snapshot();
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.user.unwrap().username, "ada");
        assert_eq!(state.profile.unwrap().id, "p-1");
    }

    #[tokio::test]
    async fn test_init_with_dead_session_clears_tokens() {
        let transport = FakeTransport::new(|call| {
            if call.url.ends_with("/refresh") {
                respond(401, json!({"message": "refresh token revoked"}))
            } else {
                unauthorized()
            }
        });
        let creds = credentials("a1", "r1");
        let store = auth_store(transport, creds.clone());

        store.init().await;

        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
        assert!(creds.access_token().is_none());
        assert!(creds.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_clear_notifies_and_drops_tokens() {
        let transport = FakeTransport::new(|_| ok(profile_json()));
        let creds = credentials("a1", "r1");
        let store = auth_store(transport, creds.clone());
        store.init().await;
        let mut rx = store.subscribe();

        store.clear();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated);
        assert!(!creds.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_profile_failure_signs_out() {
        let transport = FakeTransport::new(|_| respond(500, json!({"message": "boom"})));
        let store = auth_store(transport, credentials("a1", "r1"));
        store.set_user(serde_json::from_value(user_json()).unwrap(), None);
        assert!(store.is_authenticated());

        store.refresh_profile().await;

        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
    }
}
