use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::api::objectives::DailyObjectivesClient;
use crate::errors::ApiError;
use crate::models::objectives::{
    CreateObjectiveRequest, DailyObjective, DailyProgress, HistoryWindow,
};
use crate::stores::auth::AuthStore;
use crate::stores::toast::{ToastKind, ToastStore};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectivesState {
    pub objective: Option<DailyObjective>,
    pub today_progress: Option<DailyProgress>,
    pub historical_progress: Vec<DailyProgress>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_objective: bool,
}

/// Daily objectives and progress. Failures are reported as toasts and kept
/// in `error`; an auth failure also ends the session.
#[derive(Clone)]
pub struct ObjectivesStore {
    objectives: DailyObjectivesClient,
    auth: AuthStore,
    toasts: ToastStore,
    state: Arc<watch::Sender<ObjectivesState>>,
}

impl ObjectivesStore {
    pub fn new(objectives: DailyObjectivesClient, auth: AuthStore, toasts: ToastStore) -> Self {
        let (tx, _) = watch::channel(ObjectivesState::default());
        Self {
            objectives,
            auth,
            toasts,
            state: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ObjectivesState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ObjectivesState {
        self.state.borrow().clone()
    }

    /// Loads the current objective and today's progress.
    pub async fn init(&self) {
        self.start_loading();

        let loaded = async {
            let objective = self.objectives.get_objective().await?;
            let today = self.objectives.get_today_progress().await?;
            Ok::<_, ApiError>((objective, today))
        }
        .await;

        match loaded {
            Ok((objective, today)) => self.state.send_modify(|s| {
                s.objective = Some(objective);
                s.today_progress = Some(today);
                s.has_objective = true;
                s.is_loading = false;
            }),
            Err(e) => {
                let message = self.report(&e);
                self.state.send_modify(|s| {
                    s.has_objective = false;
                    s.is_loading = false;
                    s.error = Some(message);
                });
            }
        }
    }

    pub async fn create_objective(
        &self,
        targets: CreateObjectiveRequest,
    ) -> Result<DailyObjective, ApiError> {
        self.start_loading();
        match self.objectives.create_objective(&targets).await {
            Ok(objective) => {
                self.state.send_modify(|s| {
                    s.objective = Some(objective.clone());
                    s.has_objective = true;
                    s.is_loading = false;
                });
                Ok(objective)
            }
            Err(e) => Err(self.fail_loading(e)),
        }
    }

    pub async fn update_objective(
        &self,
        targets: CreateObjectiveRequest,
    ) -> Result<DailyObjective, ApiError> {
        self.start_loading();
        match self.objectives.update_objective(&targets).await {
            Ok(objective) => {
                self.state.send_modify(|s| {
                    s.objective = Some(objective.clone());
                    s.is_loading = false;
                });
                Ok(objective)
            }
            Err(e) => Err(self.fail_loading(e)),
        }
    }

    pub async fn load_today_progress(&self) {
        match self.objectives.get_today_progress().await {
            Ok(today) => self.state.send_modify(|s| s.today_progress = Some(today)),
            Err(e) => self.record_error(&e),
        }
    }

    pub async fn load_historical_progress(&self, window: HistoryWindow) {
        match self.objectives.get_historical_progress(window).await {
            Ok(history) => self.state.send_modify(|s| s.historical_progress = history),
            Err(e) => self.record_error(&e),
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    fn start_loading(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn fail_loading(&self, err: ApiError) -> ApiError {
        let message = self.report(&err);
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.error = Some(message);
        });
        err
    }

    fn record_error(&self, err: &ApiError) {
        let message = self.report(err);
        self.state.send_modify(|s| s.error = Some(message));
    }

    /// Toasts the failure and returns the message to keep in `error`.
    fn report(&self, err: &ApiError) -> String {
        let message = err.to_string();
        if err.is_auth_failure() {
            warn!("Objectives request rejected, ending session: {message}");
            self.auth.clear();
            self.toasts.show_toast(ToastKind::Error, SESSION_EXPIRED_MESSAGE);
        } else {
            warn!("Objectives request failed: {message}");
            self.toasts.show_toast(ToastKind::Error, message.clone());
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::objectives::tests::{objective_json, progress_json};
    use crate::credentials::CredentialStore;
    use crate::gateway::testing::*;
    use crate::stores::auth::tests::{auth_store, profile_json};
    use serde_json::json;

    fn stores(
        transport: Arc<FakeTransport>,
        creds: Arc<dyn CredentialStore>,
    ) -> (ObjectivesStore, AuthStore, ToastStore) {
        let auth = auth_store(transport.clone(), creds.clone());
        let toasts = ToastStore::new();
        let objectives = ObjectivesStore::new(
            DailyObjectivesClient::new(gateway(transport, creds), JOBS_BASE),
            auth.clone(),
            toasts.clone(),
        );
        (objectives, auth, toasts)
    }

    fn targets() -> CreateObjectiveRequest {
        CreateObjectiveRequest {
            total_target: 10,
            junior_target: 3,
            pleno_target: 4,
            senior_target: 3,
        }
    }

    #[tokio::test]
    async fn test_init_loads_objective_and_today() {
        let transport = FakeTransport::new(|call| {
            if call.url.ends_with("/daily-objectives") {
                ok(objective_json())
            } else {
                ok(progress_json("2024-03-05", 4))
            }
        });
        let (store, _, toasts) = stores(transport, credentials("a1", "r1"));

        store.init().await;

        let state = store.snapshot();
        assert!(state.has_objective);
        assert!(!state.is_loading);
        assert_eq!(state.objective.unwrap().id, "obj-1");
        assert_eq!(state.today_progress.unwrap().total_count, 4);
        assert!(state.error.is_none());
        assert!(toasts.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_ends_session_with_toast() {
        let transport = FakeTransport::new(|call| {
            if call.url.ends_with("/refresh") {
                respond(401, json!({"message": "refresh token expired"}))
            } else if call.url.ends_with("/profile") {
                ok(profile_json())
            } else {
                unauthorized()
            }
        });
        let creds = credentials("a1", "r1");
        let (store, auth, toasts) = stores(transport, creds.clone());
        auth.init().await;
        assert!(auth.is_authenticated());

        store.init().await;

        assert!(!auth.is_authenticated());
        assert!(!creds.is_authenticated());
        let shown = toasts.toasts();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, SESSION_EXPIRED_MESSAGE);
        assert_eq!(shown[0].kind, ToastKind::Error);

        let state = store.snapshot();
        assert!(!state.has_objective);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_other_failure_toasts_its_message() {
        let transport = FakeTransport::new(|_| respond(500, json!({"message": "database unavailable"})));
        let creds = credentials("a1", "r1");
        let (store, _, toasts) = stores(transport, creds.clone());

        store.load_today_progress().await;

        let shown = toasts.toasts();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].message.contains("database unavailable"));
        assert!(creds.is_authenticated());
        assert!(store.snapshot().error.unwrap().contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_create_failure_is_returned_and_recorded() {
        let transport = FakeTransport::new(|_| respond(422, json!({"error": "targets must add up"})));
        let (store, _, _) = stores(transport, credentials("a1", "r1"));

        let err = store.create_objective(targets()).await.unwrap_err();

        assert_eq!(err.status(), Some(422));
        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(!state.has_objective);
        assert!(state.error.is_some());

        store.clear_error();
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_create_success_marks_objective_present() {
        let transport = FakeTransport::new(|_| ok(objective_json()));
        let (store, _, _) = stores(transport, credentials("a1", "r1"));

        let objective = store.create_objective(targets()).await.unwrap();

        assert_eq!(objective.total_target, 10);
        let state = store.snapshot();
        assert!(state.has_objective);
        assert_eq!(state.objective, Some(objective));
    }

    #[tokio::test]
    async fn test_load_history_replaces_previous() {
        let transport = FakeTransport::new(|_| {
            ok(json!({"data": [progress_json("2024-03-01", 1), progress_json("2024-03-02", 2)]}))
        });
        let (store, _, _) = stores(transport, credentials("a1", "r1"));

        store.load_historical_progress(HistoryWindow::default()).await;
        store.load_historical_progress(HistoryWindow::default()).await;

        assert_eq!(store.snapshot().historical_progress.len(), 2);
    }
}
