//! Observable client-side state built on `tokio::sync::watch`.

pub mod auth;
pub mod objectives;
pub mod toast;

pub use auth::{AuthState, AuthStore};
pub use objectives::{ObjectivesState, ObjectivesStore};
pub use toast::{Toast, ToastKind, ToastStore};
