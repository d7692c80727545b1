use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub kind: ToastKind,
    pub message: String,
    pub duration: Duration,
}

/// Transient notifications. Each toast removes itself once its duration
/// elapses; `show_toast` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct ToastStore {
    toasts: Arc<watch::Sender<Vec<Toast>>>,
}

impl Default for ToastStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            toasts: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.toasts.subscribe()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.borrow().clone()
    }

    pub fn show_toast(&self, kind: ToastKind, message: impl Into<String>) -> Uuid {
        self.show_toast_for(kind, message, DEFAULT_TOAST_DURATION)
    }

    pub fn show_toast_for(
        &self,
        kind: ToastKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            duration,
        };
        let id = toast.id;
        self.toasts.send_modify(|toasts| toasts.push(toast));

        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            store.remove_toast(id);
        });
        id
    }

    pub fn remove_toast(&self, id: Uuid) {
        self.toasts.send_if_modified(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            toasts.len() != before
        });
    }
}
