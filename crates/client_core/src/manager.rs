use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::UserId;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{ControllerError, ControllerResult, ServiceError},
    state::{Action, Applied, ViewState},
    view::ViewModel,
    ServiceVariant, UserService,
};

/// Drives a [`ViewState`] from user intents and the remote user service.
///
/// Every successful write is followed by a full reload of the list. Reloads
/// carry a sequence number so that an older response resolving late never
/// overwrites a newer one. The state lock is never held across a network call.
pub struct UserManager {
    service: Arc<dyn UserService>,
    inner: Mutex<ViewState>,
    reload_seq: AtomicU64,
}

impl UserManager {
    pub fn new(service: Arc<dyn UserService>) -> Arc<Self> {
        let variant = service.variant();
        Arc::new(Self {
            service,
            inner: Mutex::new(ViewState::new(variant)),
            reload_seq: AtomicU64::new(0),
        })
    }

    pub fn variant(&self) -> ServiceVariant {
        self.service.variant()
    }

    pub async fn snapshot(&self) -> ViewState {
        self.inner.lock().await.clone()
    }

    pub async fn view(&self) -> ViewModel {
        ViewModel::from_state(&*self.inner.lock().await)
    }

    pub async fn user_id_at(&self, position: usize) -> Option<UserId> {
        self.inner
            .lock()
            .await
            .user_at(position)
            .map(|user| user.id.clone())
    }

    async fn dispatch(&self, action: Action) -> Applied {
        self.inner.lock().await.apply(action)
    }

    async fn ensure_can_mutate(&self) -> ControllerResult<()> {
        if self.inner.lock().await.can_mutate() {
            Ok(())
        } else {
            Err(ControllerError::NotAdmin)
        }
    }

    async fn fail(&self, operation: &'static str, err: ServiceError) -> ControllerError {
        warn!(operation, error = %err, "user service call failed");
        self.dispatch(Action::OperationFailed(err.api_error().message))
            .await;
        ControllerError::Service(err)
    }

    pub async fn load_users(&self) -> ControllerResult<()> {
        let seq = self.reload_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let body = match self.service.list_users().await {
            Ok(body) => body,
            Err(err) => return Err(self.fail("load_users", err).await),
        };

        let (users, user_is_admin) = body.into_parts();
        let count = users.len();
        let mut guard = self.inner.lock().await;
        match guard.apply(Action::ListLoaded {
            seq,
            users,
            user_is_admin,
        }) {
            Applied::Changed => {
                info!(seq, count, "user list reloaded");
                guard.apply(Action::OperationSucceeded);
            }
            Applied::Ignored => debug!(
                seq,
                latest = guard.last_applied_reload(),
                "dropped stale user list response"
            ),
        }
        Ok(())
    }

    pub async fn delete_user(&self, id: &UserId) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        if let Err(err) = self.service.delete_user(id).await {
            return Err(self.fail("delete_user", err).await);
        }
        info!(user_id = %id, "user deleted");
        self.load_users().await
    }

    pub async fn toggle_edit_email(&self, id: &UserId) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        match self.dispatch(Action::ToggleEditEmail(id.clone())).await {
            Applied::Changed => Ok(()),
            Applied::Ignored => Err(ControllerError::UnknownUser(id.clone())),
        }
    }

    pub async fn change_email_draft(
        &self,
        id: &UserId,
        email: impl Into<String>,
    ) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        let action = Action::ChangeEmailDraft {
            id: id.clone(),
            email: email.into(),
        };
        match self.dispatch(action).await {
            Applied::Changed => Ok(()),
            Applied::Ignored => Err(ControllerError::NotEditing(id.clone())),
        }
    }

    /// Persists the row's in-progress email edit and reloads.
    pub async fn save_email(&self, id: &UserId) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        let email = {
            let guard = self.inner.lock().await;
            if guard.user(id).is_none() {
                return Err(ControllerError::UnknownUser(id.clone()));
            }
            guard
                .email_draft(id)
                .ok_or_else(|| ControllerError::NotEditing(id.clone()))?
                .to_string()
        };

        if let Err(err) = self.service.edit_user_email(id, &email).await {
            return Err(self.fail("save_email", err).await);
        }
        info!(user_id = %id, "user email updated");
        self.load_users().await
    }

    pub async fn toggle_add_panel(&self) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        self.dispatch(Action::ToggleAddPanel).await;
        Ok(())
    }

    pub async fn set_draft_name(&self, name: impl Into<String>) {
        self.dispatch(Action::SetDraftName(name.into())).await;
    }

    pub async fn set_draft_username(&self, username: impl Into<String>) {
        self.dispatch(Action::SetDraftUsername(username.into()))
            .await;
    }

    pub async fn set_draft_email(&self, email: impl Into<String>) {
        self.dispatch(Action::SetDraftEmail(email.into())).await;
    }

    pub async fn cancel_add(&self) {
        self.dispatch(Action::CancelAdd).await;
    }

    /// Creates a user from the current draft. On failure the draft and panel are kept.
    pub async fn submit_new_user(&self) -> ControllerResult<()> {
        self.ensure_can_mutate().await?;
        let draft = self.inner.lock().await.draft().clone();
        if let Err(err) = self.service.insert_user(&draft).await {
            return Err(self.fail("submit_new_user", err).await);
        }
        info!(username = %draft.username, "user created");
        self.dispatch(Action::UserCreated).await;
        self.load_users().await
    }

    pub async fn set_pin(&self, pin: impl Into<String>) {
        self.dispatch(Action::SetPin(pin.into())).await;
    }

    /// Sends the current PIN. The PIN is cleared whatever the outcome.
    pub async fn login(&self) -> ControllerResult<bool> {
        if !self.variant().includes_credentials() {
            return Err(ControllerError::SessionUnsupported);
        }

        let pin = self.inner.lock().await.pin().to_string();
        match self.service.login(&pin).await {
            Ok(response) => {
                let is_admin = response.is_admin_logged_in();
                info!(is_admin, id_code = %response.id_code, "login completed");
                let mut guard = self.inner.lock().await;
                guard.apply(Action::LoginCompleted { is_admin });
                guard.apply(Action::OperationSucceeded);
                Ok(is_admin)
            }
            Err(err) => {
                self.dispatch(Action::LoginCompleted { is_admin: false })
                    .await;
                Err(self.fail("login", err).await)
            }
        }
    }

    pub async fn logout(&self) -> ControllerResult<bool> {
        if !self.variant().includes_credentials() {
            return Err(ControllerError::SessionUnsupported);
        }

        match self.service.logout().await {
            Ok(response) => {
                let logged_out = response.is_admin_logged_out();
                info!(logged_out, id_code = %response.id_code, "logout completed");
                let mut guard = self.inner.lock().await;
                guard.apply(Action::LogoutCompleted { logged_out });
                guard.apply(Action::OperationSucceeded);
                Ok(logged_out)
            }
            Err(err) => Err(self.fail("logout", err).await),
        }
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
