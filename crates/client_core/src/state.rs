//! View state container and its transitions.
//!
//! Fetched [`User`] records are kept exactly as the service returned them.
//! Editing state lives beside them, keyed by id, so a reload replaces the
//! list wholesale without having to reconcile local mutations.

use std::collections::HashMap;

use shared::domain::{NewUser, User, UserId};

use crate::ServiceVariant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListLoaded {
        seq: u64,
        users: Vec<User>,
        user_is_admin: Option<bool>,
    },
    ToggleEditEmail(UserId),
    ChangeEmailDraft {
        id: UserId,
        email: String,
    },
    ToggleAddPanel,
    SetDraftName(String),
    SetDraftUsername(String),
    SetDraftEmail(String),
    CancelAdd,
    UserCreated,
    SetPin(String),
    LoginCompleted {
        is_admin: bool,
    },
    LogoutCompleted {
        logged_out: bool,
    },
    OperationSucceeded,
    OperationFailed(String),
}

/// Outcome of [`ViewState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// The action did not match the current state (stale reload, unknown row).
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    variant: ServiceVariant,
    users: Vec<User>,
    email_edits: HashMap<UserId, String>,
    user_is_admin: bool,
    add_panel_open: bool,
    draft: NewUser,
    pin: String,
    last_error: Option<String>,
    last_applied_reload: u64,
}

impl ViewState {
    pub fn new(variant: ServiceVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, action: Action) -> Applied {
        match action {
            Action::ListLoaded {
                seq,
                users,
                user_is_admin,
            } => {
                if seq <= self.last_applied_reload {
                    return Applied::Ignored;
                }
                self.last_applied_reload = seq;
                self.users = users;
                self.email_edits.clear();
                if let Some(is_admin) = user_is_admin {
                    self.user_is_admin = is_admin;
                }
            }
            Action::ToggleEditEmail(id) => {
                if self.email_edits.remove(&id).is_none() {
                    let Some(user) = self.user(&id) else {
                        return Applied::Ignored;
                    };
                    let email = user.email.clone();
                    self.email_edits.insert(id, email);
                }
            }
            Action::ChangeEmailDraft { id, email } => match self.email_edits.get_mut(&id) {
                Some(draft) => *draft = email,
                None => return Applied::Ignored,
            },
            Action::ToggleAddPanel => self.add_panel_open = !self.add_panel_open,
            Action::SetDraftName(name) => self.draft.name = name,
            Action::SetDraftUsername(username) => self.draft.username = username,
            Action::SetDraftEmail(email) => self.draft.email = email,
            Action::CancelAdd | Action::UserCreated => {
                self.draft = NewUser::default();
                self.add_panel_open = false;
            }
            Action::SetPin(pin) => self.pin = pin,
            Action::LoginCompleted { is_admin } => {
                self.pin.clear();
                self.user_is_admin = is_admin;
            }
            Action::LogoutCompleted { logged_out } => {
                if !logged_out {
                    return Applied::Ignored;
                }
                self.user_is_admin = false;
            }
            Action::OperationSucceeded => self.last_error = None,
            Action::OperationFailed(message) => self.last_error = Some(message),
        }
        Applied::Changed
    }

    pub fn variant(&self) -> ServiceVariant {
        self.variant
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    /// 1-based position as shown in the rendered list.
    pub fn user_at(&self, position: usize) -> Option<&User> {
        position
            .checked_sub(1)
            .and_then(|index| self.users.get(index))
    }

    pub fn is_editing_email(&self, id: &UserId) -> bool {
        self.email_edits.contains_key(id)
    }

    pub fn email_draft(&self, id: &UserId) -> Option<&str> {
        self.email_edits.get(id).map(String::as_str)
    }

    /// Email to display for a row: the in-progress edit if any, else the service's value.
    pub fn displayed_email<'a>(&'a self, user: &'a User) -> &'a str {
        self.email_draft(&user.id).unwrap_or(&user.email)
    }

    pub fn user_is_admin(&self) -> bool {
        self.user_is_admin
    }

    /// Whether add/edit/delete controls are offered.
    pub fn can_mutate(&self) -> bool {
        match self.variant {
            ServiceVariant::Plain => true,
            ServiceVariant::Session => self.user_is_admin,
        }
    }

    pub fn add_panel_open(&self) -> bool {
        self.add_panel_open
    }

    pub fn draft(&self) -> &NewUser {
        &self.draft
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_applied_reload(&self) -> u64 {
        self.last_applied_reload
    }
}
