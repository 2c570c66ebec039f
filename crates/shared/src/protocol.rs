use serde::{Deserialize, Serialize};

use crate::domain::{NewUser, User};

/// Discriminator returned by `POST /login` when the PIN was accepted.
pub const ID_CODE_ADMIN_LOGGED_IN: &str = "adminLoggedIn";
/// Discriminator returned by `POST /logout` once the session is dropped.
pub const ID_CODE_ADMIN_LOGGED_OUT: &str = "adminLoggedOut";

/// Body of `GET /`. Plain services answer with a bare array, session-aware
/// services wrap it together with the caller's admin flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserListResponse {
    Plain(Vec<User>),
    Session {
        users: Vec<User>,
        #[serde(rename = "userIsAdmin", default)]
        user_is_admin: bool,
    },
}

impl UserListResponse {
    pub fn users(&self) -> &[User] {
        match self {
            Self::Session { users, .. } | Self::Plain(users) => users,
        }
    }

    /// Admin flag reported by the service, `None` for plain list bodies.
    pub fn user_is_admin(&self) -> Option<bool> {
        match self {
            Self::Session { user_is_admin, .. } => Some(*user_is_admin),
            Self::Plain(_) => None,
        }
    }

    pub fn into_parts(self) -> (Vec<User>, Option<bool>) {
        match self {
            Self::Session {
                users,
                user_is_admin,
            } => (users, Some(user_is_admin)),
            Self::Plain(users) => (users, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertUserRequest {
    pub user: NewUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "idCode", default)]
    pub id_code: String,
}

impl SessionResponse {
    pub fn is_admin_logged_in(&self) -> bool {
        self.id_code == ID_CODE_ADMIN_LOGGED_IN
    }

    pub fn is_admin_logged_out(&self) -> bool {
        self.id_code == ID_CODE_ADMIN_LOGGED_OUT
    }
}
