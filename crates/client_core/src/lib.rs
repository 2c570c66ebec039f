use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{NewUser, UserId},
    protocol::{
        EditEmailRequest, InsertUserRequest, LoginRequest, SessionResponse, UserListResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod error;
mod manager;
pub mod state;
pub mod view;

pub use error::{ControllerError, ControllerResult, ServiceError, ServiceResult};
pub use manager::UserManager;
pub use state::{Action, Applied, ViewState};
pub use view::{EmailCell, SessionView, UserRow, ViewModel};

/// Which flavour of the user service the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceVariant {
    /// Bare user list, no admin session; every mutating control is available.
    #[default]
    Plain,
    /// PIN-gated admin session carried by a server-set cookie.
    Session,
}

impl ServiceVariant {
    pub fn includes_credentials(self) -> bool {
        matches!(self, Self::Session)
    }
}

impl fmt::Display for ServiceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Session => f.write_str("session"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown service variant '{0}', expected 'plain' or 'session'")]
pub struct UnknownVariant(String);

impl FromStr for ServiceVariant {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" | "1" => Ok(Self::Plain),
            "session" | "2" => Ok(Self::Session),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Remote operations offered by the user service.
#[async_trait]
pub trait UserService: Send + Sync {
    fn variant(&self) -> ServiceVariant;
    async fn list_users(&self) -> ServiceResult<UserListResponse>;
    async fn delete_user(&self, id: &UserId) -> ServiceResult<()>;
    async fn edit_user_email(&self, id: &UserId, email: &str) -> ServiceResult<()>;
    async fn insert_user(&self, user: &NewUser) -> ServiceResult<()>;
    async fn login(&self, pin: &str) -> ServiceResult<SessionResponse>;
    async fn logout(&self) -> ServiceResult<SessionResponse>;
}

pub struct HttpUserServiceBuilder {
    base_url: Url,
    variant: ServiceVariant,
    timeout: Option<Duration>,
}

impl HttpUserServiceBuilder {
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ServiceResult<HttpUserService> {
        if self.base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "url cannot carry a path".into(),
            });
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ServiceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: format!("unsupported scheme '{}'", self.base_url.scheme()),
            });
        }

        let mut builder = Client::builder().cookie_store(self.variant.includes_credentials());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ServiceError::Client)?;

        Ok(HttpUserService {
            http,
            base_url: self.base_url,
            variant: self.variant,
        })
    }
}

/// [`UserService`] over plain JSON/HTTP.
pub struct HttpUserService {
    http: Client,
    base_url: Url,
    variant: ServiceVariant,
}

impl HttpUserService {
    pub fn builder(base_url: Url, variant: ServiceVariant) -> HttpUserServiceBuilder {
        HttpUserServiceBuilder {
            base_url,
            variant,
            timeout: None,
        }
    }

    pub fn new(base_url: Url, variant: ServiceVariant) -> ServiceResult<Self> {
        Self::builder(base_url, variant).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if segments.is_empty() && !url.path().ends_with('/') {
            let with_slash = format!("{}/", url.path());
            url.set_path(&with_slash);
        }
        url
    }

    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> ServiceResult<Response> {
        let method_name = method_name(&method);
        let url = self.endpoint(segments);
        let path = url.path().to_string();

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                method: method_name,
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(method = method_name, %path, status = status.as_u16(), "user service rejected request");
            return Err(ServiceError::Rejected {
                method: method_name,
                path,
                status: status.as_u16(),
            });
        }

        debug!(method = method_name, %path, status = status.as_u16(), "user service request completed");
        Ok(response)
    }

    async fn send_for_session<B: Serialize + Sync + ?Sized>(
        &self,
        segments: &[&str],
        body: Option<&B>,
    ) -> ServiceResult<SessionResponse> {
        let response = self.send(Method::POST, segments, body).await?;
        let path = response.url().path().to_string();
        response
            .json::<SessionResponse>()
            .await
            .map_err(|source| ServiceError::Decode {
                method: "POST",
                path,
                source,
            })
    }
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        Method::PUT => "PUT",
        _ => "HTTP",
    }
}

#[async_trait]
impl UserService for HttpUserService {
    fn variant(&self) -> ServiceVariant {
        self.variant
    }

    async fn list_users(&self) -> ServiceResult<UserListResponse> {
        let response = self.send::<()>(Method::GET, &[], None).await?;
        let path = response.url().path().to_string();
        response
            .json::<UserListResponse>()
            .await
            .map_err(|source| ServiceError::Decode {
                method: "GET",
                path,
                source,
            })
    }

    async fn delete_user(&self, id: &UserId) -> ServiceResult<()> {
        self.send::<()>(Method::DELETE, &["deleteuser", id.as_str()], None)
            .await
            .map(drop)
    }

    async fn edit_user_email(&self, id: &UserId, email: &str) -> ServiceResult<()> {
        let body = EditEmailRequest {
            email: email.to_string(),
        };
        self.send(Method::PATCH, &["edituseremail", id.as_str()], Some(&body))
            .await
            .map(drop)
    }

    async fn insert_user(&self, user: &NewUser) -> ServiceResult<()> {
        let body = InsertUserRequest { user: user.clone() };
        self.send(Method::POST, &["insertuser"], Some(&body))
            .await
            .map(drop)
    }

    async fn login(&self, pin: &str) -> ServiceResult<SessionResponse> {
        let body = LoginRequest {
            pin: pin.to_string(),
        };
        self.send_for_session(&["login"], Some(&body)).await
    }

    async fn logout(&self) -> ServiceResult<SessionResponse> {
        self.send_for_session::<()>(&["logout"], None).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
