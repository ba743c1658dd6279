//! Login, logout and account lookup over the API transport.
//!
//! Successful logins are written to the session store. The logged-in flag is
//! written last so a listener that reacts to it always reads a complete
//! session.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::auth::{LoginCredentials, Registration};
use super::error::{ServiceError, ServiceResult};
use super::ports::{ApiRequest, ApiTransport, LOGIN_PATH, SessionKey, SessionStore};
use super::response::{ResponseError, ResponseSchema, parse_typed};
use super::session::{LOGGED_IN, Session};
use super::user::{Role, UserAccount, UserId};

const REGISTER_PATH: &str = "/users/register";
const CURRENT_USER_PATH: &str = "/users/me";
const SCHEMA: ResponseSchema = ResponseSchema::Enveloped;

/// Identity returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Backend id of the user, when the server reported one.
    pub user_id: Option<UserId>,
    /// Login name.
    pub username: String,
    /// Role the session was opened with.
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
struct LoginUser {
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// Authentication and session service.
#[derive(Clone)]
pub struct AuthService {
    transport: Arc<dyn ApiTransport>,
    session: Arc<dyn SessionStore>,
}

impl AuthService {
    /// Create a service from its ports.
    pub fn new(transport: Arc<dyn ApiTransport>, session: Arc<dyn SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Log in and persist the resulting session.
    ///
    /// # Errors
    ///
    /// Transport and envelope failures, a response without a token, or a
    /// session store that cannot be written.
    pub async fn login(&self, credentials: &LoginCredentials) -> ServiceResult<LoginOutcome> {
        let request = ApiRequest::post(
            LOGIN_PATH,
            json!({
                "username": credentials.username(),
                "password": credentials.password(),
            }),
        );
        let body = self.transport.request(request).await?;
        let payload: LoginPayload = parse_typed(SCHEMA, body)?;

        let token = payload
            .token
            .filter(|token| !token.is_empty())
            .map(Zeroizing::new)
            .ok_or_else(|| ResponseError::malformed("login response carries no token"))?;
        let user = payload.user;
        let user_id = user.as_ref().and_then(|user| user.id).or(payload.user_id);
        let raw_role = user
            .as_ref()
            .and_then(|user| user.role.clone())
            .or(payload.role);
        let username = user
            .and_then(|user| user.username)
            .or(payload.username)
            .unwrap_or_else(|| credentials.username().to_owned());

        self.session.set(SessionKey::Token, token.as_str())?;
        self.write_optional(SessionKey::Role, raw_role.as_deref())?;
        let raw_id = user_id.map(|id| id.to_string());
        self.write_optional(SessionKey::UserId, raw_id.as_deref())?;
        self.session.set(SessionKey::LoggedIn, LOGGED_IN)?;

        let role = raw_role.as_deref().map(Role::from_wire).unwrap_or_default();
        info!(username = %username, %role, "logged in");
        Ok(LoginOutcome {
            user_id,
            username,
            role,
        })
    }

    /// Forget the session.
    ///
    /// # Errors
    ///
    /// Returns an error when the session store cannot be written.
    pub fn logout(&self) -> ServiceResult<()> {
        self.session.clear(&SessionKey::ALL)?;
        info!("logged out");
        Ok(())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Transport and envelope failures such as a taken username.
    pub async fn register(&self, registration: &Registration) -> ServiceResult<()> {
        let request = ApiRequest::post(
            REGISTER_PATH,
            json!({
                "username": registration.username(),
                "email": registration.email(),
                "phone": registration.phone(),
                "password": registration.password(),
                "confirmPassword": registration.password(),
            }),
        );
        let body = self.transport.request(request).await?;
        parse_typed::<serde_json::Value>(SCHEMA, body)?;
        info!(username = %registration.username(), "account registered");
        Ok(())
    }

    /// Account of the logged-in user.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport,
    /// envelope or decoding failures.
    pub async fn current_user(&self) -> ServiceResult<UserAccount> {
        if self.session().token().is_none() {
            return Err(ServiceError::NotLoggedIn);
        }
        let body = self
            .transport
            .request(ApiRequest::get(CURRENT_USER_PATH))
            .await?;
        Ok(parse_typed(SCHEMA, body)?)
    }

    /// Snapshot of the stored session.
    pub fn session(&self) -> Session {
        Session::read(self.session.as_ref())
    }

    /// Whether the stored role is an administrator.
    pub fn is_admin(&self) -> bool {
        self.session().is_admin()
    }

    fn write_optional(&self, key: SessionKey, value: Option<&str>) -> ServiceResult<()> {
        match value {
            Some(value) => self.session.set(key, value)?,
            None => {
                warn!(key = key.storage_name(), "login response omitted a session field");
                self.session.clear(&[key])?;
            }
        }
        Ok(())
    }
}
