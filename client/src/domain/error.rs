//! Service-level error types.
//!
//! Port errors, response-shape errors and client-side validation failures
//! all surface to callers as [`ServiceError`].

use std::fmt;

use super::auth::{LoginValidationError, PasswordChangeValidationError, RegistrationValidationError};
use super::catalog::{CatalogValidationError, MappingError};
use super::ports::{ApiError, SessionStoreError};
use super::response::ResponseError;
use super::storefront::{CommentValidationError, RechargeValidationError};
use super::user::UserValidationError;

/// Client-side form validation failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Login form.
    Login(LoginValidationError),
    /// Registration form.
    Registration(RegistrationValidationError),
    /// Password change form.
    PasswordChange(PasswordChangeValidationError),
    /// Catalog draft or patch.
    Catalog(CatalogValidationError),
    /// Wallet top-up form.
    Recharge(RechargeValidationError),
    /// Comment form.
    Comment(CommentValidationError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login(err) => err.fmt(f),
            Self::Registration(err) => err.fmt(f),
            Self::PasswordChange(err) => err.fmt(f),
            Self::Catalog(err) => err.fmt(f),
            Self::Recharge(err) => err.fmt(f),
            Self::Comment(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ValidationError {}

macro_rules! validation_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for ValidationError {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }

            impl From<$source> for ServiceError {
                fn from(value: $source) -> Self {
                    Self::Validation(ValidationError::$variant(value))
                }
            }
        )*
    };
}

validation_from! {
    LoginValidationError => Login,
    RegistrationValidationError => Registration,
    PasswordChangeValidationError => PasswordChange,
    CatalogValidationError => Catalog,
    RechargeValidationError => Recharge,
    CommentValidationError => Comment,
}

/// Errors returned by coordinators and services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The response did not match its declared schema or was rejected.
    #[error(transparent)]
    Response(#[from] ResponseError),
    /// A catalog payload could not be mapped.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// A user payload failed validation.
    #[error(transparent)]
    User(#[from] UserValidationError),
    /// Input failed client-side validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The session store could not be updated.
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotLoggedIn,
    /// The operation needs an administrator.
    #[error("administrator role required")]
    NotPermitted,
}

impl ServiceError {
    /// Whether the error came from client-side validation.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the server ended the session.
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(ApiError::SessionExpired { .. }))
    }
}

/// Result alias for coordinator and service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
