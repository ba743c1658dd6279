//! Storefront domain: entities, validation, response parsing, collection
//! coordination and the services built on the ports.
//!
//! Public surface:
//! - `CollectionCoordinator` — generation-guarded list state per resource.
//! - `AuthService` — login, logout and the persisted session.
//! - `StorefrontService` — shopper operations.
//! - `SessionChangeListener` — refreshes a collection on login.
//!
//! Nothing here depends on an outbound adapter; side effects go through
//! [`ports`].

pub mod auth;
pub mod auth_service;
pub mod catalog;
pub mod collection;
pub mod error;
pub mod ports;
pub mod response;
pub mod session;
pub mod session_listener;
pub mod storefront;
pub mod user;

mod timestamp;

pub use self::auth::{
    LoginCredentials, LoginValidationError, PasswordChange, PasswordChangeValidationError,
    Registration, RegistrationValidationError,
};
pub use self::auth_service::{AuthService, LoginOutcome};
pub use self::catalog::{BoxId, CatalogDraft, CatalogEntry, CatalogEntryPatch, VariantId};
pub use self::collection::{
    CatalogResource, CollectionConfig, CollectionCoordinator, CollectionPorts,
    CollectionSnapshot, CreateOutcome, FetchOutcome, ListingMode, Phase, UserResource,
};
pub use self::error::{ServiceError, ServiceResult, ValidationError};
pub use self::response::{ResponseError, ResponseSchema};
pub use self::session::Session;
pub use self::session_listener::{RefreshTarget, SessionChangeListener};
pub use self::storefront::{CommentDraft, RechargeRequest, StorefrontService};
pub use self::user::{Role, UserAccount, UserId};
