//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod api_transport;
mod login_redirect;
mod notifier;
mod session_store;
mod sleeper;

#[cfg(test)]
pub use api_transport::MockApiTransport;
pub use api_transport::{
    ApiError, ApiRequest, ApiTransport, HttpMethod, LOGIN_PATH, MultipartField, MultipartValue,
    RequestBody,
};
pub use login_redirect::LoginRedirect;
#[cfg(test)]
pub use login_redirect::MockLoginRedirect;
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{Notice, NoticeLevel, Notifier, SilentNotifier};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{SessionKey, SessionStore, SessionStoreError, StorageChange};
pub use sleeper::{Sleeper, TokioSleeper};
