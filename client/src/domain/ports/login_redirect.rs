//! Driven port for sending the user back to the login surface.

/// Port invoked after a 401 once the redirect delay has elapsed.
#[cfg_attr(test, mockall::automock)]
pub trait LoginRedirect: Send + Sync {
    /// Navigate to the login surface.
    fn redirect_to_login(&self);
}
