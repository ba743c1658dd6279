//! Tracing-backed notification and redirect adapters for headless use.

use tracing::{error, info};

use crate::domain::ports::{LoginRedirect, Notice, NoticeLevel, Notifier};

/// Notifier that turns notices into log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => error!(target: "storefront::notice", message = %notice.message),
            NoticeLevel::Info | NoticeLevel::Success => {
                info!(target: "storefront::notice", level = ?notice.level, message = %notice.message);
            }
        }
    }
}

/// Login redirect that only records the navigation request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLoginRedirect;

impl LoginRedirect for LoggingLoginRedirect {
    fn redirect_to_login(&self) {
        info!(target: "storefront::notice", "login required, redirecting to the login surface");
    }
}
