//! Facade wiring the HTTP adapter, the session store and the domain
//! services from [`ClientSettings`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::ports::{
    ApiTransport, LoginRedirect, Notifier, SessionStore, SessionStoreError, Sleeper, TokioSleeper,
};
use crate::domain::{
    AuthService, CatalogResource, CollectionConfig, CollectionCoordinator, CollectionPorts,
    ListingMode, SessionChangeListener, StorefrontService, UserResource,
};
use crate::outbound::http::{HttpApiClient, HttpApiConfig, HttpApiPorts};
use crate::outbound::notify::{LoggingLoginRedirect, TracingNotifier};
use crate::outbound::session::{FileSessionStore, MemorySessionStore, SessionFilePoller};
use crate::settings::{ClientSettings, InvalidApiBase};

/// Failures while assembling a [`StorefrontClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured API root is unusable.
    #[error(transparent)]
    Config(#[from] InvalidApiBase),
    /// The session file could not be opened.
    #[error("failed to open session store: {0}")]
    Session(#[from] SessionStoreError),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Side-effect ports the facade hands to the HTTP adapter.
#[derive(Clone)]
pub struct Surface {
    /// Receives failure notices.
    pub notifier: Arc<dyn Notifier>,
    /// Performs the login redirect after a `401`.
    pub redirect: Arc<dyn LoginRedirect>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            redirect: Arc::new(LoggingLoginRedirect),
        }
    }
}

/// Every storefront service over one transport and one session.
pub struct StorefrontClient {
    session: Arc<dyn SessionStore>,
    session_file: Option<(Arc<FileSessionStore>, Duration)>,
    catalog: Arc<CollectionCoordinator<CatalogResource>>,
    admin_catalog: Arc<CollectionCoordinator<CatalogResource>>,
    users: Arc<CollectionCoordinator<UserResource>>,
    auth: AuthService,
    storefront: StorefrontService,
}

impl StorefrontClient {
    /// Build a client from settings with tracing-backed notices.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub fn connect(settings: &ClientSettings) -> Result<Self, ClientError> {
        Self::connect_with(settings, Surface::default())
    }

    /// Build a client from settings, routing notices and redirects to
    /// `surface`.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub fn connect_with(settings: &ClientSettings, surface: Surface) -> Result<Self, ClientError> {
        let base = settings.api_base()?;
        let session_file = settings
            .session_file()
            .map(FileSessionStore::open)
            .transpose()?
            .map(Arc::new);
        let session: Arc<dyn SessionStore> = match &session_file {
            Some(store) => Arc::clone(store) as Arc<dyn SessionStore>,
            None => Arc::new(MemorySessionStore::new()),
        };
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let mut http = HttpApiConfig::new(base);
        http.request_timeout = settings.request_timeout();
        http.redirect_delay = settings.redirect_delay();
        let transport = HttpApiClient::new(
            http,
            HttpApiPorts {
                session: Arc::clone(&session),
                notifier: surface.notifier,
                redirect: surface.redirect,
                sleeper: Arc::clone(&sleeper),
            },
        )?;
        info!(
            base = %settings.api_base()?,
            persistent = settings.session_file().is_some(),
            "storefront client configured"
        );

        let ports = CollectionPorts::new(Arc::new(transport), session, sleeper);
        let client = Self::new(
            ports,
            CollectionConfig {
                debounce: settings.debounce(),
            },
        );
        Ok(match session_file {
            Some(store) => client.poll_session_file(store, settings.session_poll()),
            None => client,
        })
    }

    /// Assemble the services over existing ports.
    pub fn new(ports: CollectionPorts, config: CollectionConfig) -> Self {
        let transport: Arc<dyn ApiTransport> = Arc::clone(&ports.transport);
        let session = Arc::clone(&ports.session);
        let coordinator = |mode| {
            Arc::new(CollectionCoordinator::new(
                CatalogResource::new(mode),
                ports.clone(),
                config,
            ))
        };
        Self {
            catalog: coordinator(ListingMode::Public),
            admin_catalog: coordinator(ListingMode::Admin),
            users: Arc::new(CollectionCoordinator::new(UserResource, ports.clone(), config)),
            auth: AuthService::new(Arc::clone(&transport), Arc::clone(&session)),
            storefront: StorefrontService::new(transport, Arc::clone(&session)),
            session,
            session_file: None,
        }
    }

    /// Re-read `store` every `period` while logins are watched, so sessions
    /// written by other processes reach [`StorefrontClient::watch_logins`].
    /// `store` must be the session store the ports were built with.
    #[must_use]
    pub fn poll_session_file(mut self, store: Arc<FileSessionStore>, period: Duration) -> Self {
        self.session_file = Some((store, period));
        self
    }

    /// Published catalog as shoppers see it.
    pub fn catalog(&self) -> &Arc<CollectionCoordinator<CatalogResource>> {
        &self.catalog
    }

    /// Full catalog for the admin console.
    pub fn admin_catalog(&self) -> &Arc<CollectionCoordinator<CatalogResource>> {
        &self.admin_catalog
    }

    /// User accounts for the admin console.
    pub fn users(&self) -> &Arc<CollectionCoordinator<UserResource>> {
        &self.users
    }

    /// Login and session service.
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Shopper operations.
    pub fn storefront(&self) -> &StorefrontService {
        &self.storefront
    }

    /// Session store shared by every service.
    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Refresh the published catalog whenever a user logs in, including
    /// logins written to the session file by another process. Must be called
    /// from within a Tokio runtime; refreshes stop when the watch drops.
    pub fn watch_logins(&self) -> LoginWatch {
        LoginWatch {
            listener: SessionChangeListener::spawn(Arc::clone(&self.session), self.catalog.clone()),
            poller: self
                .session_file
                .as_ref()
                .map(|(store, period)| store.poll(*period)),
        }
    }
}

/// Running login watch returned by [`StorefrontClient::watch_logins`].
pub struct LoginWatch {
    listener: SessionChangeListener,
    poller: Option<SessionFilePoller>,
}

impl LoginWatch {
    /// Whether the session file is being polled.
    pub fn polls_session_file(&self) -> bool {
        self.poller.is_some()
    }

    /// Stop watching.
    pub fn shutdown(self) {
        drop(self.poller);
        self.listener.shutdown();
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use serde_json::json;

    use super::*;
    use crate::domain::ports::SessionKey;
    use crate::domain::{FetchOutcome, LoginCredentials};
    use crate::test_support::time::ImmediateSleeper;
    use crate::test_support::transport::ScriptedTransport;

    fn client(transport: Arc<ScriptedTransport>) -> StorefrontClient {
        let ports = CollectionPorts::new(
            transport,
            Arc::new(MemorySessionStore::new()),
            Arc::new(ImmediateSleeper),
        );
        StorefrontClient::new(ports, CollectionConfig::default())
    }

    #[tokio::test]
    async fn services_share_one_session() {
        let transport = Arc::new(ScriptedTransport::new([Ok(json!({
            "success": true,
            "data": {"token": "t-1", "user": {"id": 3, "role": "ADMIN"}}
        }))]));
        let client = client(transport);
        let credentials = LoginCredentials::try_from_parts("root", "secret1").expect("creds");

        client.auth().login(&credentials).await.expect("login");

        assert_eq!(
            client.session_store().get(SessionKey::Token).as_deref(),
            Some("t-1")
        );
        assert!(client.auth().is_admin());
    }

    #[tokio::test]
    async fn login_refreshes_the_public_catalog() {
        let transport = Arc::new(ScriptedTransport::new([Ok(json!({
            "success": true,
            "data": [{"id": 1, "isListed": true}]
        }))]));
        let client = client(transport.clone());
        let mut snapshots = client.catalog().subscribe();
        let _listener = client.watch_logins();

        client
            .session_store()
            .set(SessionKey::LoggedIn, "true")
            .expect("login flag");

        tokio::time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|snapshot| snapshot.items.len() == 1),
        )
        .await
        .expect("refresh should finish")
        .expect("coordinator alive");
        assert_eq!(transport.requests()[0].path, "/blind-boxes");
    }

    #[tokio::test]
    async fn logins_from_another_process_refresh_the_catalog() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let path = workspace.path().join("session.json");
        let store = Arc::new(FileSessionStore::open(&path).expect("open session file"));
        let transport = Arc::new(ScriptedTransport::new([Ok(json!({
            "success": true,
            "data": [{"id": 1, "isListed": true}]
        }))]));
        let ports = CollectionPorts::new(
            transport.clone(),
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(ImmediateSleeper),
        );
        let client = StorefrontClient::new(ports, CollectionConfig::default())
            .poll_session_file(store, Duration::from_millis(10));
        let mut snapshots = client.catalog().subscribe();
        let watch = client.watch_logins();
        assert!(watch.polls_session_file());

        FileSessionStore::open(&path)
            .expect("second handle")
            .set(SessionKey::LoggedIn, "true")
            .expect("external login");

        tokio::time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|snapshot| snapshot.items.len() == 1),
        )
        .await
        .expect("refresh should follow the external login")
        .expect("coordinator alive");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn in_memory_sessions_are_not_polled() {
        let client = client(Arc::new(ScriptedTransport::new([])));

        assert!(!client.watch_logins().polls_session_file());
    }

    #[test]
    fn invalid_bases_fail_to_connect() {
        let settings = ClientSettings {
            api_base: Some("not a url".to_owned()),
            ..ClientSettings::default()
        };

        let error = StorefrontClient::connect(&settings)
            .err()
            .expect("invalid base");
        assert!(matches!(error, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn admin_views_use_separate_state() {
        let transport = Arc::new(ScriptedTransport::new([Ok(json!([{"id": 4}]))]));
        let client = client(transport);

        let outcome = client.admin_catalog().fetch().await;

        assert_eq!(outcome, FetchOutcome::Applied { count: 1 });
        assert!(client.catalog().snapshot().items.is_empty());
    }
}
