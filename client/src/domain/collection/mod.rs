//! Async collection coordinator with stale-response suppression.
//!
//! A coordinator owns one remotely listed collection. Consumers observe it
//! through [`CollectionCoordinator::subscribe`] and mutate it only through
//! the coordinator's operations. Every fetch captures a generation number
//! when it starts; a result is committed only if no newer fetch has started
//! in the meantime, so the visible items always come from the most recently
//! initiated fetch.
//!
//! Mutations (`update`, `remove`, `create`) do not take part in the
//! generation protocol. A fetch resolving after a mutation overwrites the
//! mutated items with its own snapshot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::catalog::CatalogDraft;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::ports::{ApiRequest, ApiTransport, SessionStore, Sleeper};
use crate::domain::response::{
    ResponseError, UNEXPECTED_FORMAT, parse_entity, parse_list, parse_payload,
};
use crate::domain::session::Session;

mod resources;
mod state;

pub use resources::{
    CatalogResource, CollectionResource, Identified, ItemId, ListPlan, ListingMode,
    UpdatableResource, UserResource,
};
pub use state::{CollectionSnapshot, FetchOutcome, ListingScope, Phase};

/// Default delay between starting a fetch and issuing its request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Field some mutation answers nest the entity under.
const ENTITY_WRAPPER: &str = "box";

/// Port bundle required by a coordinator.
#[derive(Clone)]
pub struct CollectionPorts {
    /// API transport.
    pub transport: Arc<dyn ApiTransport>,
    /// Session store, read for permission checks.
    pub session: Arc<dyn SessionStore>,
    /// Sleeper driving the debounce delay.
    pub sleeper: Arc<dyn Sleeper>,
}

impl CollectionPorts {
    /// Build a strongly-typed port bundle.
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        session: Arc<dyn SessionStore>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            session,
            sleeper,
        }
    }
}

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Delay applied before each fetch request.
    pub debounce: Duration,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Result of creating a catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<T> {
    /// The server answered with the new entity, which was appended.
    Created(Arc<T>),
    /// The server only acknowledged; the collection was refreshed to pick up
    /// server-assigned ids.
    Refreshed(FetchOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPolicy {
    /// Skip when a fetch is already in flight.
    Deduplicate,
    /// Start regardless; the in-flight fetch becomes stale.
    Supersede,
}

enum LoadFailure {
    Request(String),
    Malformed(String),
}

/// Owner of one collection's state.
pub struct CollectionCoordinator<R: CollectionResource> {
    resource: R,
    ports: CollectionPorts,
    config: CollectionConfig,
    state: watch::Sender<CollectionSnapshot<R::Item>>,
}

impl<R: CollectionResource> CollectionCoordinator<R> {
    /// Create an idle coordinator for `resource`.
    pub fn new(resource: R, ports: CollectionPorts, config: CollectionConfig) -> Self {
        Self {
            resource,
            ports,
            config,
            state: watch::Sender::new(CollectionSnapshot::default()),
        }
    }

    /// Resource description.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<CollectionSnapshot<R::Item>> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CollectionSnapshot<R::Item> {
        self.state.borrow().clone()
    }

    /// Fetch the configured listing unless a fetch is already in flight.
    pub async fn fetch(&self) -> FetchOutcome {
        self.run_fetch(ListingScope::Default, FetchPolicy::Deduplicate)
            .await
    }

    /// Fetch everything the session may see unless a fetch is already in
    /// flight.
    pub async fn fetch_all(&self) -> FetchOutcome {
        self.run_fetch(ListingScope::All, FetchPolicy::Deduplicate)
            .await
    }

    /// Re-run the most recent listing, superseding any fetch in flight.
    pub async fn refresh(&self) -> FetchOutcome {
        let scope = self.state.borrow().scope;
        self.run_fetch(scope, FetchPolicy::Supersede).await
    }

    /// Delete the element with `id`.
    ///
    /// # Errors
    ///
    /// Returns the transport or envelope error after recording it in the
    /// collection state.
    pub async fn remove(&self, id: ItemId<R>) -> ServiceResult<()> {
        let label = self.resource.label();
        self.clear_error();
        let request = ApiRequest::delete(self.resource.item_path(id));
        let outcome = match self.ports.transport.request(request).await {
            Ok(body) => self.acknowledgement(body).map(drop),
            Err(error) => Err(error.into()),
        };
        if let Err(error) = outcome {
            self.record_error(format!("failed to delete {label} {id}: {error}"));
            return Err(error);
        }

        self.state.send_if_modified(|state| {
            let before = state.items.len();
            state.items.retain(|item| item.id() != id);
            state.items.len() != before
        });
        info!(collection = label, %id, "element deleted");
        Ok(())
    }

    /// Read one element without touching the collection.
    ///
    /// # Errors
    ///
    /// Returns transport, envelope, or decode failures.
    pub async fn get_by_id(&self, id: ItemId<R>) -> ServiceResult<R::Item> {
        let request = ApiRequest::get(self.resource.item_path(id));
        let body = self.ports.transport.request(request).await?;
        let value = parse_entity(self.resource.item_schema(), body)?;
        self.resource.decode(value)
    }

    async fn run_fetch(&self, scope: ListingScope, policy: FetchPolicy) -> FetchOutcome {
        let label = self.resource.label();
        let session = Session::read(self.ports.session.as_ref());
        let Some(plan) = self.resource.list_plan(scope, &session) else {
            return self.deny_fetch(policy);
        };
        let Some(generation) = self.begin_fetch(scope, policy) else {
            debug!(collection = label, "fetch skipped, another fetch is in flight");
            return FetchOutcome::Skipped;
        };

        debug!(collection = label, generation, path = %plan.path, "fetch started");
        let pending = PendingFetch {
            state: &self.state,
            label,
            generation,
            committed: false,
        };
        self.ports.sleeper.sleep(self.config.debounce).await;
        let result = self.load(&plan, scope).await;
        let outcome = self.commit(generation, result);
        pending.settle();
        outcome
    }

    fn begin_fetch(&self, scope: ListingScope, policy: FetchPolicy) -> Option<u64> {
        let mut started = None;
        self.state.send_if_modified(|state| {
            if policy == FetchPolicy::Deduplicate && state.phase == Phase::Fetching {
                return false;
            }
            state.generation += 1;
            state.phase = Phase::Fetching;
            state.error = None;
            state.scope = scope;
            started = Some(state.generation);
            true
        });
        started
    }

    fn deny_fetch(&self, policy: FetchPolicy) -> FetchOutcome {
        let mut denied = false;
        self.state.send_if_modified(|state| {
            if policy == FetchPolicy::Deduplicate && state.phase == Phase::Fetching {
                return false;
            }
            state.generation += 1;
            state.items.clear();
            state.phase = Phase::Idle;
            state.error = None;
            denied = true;
            true
        });
        if denied {
            info!(
                collection = self.resource.label(),
                "session may not list this collection"
            );
            FetchOutcome::NotPermitted
        } else {
            FetchOutcome::Skipped
        }
    }

    async fn load(
        &self,
        plan: &ListPlan,
        scope: ListingScope,
    ) -> Result<Vec<Arc<R::Item>>, LoadFailure> {
        let label = self.resource.label();
        let body = self
            .ports
            .transport
            .request(ApiRequest::get(plan.path.clone()))
            .await
            .map_err(|error| LoadFailure::Request(format!("failed to fetch {label}: {error}")))?;
        let raw = parse_list(plan.schema, body).map_err(|error| match error {
            ResponseError::Rejected { message } => LoadFailure::Request(message),
            ResponseError::Malformed { message } => LoadFailure::Malformed(message),
        })?;

        let mut items = Vec::with_capacity(raw.len());
        for value in raw {
            let item = self
                .resource
                .decode(value)
                .map_err(|error| LoadFailure::Malformed(error.to_string()))?;
            if self.resource.keep(scope, &item) {
                items.push(Arc::new(item));
            }
        }
        Ok(items)
    }

    fn commit(
        &self,
        generation: u64,
        result: Result<Vec<Arc<R::Item>>, LoadFailure>,
    ) -> FetchOutcome {
        let label = self.resource.label();
        let mut outcome = FetchOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            outcome = match result {
                Ok(items) => {
                    let count = items.len();
                    state.items = items;
                    state.phase = Phase::Ready;
                    state.error = None;
                    FetchOutcome::Applied { count }
                }
                Err(LoadFailure::Malformed(detail)) => {
                    warn!(collection = label, generation, %detail, "unexpected response format");
                    state.items.clear();
                    state.phase = Phase::Error;
                    state.error = Some(UNEXPECTED_FORMAT.to_owned());
                    FetchOutcome::Failed {
                        message: UNEXPECTED_FORMAT.to_owned(),
                    }
                }
                Err(LoadFailure::Request(message)) => {
                    state.phase = Phase::Error;
                    state.error = Some(message.clone());
                    FetchOutcome::Failed { message }
                }
            };
            true
        });

        match &outcome {
            FetchOutcome::Applied { count } => {
                debug!(collection = label, generation, count, "fetch applied");
            }
            FetchOutcome::Superseded => {
                debug!(collection = label, generation, "stale fetch result discarded");
            }
            FetchOutcome::Failed { message } => {
                warn!(collection = label, generation, %message, "fetch failed");
            }
            FetchOutcome::Skipped | FetchOutcome::NotPermitted => {}
        }
        outcome
    }

    /// Interpret a mutation answer. `Ok(Some(entity))` when the server sent
    /// back a decodable element, `Ok(None)` for any other acknowledgement.
    fn acknowledgement(&self, body: Value) -> ServiceResult<Option<R::Item>> {
        Ok(self.entity_answer(body)?.and_then(|value| self.decode_answer(value)))
    }

    /// Entity object carried by a mutation answer, unwrapped from a `box`
    /// field when the server nests it. `Ok(None)` for bare acknowledgements.
    fn entity_answer(&self, body: Value) -> ServiceResult<Option<Value>> {
        let payload = match parse_payload(self.resource.item_schema(), body) {
            Ok(payload) => payload,
            Err(error @ ResponseError::Rejected { .. }) => return Err(error.into()),
            Err(ResponseError::Malformed { .. }) => return Ok(None),
        };
        let Some(Value::Object(mut fields)) = payload else {
            return Ok(None);
        };
        if let Some(nested @ Value::Object(_)) = fields.remove(ENTITY_WRAPPER) {
            return Ok(nested.get("id").is_some().then_some(nested));
        }
        Ok(fields.contains_key("id").then_some(Value::Object(fields)))
    }

    fn decode_answer(&self, value: Value) -> Option<R::Item> {
        match self.resource.decode(value) {
            Ok(item) => Some(item),
            Err(error) => {
                warn!(
                    collection = self.resource.label(),
                    %error,
                    "mutation answer could not be decoded, treating it as an acknowledgement"
                );
                None
            }
        }
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            if state.error.is_none() {
                return false;
            }
            state.error = None;
            if state.phase == Phase::Error {
                state.phase = Phase::Idle;
            }
            true
        });
    }

    fn record_error(&self, message: String) {
        warn!(collection = self.resource.label(), %message, "operation failed");
        self.state.send_modify(|state| state.error = Some(message));
    }
}

/// Marks a started fetch. Dropped before [`PendingFetch::settle`], e.g.
/// when the caller abandons the future, it returns the phase to `Idle` so
/// later fetches are not skipped.
struct PendingFetch<'a, T> {
    state: &'a watch::Sender<CollectionSnapshot<T>>,
    label: &'static str,
    generation: u64,
    committed: bool,
}

impl<T> PendingFetch<'_, T> {
    fn settle(mut self) {
        self.committed = true;
    }
}

impl<T> Drop for PendingFetch<'_, T> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let generation = self.generation;
        let reset = self.state.send_if_modified(|state| {
            if state.generation != generation || state.phase != Phase::Fetching {
                return false;
            }
            state.phase = Phase::Idle;
            true
        });
        if reset {
            debug!(collection = self.label, generation, "abandoned fetch released");
        }
    }
}

impl<R: UpdatableResource> CollectionCoordinator<R> {
    /// Apply `patch` to the element with `id`.
    ///
    /// When the server answers with the updated entity, the fields it sent
    /// are merged into the local element and omitted fields keep their local
    /// values. A bare acknowledgement merges `patch` instead. Other elements
    /// are left untouched. Resolves to the new element, if known.
    ///
    /// # Errors
    ///
    /// Validation failures return before any request. Transport and envelope
    /// errors are recorded in the collection state and returned.
    pub async fn update(
        &self,
        id: ItemId<R>,
        patch: &R::Patch,
    ) -> ServiceResult<Option<Arc<R::Item>>> {
        let label = self.resource.label();
        let body = self.resource.update_body(patch)?;
        self.clear_error();

        let request = ApiRequest::put(self.resource.item_path(id), body);
        let answer = match self.ports.transport.request(request).await {
            Ok(body) => self.entity_answer(body),
            Err(error) => Err(error.into()),
        };
        let answer = match answer {
            Ok(answer) => answer,
            Err(error) => {
                self.record_error(format!("failed to update {label} {id}: {error}"));
                return Err(error);
            }
        };
        let authoritative = answer.is_some();

        let mut updated = None;
        self.state.send_if_modified(|state| {
            let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) else {
                return false;
            };
            *slot = Arc::new(self.merge_answer(slot.as_ref(), patch, answer.as_ref()));
            updated = Some(Arc::clone(slot));
            true
        });
        info!(collection = label, %id, authoritative, "element updated");
        Ok(updated.or_else(|| {
            answer
                .and_then(|value| self.decode_answer(value))
                .map(Arc::new)
        }))
    }

    fn merge_answer(&self, item: &R::Item, patch: &R::Patch, answer: Option<&Value>) -> R::Item {
        let Some(answer) = answer else {
            return self.resource.merge(item, patch);
        };
        match self.resource.absorb(item, answer.clone()) {
            Ok(merged) => merged,
            Err(error) => {
                warn!(
                    collection = self.resource.label(),
                    %error,
                    "update answer could not be merged, applying the request instead"
                );
                self.resource.merge(item, patch)
            }
        }
    }
}

impl CollectionCoordinator<CatalogResource> {
    /// Create a catalog entry from `draft`.
    ///
    /// # Errors
    ///
    /// Validation failures return before any request. Transport and envelope
    /// errors are recorded in the collection state and returned.
    pub async fn create(
        &self,
        draft: &CatalogDraft,
    ) -> ServiceResult<CreateOutcome<<CatalogResource as CollectionResource>::Item>> {
        let body = self.resource.create_body(draft)?;
        self.clear_error();

        let request = ApiRequest::post(CatalogResource::ADMIN_PATH, body);
        let answer = match self.ports.transport.request(request).await {
            Ok(body) => self.acknowledgement(body),
            Err(error) => Err(ServiceError::from(error)),
        };
        let created = match answer {
            Ok(created) => created,
            Err(error) => {
                self.record_error(format!("failed to create catalog entry: {error}"));
                return Err(error);
            }
        };

        match created {
            Some(entry) => {
                let entry = Arc::new(entry);
                self.state.send_if_modified(|state| {
                    if !self.resource.keep(state.scope, &entry) {
                        return false;
                    }
                    state.items.push(Arc::clone(&entry));
                    true
                });
                info!(collection = "catalog", id = %entry.id, "catalog entry created");
                Ok(CreateOutcome::Created(entry))
            }
            None => {
                info!(
                    collection = "catalog",
                    "catalog entry acknowledged, refreshing for server ids"
                );
                Ok(CreateOutcome::Refreshed(self.refresh().await))
            }
        }
    }
}
