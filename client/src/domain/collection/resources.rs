//! Resource descriptions plugged into [`super::CollectionCoordinator`].
//!
//! A resource knows its endpoints, their response schemas and how to decode
//! one element; the coordinator owns everything stateful.

use std::fmt;

use serde_json::Value;

use super::state::ListingScope;
use crate::domain::catalog::{
    BoxId, CatalogDraft, CatalogEntry, CatalogEntryPatch, WireEntity, to_client,
};
use crate::domain::error::ServiceError;
use crate::domain::response::{ResponseError, ResponseSchema};
use crate::domain::session::Session;
use crate::domain::user::{UserAccount, UserId};

/// Entities with a stable identity.
pub trait Identified {
    /// Identifier type.
    type Id: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Stable identifier.
    fn id(&self) -> Self::Id;
}

impl Identified for CatalogEntry {
    type Id = BoxId;

    fn id(&self) -> BoxId {
        self.id
    }
}

impl Identified for UserAccount {
    type Id = UserId;

    fn id(&self) -> UserId {
        UserAccount::id(self)
    }
}

/// Identifier type of a resource's items.
pub type ItemId<R> = <<R as CollectionResource>::Item as Identified>::Id;

/// Endpoint and schema of one list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    /// Path relative to the API base.
    pub path: String,
    /// Declared response shape.
    pub schema: ResponseSchema,
}

/// Description of a remotely listed collection.
pub trait CollectionResource: Send + Sync + 'static {
    /// Element type.
    type Item: Identified + fmt::Debug + Send + Sync + 'static;

    /// Short name used in log fields and error messages.
    fn label(&self) -> &'static str;

    /// List request for `scope`, or `None` when `session` may not list.
    fn list_plan(&self, scope: ListingScope, session: &Session) -> Option<ListPlan>;

    /// Decode one element.
    fn decode(&self, value: Value) -> Result<Self::Item, ServiceError>;

    /// Whether a decoded element belongs in the `scope` listing.
    fn keep(&self, _scope: ListingScope, _item: &Self::Item) -> bool {
        true
    }

    /// Path of a single element.
    fn item_path(&self, id: <Self::Item as Identified>::Id) -> String;

    /// Response schema of single-element endpoints.
    fn item_schema(&self) -> ResponseSchema;
}

/// Resources whose elements accept partial updates.
pub trait UpdatableResource: CollectionResource {
    /// Partial update payload.
    type Patch: fmt::Debug + Send + Sync;

    /// Validate `patch` and render the request body.
    fn update_body(&self, patch: &Self::Patch) -> Result<Value, ServiceError>;

    /// Merge `patch` into a local copy of `item`.
    fn merge(&self, item: &Self::Item, patch: &Self::Patch) -> Self::Item;

    /// Merge the fields of a server answer into a local copy of `item`.
    /// Fields the answer omits keep their local values.
    fn absorb(&self, item: &Self::Item, answer: Value) -> Result<Self::Item, ServiceError>;
}

/// Which catalog listing a coordinator serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingMode {
    /// Shopper view: `GET /blind-boxes`, published entries only.
    #[default]
    Public,
    /// Admin console: `GET /admin/boxes`, every entry.
    Admin,
}

/// Catalog ("blind box") endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogResource {
    mode: ListingMode,
}

impl CatalogResource {
    /// Public listing path.
    pub const PUBLIC_PATH: &'static str = "/blind-boxes";
    /// Admin CRUD path.
    pub const ADMIN_PATH: &'static str = "/admin/boxes";

    /// Describe the catalog in `mode`.
    pub const fn new(mode: ListingMode) -> Self {
        Self { mode }
    }

    /// Configured listing mode.
    pub const fn mode(&self) -> ListingMode {
        self.mode
    }

    const fn effective_mode(&self, scope: ListingScope) -> ListingMode {
        match scope {
            ListingScope::Default => self.mode,
            ListingScope::All => ListingMode::Admin,
        }
    }

    /// Validate `draft` and render the creation body.
    pub fn create_body(&self, draft: &CatalogDraft) -> Result<Value, ServiceError> {
        draft.validate()?;
        Ok(WireEntity::from_draft(draft).into_submission().to_value())
    }
}

impl CollectionResource for CatalogResource {
    type Item = CatalogEntry;

    fn label(&self) -> &'static str {
        "catalog"
    }

    fn list_plan(&self, scope: ListingScope, _session: &Session) -> Option<ListPlan> {
        let plan = match self.effective_mode(scope) {
            ListingMode::Public => ListPlan {
                path: Self::PUBLIC_PATH.to_owned(),
                schema: ResponseSchema::Enveloped,
            },
            ListingMode::Admin => ListPlan {
                path: Self::ADMIN_PATH.to_owned(),
                schema: ResponseSchema::Bare,
            },
        };
        Some(plan)
    }

    fn decode(&self, value: Value) -> Result<CatalogEntry, ServiceError> {
        Ok(to_client(WireEntity::from_value(value)?)?)
    }

    fn keep(&self, scope: ListingScope, item: &CatalogEntry) -> bool {
        match self.effective_mode(scope) {
            ListingMode::Public => item.published,
            ListingMode::Admin => true,
        }
    }

    fn item_path(&self, id: BoxId) -> String {
        format!("{}/{id}", Self::ADMIN_PATH)
    }

    fn item_schema(&self) -> ResponseSchema {
        ResponseSchema::Bare
    }
}

impl UpdatableResource for CatalogResource {
    type Patch = CatalogEntryPatch;

    fn update_body(&self, patch: &CatalogEntryPatch) -> Result<Value, ServiceError> {
        patch.validate()?;
        Ok(WireEntity::from_patch(patch).into_submission().to_value())
    }

    fn merge(&self, item: &CatalogEntry, patch: &CatalogEntryPatch) -> CatalogEntry {
        patch.apply_to(item)
    }

    fn absorb(&self, item: &CatalogEntry, answer: Value) -> Result<CatalogEntry, ServiceError> {
        let patch = WireEntity::from_value(answer)?.into_patch()?;
        Ok(patch.apply_to(item))
    }
}

/// Admin user-management endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserResource;

impl UserResource {
    /// User listing path.
    pub const PATH: &'static str = "/users";
}

impl CollectionResource for UserResource {
    type Item = UserAccount;

    fn label(&self) -> &'static str {
        "users"
    }

    fn list_plan(&self, _scope: ListingScope, session: &Session) -> Option<ListPlan> {
        session.is_admin().then(|| ListPlan {
            path: Self::PATH.to_owned(),
            schema: ResponseSchema::Enveloped,
        })
    }

    fn decode(&self, value: Value) -> Result<UserAccount, ServiceError> {
        serde_json::from_value(value)
            .map_err(|error| ResponseError::malformed(error.to_string()).into())
    }

    fn item_path(&self, id: UserId) -> String {
        format!("{}/{id}", Self::PATH)
    }

    fn item_schema(&self) -> ResponseSchema {
        ResponseSchema::Enveloped
    }
}
