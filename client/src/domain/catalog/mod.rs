//! Catalog entries ("blind boxes") and their variants.
//!
//! [`CatalogEntry`] is the client-side representation; the backend speaks
//! [`WireEntity`]. Conversion in both directions goes through [`to_client`]
//! and [`to_wire`], which own the `isListed`/`published` field mapping.

mod entry;
mod mapping;

pub use entry::{
    BoxId, CatalogDraft, CatalogEntry, CatalogEntryPatch, CatalogValidationError, Variant,
    VariantId, VariantList, VariantListError,
};
pub use mapping::{MappingError, WireEntity, WireVariant, to_client, to_wire};

#[cfg(test)]
mod tests;
