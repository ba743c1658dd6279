//! Field mapping between the backend's catalog payload and [`CatalogEntry`].
//!
//! The backend names the publish flag `isListed`; consumers only ever see
//! `published`. Outgoing payloads never carry the client-side name.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::{
    BoxId, CatalogDraft, CatalogEntry, CatalogEntryPatch, Variant, VariantId, validate_price,
};
use crate::domain::timestamp;

/// Errors raised when a wire payload cannot become a [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The payload carried no id.
    MissingId,
    /// Price negative or not a finite number.
    InvalidPrice,
    /// Stock negative or out of range.
    InvalidStock {
        /// Value the server sent.
        stock: i64,
    },
    /// The JSON did not have the expected shape.
    Decode {
        /// Decoder diagnostic.
        message: String,
    },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "catalog entry has no id"),
            Self::InvalidPrice => write!(f, "catalog entry price is invalid"),
            Self::InvalidStock { stock } => write!(f, "catalog entry stock {stock} is invalid"),
            Self::Decode { message } => write!(f, "catalog entry could not be decoded: {message}"),
        }
    }
}

impl std::error::Error for MappingError {}

/// Variant as exchanged with the backend (`items[]`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVariant {
    /// Server id; `null` asks the backend to create the variant.
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Owning entry, as echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_id: Option<i64>,
}

/// Catalog entry as exchanged with the backend.
///
/// Every field is optional so the same type serves full entities and partial
/// update payloads. `isPublished` is accepted inbound but never serialised.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntity {
    /// Backend id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Unit price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Units left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    /// Backend publish flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_listed: Option<bool>,
    /// Client-side publish flag, tolerated inbound only.
    #[serde(default, skip_serializing)]
    pub is_published: Option<bool>,
    /// Contained variants.
    #[serde(default, rename = "items", skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<WireVariant>>,
    /// Creation time; never sent back.
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_optional",
        skip_serializing
    )]
    pub created_at: Option<NaiveDateTime>,
}

impl WireEntity {
    /// Decode a JSON value.
    pub fn from_value(value: Value) -> Result<Self, MappingError> {
        serde_json::from_value(value).map_err(|error| MappingError::Decode {
            message: error.to_string(),
        })
    }

    /// Encode as JSON.
    pub fn to_value(&self) -> Value {
        // Serialising plain optional fields cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Replace temporary (negative) variant ids with `null` so the backend
    /// creates those variants.
    #[must_use]
    pub fn into_submission(mut self) -> Self {
        if let Some(variants) = self.variants.as_mut() {
            for variant in variants.iter_mut() {
                if variant.id.is_some_and(|id| VariantId::new(id).is_temporary()) {
                    variant.id = None;
                }
            }
        }
        self
    }

    /// Wire payload for a partial update.
    pub fn from_patch(patch: &CatalogEntryPatch) -> Self {
        Self {
            id: None,
            name: patch.name.clone(),
            description: patch.description.clone(),
            image: patch.image.clone(),
            price: patch.price,
            stock: patch.stock.map(i64::from),
            is_listed: patch.published,
            is_published: None,
            variants: patch.variants.as_deref().map(variants_to_wire),
            created_at: None,
        }
    }

    /// Fields the server sent, as a patch over a known entry.
    ///
    /// Absent fields stay `None`, so applying the patch keeps the local
    /// values for them. The id and creation time are never patched.
    pub fn into_patch(self) -> Result<CatalogEntryPatch, MappingError> {
        if let Some(price) = self.price {
            validate_price(price).map_err(|_| MappingError::InvalidPrice)?;
        }
        let stock = self
            .stock
            .map(|raw| u32::try_from(raw).map_err(|_| MappingError::InvalidStock { stock: raw }))
            .transpose()?;
        Ok(CatalogEntryPatch {
            name: self.name,
            description: self.description,
            image: self.image,
            price: self.price,
            stock,
            published: self.is_published.or(self.is_listed),
            variants: self.variants.map(variants_to_client),
        })
    }

    /// Wire payload for a new entry.
    pub fn from_draft(draft: &CatalogDraft) -> Self {
        Self {
            id: None,
            name: Some(draft.name.trim().to_owned()),
            description: Some(draft.description.clone()),
            image: draft.image.clone(),
            price: Some(draft.price),
            stock: Some(i64::from(draft.stock)),
            is_listed: Some(draft.published),
            is_published: None,
            variants: Some(variants_to_wire(draft.variants.as_slice())),
            created_at: None,
        }
    }
}

/// Map a backend entity to its client representation.
///
/// `published` takes an explicit `isPublished` when present, otherwise the
/// backend's `isListed`, otherwise `false`. Missing variants become an empty
/// list and missing variant names or images become empty strings.
pub fn to_client(wire: WireEntity) -> Result<CatalogEntry, MappingError> {
    let id = wire.id.ok_or(MappingError::MissingId)?;
    let price = wire.price.unwrap_or(0.0);
    validate_price(price).map_err(|_| MappingError::InvalidPrice)?;
    let raw_stock = wire.stock.unwrap_or(0);
    let stock =
        u32::try_from(raw_stock).map_err(|_| MappingError::InvalidStock { stock: raw_stock })?;

    let variants = variants_to_client(wire.variants.unwrap_or_default());

    Ok(CatalogEntry {
        id: BoxId::new(id),
        name: wire.name.unwrap_or_default(),
        description: wire.description.unwrap_or_default(),
        image: wire.image,
        price,
        stock,
        published: wire.is_published.or(wire.is_listed).unwrap_or(false),
        variants,
        created_at: wire.created_at,
    })
}

/// Map a client entry to the backend representation.
///
/// `published` travels as `isListed`; variant ids are copied verbatim.
pub fn to_wire(entry: &CatalogEntry) -> WireEntity {
    WireEntity {
        id: Some(entry.id.get()),
        name: Some(entry.name.clone()),
        description: Some(entry.description.clone()),
        image: entry.image.clone(),
        price: Some(entry.price),
        stock: Some(i64::from(entry.stock)),
        is_listed: Some(entry.published),
        is_published: None,
        variants: Some(variants_to_wire(&entry.variants)),
        created_at: entry.created_at,
    }
}

fn variants_to_client(variants: Vec<WireVariant>) -> Vec<Variant> {
    variants
        .into_iter()
        .map(|variant| Variant {
            id: variant.id.map(VariantId::new),
            name: variant.name.unwrap_or_default(),
            image: variant.image.unwrap_or_default(),
        })
        .collect()
}

fn variants_to_wire(variants: &[Variant]) -> Vec<WireVariant> {
    variants
        .iter()
        .map(|variant| WireVariant {
            id: variant.id.map(VariantId::get),
            name: Some(variant.name.clone()),
            image: Some(variant.image.clone()),
            box_id: None,
        })
        .collect()
}
