//! Client-side catalog types and edit-form helpers.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Backend-assigned catalog entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(i64);

impl BoxId {
    /// Wrap a raw id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant identifier.
///
/// Negative values are client-side placeholders for variants that have not
/// been persisted yet; the backend replaces them with real ids on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(i64);

impl VariantId {
    /// Wrap a raw id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this is a client-side placeholder.
    pub const fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One possible item contained in a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    /// Server id, a temporary negative id, or `None` when the server sent none.
    pub id: Option<VariantId>,
    /// Display name.
    pub name: String,
    /// Image reference; empty when unset.
    pub image: String,
}

impl Variant {
    /// Build a variant.
    pub fn new(id: Option<VariantId>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: image.into(),
        }
    }
}

/// Catalog entry as presented to consumers.
///
/// ## Invariants
/// - `price` is finite and non-negative.
/// - `id` is assigned by the backend and never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Backend id.
    pub id: BoxId,
    /// Display name.
    pub name: String,
    /// Long description; empty when unset.
    pub description: String,
    /// Cover image reference.
    pub image: Option<String>,
    /// Unit price.
    pub price: f64,
    /// Units left.
    pub stock: u32,
    /// Whether shoppers can see the entry.
    pub published: bool,
    /// Contained variants, in display order.
    pub variants: Vec<Variant>,
    /// Creation time reported by the server.
    pub created_at: Option<NaiveDateTime>,
}

/// Validation failures for catalog drafts and patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    /// Name missing or blank.
    EmptyName,
    /// Price negative or not a finite number.
    InvalidPrice,
    /// A variant has a blank name.
    EmptyVariantName {
        /// Position of the offending variant.
        index: usize,
    },
}

impl fmt::Display for CatalogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidPrice => write!(f, "price must be a finite, non-negative amount"),
            Self::EmptyVariantName { index } => {
                write!(f, "variant {} must have a name", index + 1)
            }
        }
    }
}

impl std::error::Error for CatalogValidationError {}

/// Errors raised by [`VariantList`] edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantListError {
    /// An entry must keep at least one variant.
    LastVariant,
    /// No variant with this id exists in the list.
    NotFound(VariantId),
}

impl fmt::Display for VariantListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastVariant => write!(f, "at least one variant must remain"),
            Self::NotFound(id) => write!(f, "variant {id} not found"),
        }
    }
}

impl std::error::Error for VariantListError {}

/// Editable variant list that hands out temporary ids for new variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantList {
    variants: Vec<Variant>,
    next_temporary: i64,
}

impl Default for VariantList {
    fn default() -> Self {
        Self::from_variants(Vec::new())
    }
}

impl VariantList {
    /// Start from existing variants, e.g. those of an entry being edited.
    pub fn from_variants(variants: Vec<Variant>) -> Self {
        let lowest = variants
            .iter()
            .filter_map(|variant| variant.id)
            .map(VariantId::get)
            .filter(|raw| *raw < 0)
            .min()
            .unwrap_or(0);
        Self {
            variants,
            next_temporary: lowest - 1,
        }
    }

    /// Append a new variant under a fresh temporary id.
    pub fn add(&mut self, name: impl Into<String>, image: impl Into<String>) -> VariantId {
        let id = VariantId::new(self.next_temporary);
        self.next_temporary -= 1;
        self.variants.push(Variant::new(Some(id), name, image));
        id
    }

    /// Replace the name and image of the variant with `id`.
    pub fn edit(
        &mut self,
        id: VariantId,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Result<(), VariantListError> {
        let variant = self
            .variants
            .iter_mut()
            .find(|variant| variant.id == Some(id))
            .ok_or(VariantListError::NotFound(id))?;
        variant.name = name.into();
        variant.image = image.into();
        Ok(())
    }

    /// Remove the variant with `id`; the last remaining variant is kept.
    pub fn remove(&mut self, id: VariantId) -> Result<Variant, VariantListError> {
        let index = self
            .variants
            .iter()
            .position(|variant| variant.id == Some(id))
            .ok_or(VariantListError::NotFound(id))?;
        if self.variants.len() == 1 {
            return Err(VariantListError::LastVariant);
        }
        Ok(self.variants.remove(index))
    }

    /// Variants in display order.
    pub fn as_slice(&self) -> &[Variant] {
        self.variants.as_slice()
    }

    /// Number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Consume the list.
    pub fn into_vec(self) -> Vec<Variant> {
        self.variants
    }
}

/// New catalog entry awaiting creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogDraft {
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Cover image reference.
    pub image: Option<String>,
    /// Unit price.
    pub price: f64,
    /// Initial stock.
    pub stock: u32,
    /// Publish immediately.
    pub published: bool,
    /// Variants, typically all with temporary ids.
    pub variants: VariantList,
}

impl CatalogDraft {
    /// Start a draft with the required fields.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            image: None,
            price,
            stock: 0,
            published: false,
            variants: VariantList::default(),
        }
    }

    /// Check the draft before it is sent.
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_variants(self.variants.as_slice())
    }
}

/// Partial update for an existing catalog entry; `None` fields are left as is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogEntryPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New cover image.
    pub image: Option<String>,
    /// New price.
    pub price: Option<f64>,
    /// New stock.
    pub stock: Option<u32>,
    /// New publish flag.
    pub published: Option<bool>,
    /// Replacement variant list.
    pub variants: Option<Vec<Variant>>,
}

impl CatalogEntryPatch {
    /// Patch carrying every field of `entry`, as submitted by a full edit form.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            name: Some(entry.name.clone()),
            description: Some(entry.description.clone()),
            image: entry.image.clone(),
            price: Some(entry.price),
            stock: Some(entry.stock),
            published: Some(entry.published),
            variants: Some(entry.variants.clone()),
        }
    }

    /// Check the populated fields.
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        match &self.variants {
            Some(variants) => validate_variants(variants),
            None => Ok(()),
        }
    }

    /// Merge the populated fields into a copy of `entry`.
    pub fn apply_to(&self, entry: &CatalogEntry) -> CatalogEntry {
        let mut merged = entry.clone();
        if let Some(name) = &self.name {
            merged.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            merged.description.clone_from(description);
        }
        if let Some(image) = &self.image {
            merged.image = Some(image.clone());
        }
        if let Some(price) = self.price {
            merged.price = price;
        }
        if let Some(stock) = self.stock {
            merged.stock = stock;
        }
        if let Some(published) = self.published {
            merged.published = published;
        }
        if let Some(variants) = &self.variants {
            merged.variants.clone_from(variants);
        }
        merged
    }
}

fn validate_name(name: &str) -> Result<(), CatalogValidationError> {
    if name.trim().is_empty() {
        Err(CatalogValidationError::EmptyName)
    } else {
        Ok(())
    }
}

pub(super) fn validate_price(price: f64) -> Result<(), CatalogValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(CatalogValidationError::InvalidPrice)
    }
}

fn validate_variants(variants: &[Variant]) -> Result<(), CatalogValidationError> {
    match variants
        .iter()
        .position(|variant| variant.name.trim().is_empty())
    {
        Some(index) => Err(CatalogValidationError::EmptyVariantName { index }),
        None => Ok(()),
    }
}
