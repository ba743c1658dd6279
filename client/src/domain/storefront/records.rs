//! Read models returned by storefront endpoints.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::domain::catalog::{BoxId, CatalogEntry, MappingError, WireEntity, to_client};
use crate::domain::timestamp;

/// Variant won from a catalog entry.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeItem {
    /// Variant id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Image reference.
    #[serde(default)]
    pub image: String,
    /// Optional rarity label.
    #[serde(default)]
    pub rarity: Option<String>,
}

/// Outcome of buying one draw.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    /// Variant drawn.
    #[serde(default, rename = "item")]
    pub variant: Option<PrizeItem>,
    /// Whether the user did not own this variant before.
    #[serde(default, alias = "new")]
    pub is_new: bool,
    /// Wallet balance after the purchase.
    #[serde(default)]
    pub balance: Option<f64>,
}

/// Comment attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment id.
    pub id: i64,
    /// Author display name.
    #[serde(default)]
    pub user: String,
    /// Text.
    #[serde(default)]
    pub content: String,
    /// Posting time, when readable.
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub date: Option<NaiveDateTime>,
    /// Commented entry.
    #[serde(default)]
    pub box_id: Option<BoxId>,
}

/// One past draw from the user's history.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnRecord {
    /// Record id.
    pub id: i64,
    /// Entry the draw was made from.
    pub entry: Option<CatalogEntry>,
    /// Variant won.
    pub item: Option<PrizeItem>,
    /// Price paid.
    pub price: Option<f64>,
    /// Draw time.
    pub drawn_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DrawnRecordDto {
    id: i64,
    #[serde(default)]
    blind_box: Option<WireEntity>,
    #[serde(default)]
    item: Option<PrizeItem>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    drawn_at: Option<NaiveDateTime>,
}

impl TryFrom<DrawnRecordDto> for DrawnRecord {
    type Error = MappingError;

    fn try_from(dto: DrawnRecordDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: dto.id,
            entry: dto.blind_box.map(to_client).transpose()?,
            item: dto.item,
            price: dto.price,
            drawn_at: dto.drawn_at,
        })
    }
}
