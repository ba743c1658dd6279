//! Unit tests for catalog field mapping and edit helpers.

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

#[fixture]
fn entry() -> CatalogEntry {
    CatalogEntry {
        id: BoxId::new(7),
        name: "Forest Spirits".to_owned(),
        description: "Series two".to_owned(),
        image: Some("/img/forest.png".to_owned()),
        price: 59.0,
        stock: 12,
        published: true,
        variants: vec![
            Variant::new(Some(VariantId::new(70)), "Moss", "/img/moss.png"),
            Variant::new(Some(VariantId::new(-3)), "Fern", ""),
            Variant::new(None, "Secret", ""),
        ],
        created_at: None,
    }
}

#[rstest]
#[case(true)]
#[case(false)]
fn round_trip_preserves_published_and_variants(mut entry: CatalogEntry, #[case] published: bool) {
    entry.published = published;

    let restored = to_client(to_wire(&entry)).expect("wire entity should map back");

    assert_eq!(restored.published, entry.published);
    assert_eq!(restored.variants, entry.variants);
    assert_eq!(restored, entry);
}

#[rstest]
fn round_trip_preserves_empty_variant_lists(mut entry: CatalogEntry) {
    entry.variants.clear();
    let restored = to_client(to_wire(&entry)).expect("wire entity should map back");
    assert!(restored.variants.is_empty());
}

#[rstest]
fn outgoing_payload_never_mentions_published(entry: CatalogEntry) {
    let payload = to_wire(&entry).to_value();

    assert_eq!(payload["isListed"], json!(true));
    assert!(payload.get("isPublished").is_none());
    assert!(payload.get("published").is_none());
    assert_eq!(payload["items"][0], json!({"id": 70, "name": "Moss", "image": "/img/moss.png"}));
}

#[rstest]
#[case(json!({"id": 1, "isListed": true}), true)]
#[case(json!({"id": 1, "isListed": false}), false)]
#[case(json!({"id": 1}), false)]
#[case(json!({"id": 1, "isListed": false, "isPublished": true}), true)]
fn inbound_listed_flag_maps_to_published(#[case] payload: serde_json::Value, #[case] expected: bool) {
    let wire = WireEntity::from_value(payload).expect("payload should decode");
    let entry = to_client(wire).expect("entity should map");
    assert_eq!(entry.published, expected);
}

#[test]
fn missing_variants_and_fields_default_to_empty() {
    let wire = WireEntity::from_value(json!({
        "id": 4,
        "name": "Plain",
        "price": 10,
        "stock": 2,
        "items": [{"id": 9}]
    }))
    .expect("payload should decode");

    let entry = to_client(wire).expect("entity should map");

    assert_eq!(entry.description, "");
    assert_eq!(entry.variants, vec![Variant::new(Some(VariantId::new(9)), "", "")]);

    let bare = to_client(WireEntity::from_value(json!({"id": 5})).expect("decode"))
        .expect("entity should map");
    assert!(bare.variants.is_empty());
}

#[rstest]
#[case(json!({"name": "no id"}), MappingError::MissingId)]
#[case(json!({"id": 1, "price": -1.0}), MappingError::InvalidPrice)]
#[case(json!({"id": 1, "stock": -2}), MappingError::InvalidStock { stock: -2 })]
fn invalid_entities_are_rejected(#[case] payload: serde_json::Value, #[case] expected: MappingError) {
    let wire = WireEntity::from_value(payload).expect("payload should decode");
    assert_eq!(to_client(wire), Err(expected));
}

#[test]
fn ill_typed_payloads_report_decode_errors() {
    let error = WireEntity::from_value(json!({"id": "seven"})).expect_err("decode must fail");
    assert!(matches!(error, MappingError::Decode { .. }));
}

#[test]
fn backend_timestamps_are_decoded() {
    let wire = WireEntity::from_value(json!({"id": 1, "createdAt": "2024-05-01T12:30:00"}))
        .expect("payload should decode");
    assert!(to_client(wire).expect("entity").created_at.is_some());
}

#[rstest]
fn submission_strips_only_temporary_variant_ids(entry: CatalogEntry) {
    let payload = to_wire(&entry).into_submission().to_value();

    assert_eq!(payload["items"][0]["id"], json!(70));
    assert_eq!(payload["items"][1]["id"], json!(null));
    assert_eq!(payload["items"][2]["id"], json!(null));
}

#[test]
fn patch_payload_carries_only_populated_fields() {
    let patch = CatalogEntryPatch {
        name: Some("Renamed".to_owned()),
        published: Some(false),
        ..CatalogEntryPatch::default()
    };

    let payload = WireEntity::from_patch(&patch).to_value();

    assert_eq!(payload, json!({"name": "Renamed", "isListed": false}));
}

#[rstest]
fn patch_merges_into_local_entry(entry: CatalogEntry) {
    let patch = CatalogEntryPatch {
        price: Some(65.0),
        stock: Some(3),
        ..CatalogEntryPatch::default()
    };

    let merged = patch.apply_to(&entry);

    assert_eq!(merged.price, 65.0);
    assert_eq!(merged.stock, 3);
    assert_eq!(merged.name, entry.name);
    assert_eq!(merged.variants, entry.variants);
}

#[rstest]
fn full_patch_reproduces_entry(entry: CatalogEntry) {
    let patch = CatalogEntryPatch::from_entry(&entry);
    assert_eq!(patch.apply_to(&entry), entry);
}

#[rstest]
#[case(CatalogEntryPatch { name: Some("  ".to_owned()), ..CatalogEntryPatch::default() },
    CatalogValidationError::EmptyName)]
#[case(CatalogEntryPatch { price: Some(f64::NAN), ..CatalogEntryPatch::default() },
    CatalogValidationError::InvalidPrice)]
#[case(CatalogEntryPatch { price: Some(-0.5), ..CatalogEntryPatch::default() },
    CatalogValidationError::InvalidPrice)]
#[case(CatalogEntryPatch {
        variants: Some(vec![Variant::new(None, "ok", ""), Variant::new(None, " ", "")]),
        ..CatalogEntryPatch::default()
    },
    CatalogValidationError::EmptyVariantName { index: 1 })]
fn invalid_patches_are_rejected(
    #[case] patch: CatalogEntryPatch,
    #[case] expected: CatalogValidationError,
) {
    assert_eq!(patch.validate(), Err(expected));
}

#[test]
fn empty_patch_is_valid() {
    assert_eq!(CatalogEntryPatch::default().validate(), Ok(()));
}

#[test]
fn variant_list_allocates_distinct_temporary_ids() {
    let mut list = VariantList::from_variants(vec![
        Variant::new(Some(VariantId::new(11)), "Kept", ""),
        Variant::new(Some(VariantId::new(-4)), "Pending", ""),
    ]);

    let first = list.add("New A", "");
    let second = list.add("New B", "");

    assert!(first.is_temporary());
    assert!(second.is_temporary());
    assert_eq!(first, VariantId::new(-5));
    assert_eq!(second, VariantId::new(-6));
    assert_eq!(list.len(), 4);
}

#[test]
fn variant_list_keeps_the_last_variant() {
    let mut list = VariantList::default();
    let only = list.add("Only", "");

    assert_eq!(list.remove(only), Err(VariantListError::LastVariant));
    assert_eq!(
        list.remove(VariantId::new(99)),
        Err(VariantListError::NotFound(VariantId::new(99)))
    );
    assert_eq!(list.len(), 1);
}

#[test]
fn variant_list_edits_and_removes_by_id() {
    let mut list = VariantList::default();
    let a = list.add("A", "");
    let b = list.add("B", "");

    list.edit(b, "B2", "/img/b2.png").expect("edit should succeed");
    let removed = list.remove(a).expect("remove should succeed");

    assert_eq!(removed.name, "A");
    assert_eq!(list.as_slice(), &[Variant::new(Some(b), "B2", "/img/b2.png")]);
}

#[test]
fn draft_payload_marks_new_variants_for_creation() {
    let mut draft = CatalogDraft::new("  Night Market  ", 39.5);
    draft.published = true;
    draft.variants.add("Lantern", "");
    draft.validate().expect("draft should validate");

    let payload = WireEntity::from_draft(&draft).into_submission().to_value();

    assert_eq!(payload["name"], json!("Night Market"));
    assert_eq!(payload["isListed"], json!(true));
    assert_eq!(payload["items"], json!([{"id": null, "name": "Lantern", "image": ""}]));
    assert!(payload.get("id").is_none());
}
