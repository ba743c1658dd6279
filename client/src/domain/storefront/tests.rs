//! Regression coverage for storefront operations.

use std::sync::Arc;

use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{ApiError, MultipartValue, RequestBody, SessionKey};
use crate::outbound::session::MemorySessionStore;
use crate::test_support::transport::ScriptedTransport;

fn ok(data: Value) -> Result<Value, ApiError> {
    Ok(json!({ "success": true, "message": "ok", "data": data }))
}

fn logged_in() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_entries([
        (SessionKey::LoggedIn, "true"),
        (SessionKey::Token, "token-1"),
        (SessionKey::UserId, "42"),
        (SessionKey::Role, "USER"),
    ]))
}

fn service(
    session: Arc<MemorySessionStore>,
    script: impl IntoIterator<Item = Result<Value, ApiError>>,
) -> (StorefrontService, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(script));
    (StorefrontService::new(transport.clone(), session), transport)
}

fn json_body(transport: &ScriptedTransport, index: usize) -> Value {
    match transport.requests()[index].body.clone() {
        Some(RequestBody::Json(body)) => body,
        other => panic!("expected a JSON body, got {other:?}"),
    }
}

#[tokio::test]
async fn search_encodes_the_trimmed_keyword() {
    let (service, transport) = service(
        Arc::new(MemorySessionStore::new()),
        [ok(json!([{"id": 4, "name": "Cats & Dogs", "isListed": true}]))],
    );

    let found = service.search("  cats & dogs ").await.expect("search");

    assert_eq!(found.len(), 1);
    assert!(found[0].published);
    assert_eq!(
        transport.requests()[0].path,
        "/blind-boxes/search?keyword=cats+%26+dogs"
    );
}

#[rstest]
#[case::is_new(json!({"item": {"id": 9, "name": "Gold"}, "isNew": true, "balance": 12.5}))]
#[case::short_flag(json!({"item": {"id": 9, "name": "Gold"}, "new": true, "balance": 12.5}))]
#[tokio::test]
async fn buy_reports_the_drawn_variant(#[case] data: Value) {
    let (service, transport) = service(logged_in(), [ok(data)]);

    let result = service.buy(BoxId::new(3)).await.expect("purchase");

    assert!(result.is_new);
    assert_eq!(result.balance, Some(12.5));
    assert_eq!(result.variant.map(|item| item.name).as_deref(), Some("Gold"));
    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/blind-boxes/3/buy");
}

#[tokio::test]
async fn user_operations_need_a_token() {
    let (service, transport) = service(Arc::new(MemorySessionStore::new()), []);

    let buy = service.buy(BoxId::new(1)).await.expect_err("no token");
    let favorites = service.favorites().await.expect_err("no token");
    let recharge = RechargeRequest::new(10.0).expect("amount");
    let topped = service.recharge(&recharge).await.expect_err("no token");

    for error in [buy, favorites, topped] {
        assert_eq!(error, ServiceError::NotLoggedIn);
    }
    assert_eq!(transport.calls(), 0);
}

#[rstest]
#[case(json!(true), true)]
#[case(json!(false), false)]
#[case(Value::Null, false)]
#[tokio::test]
async fn favourite_flag_defaults_to_false(#[case] data: Value, #[case] expected: bool) {
    let (service, transport) = service(logged_in(), [ok(data)]);

    assert_eq!(service.is_favorited(BoxId::new(8)).await.expect("flag"), expected);
    assert_eq!(transport.requests()[0].path, "/blind-boxes/8/favorite");
}

#[tokio::test]
async fn unfavourite_uses_delete() {
    let (service, transport) = service(logged_in(), [ok(Value::Null)]);

    service.unfavorite(BoxId::new(8)).await.expect("unfavourite");

    assert_eq!(transport.requests()[0].method, HttpMethod::Delete);
}

#[tokio::test]
async fn posting_a_comment_sends_the_trimmed_text_with_a_form_timeout() {
    let (service, transport) = service(
        logged_in(),
        [ok(json!({
            "id": 31,
            "user": "alice",
            "content": "lovely",
            "date": "2024-05-01T10:00:00",
            "boxId": 6
        }))],
    );
    let draft = CommentDraft::new(BoxId::new(6), "  lovely  ").expect("draft");

    let comment = service.post_comment(&draft).await.expect("comment");

    assert_eq!(comment.id, 31);
    assert_eq!(comment.box_id, Some(BoxId::new(6)));
    assert!(comment.date.is_some());
    assert_eq!(json_body(&transport, 0), json!({"boxId": 6, "content": "lovely"}));
    assert_eq!(transport.requests()[0].timeout, Some(FORM_TIMEOUT));
}

#[tokio::test]
async fn missing_comment_lists_are_empty() {
    let (service, _) = service(Arc::new(MemorySessionStore::new()), [ok(Value::Null)]);

    assert!(service.comments(BoxId::new(2)).await.expect("comments").is_empty());
}

#[tokio::test]
async fn draw_history_maps_embedded_entries() {
    let (service, transport) = service(
        logged_in(),
        [ok(json!([
            {
                "id": 1,
                "blindBox": {"id": 5, "name": "Forest", "isListed": true},
                "item": {"id": 50, "name": "Fox", "rarity": "rare"},
                "price": 9.9,
                "drawnAt": "2024-05-01 12:30:00"
            },
            {"id": 2}
        ]))],
    );

    let history = service.drawn_history(UserId::new(42)).await.expect("history");

    assert_eq!(history.len(), 2);
    let first = &history[0];
    assert_eq!(first.entry.as_ref().map(|entry| entry.id), Some(BoxId::new(5)));
    assert_eq!(
        first.item.as_ref().and_then(|item| item.rarity.as_deref()),
        Some("rare")
    );
    assert!(first.drawn_at.is_some());
    assert!(history[1].entry.is_none());
    assert_eq!(transport.requests()[0].path, "/drawn/user/42");
}

#[tokio::test]
async fn draw_history_rejects_entries_without_ids() {
    let (service, _) = service(
        logged_in(),
        [ok(json!([{"id": 1, "blindBox": {"name": "Nameless"}}]))],
    );

    let error = service
        .drawn_history(UserId::new(42))
        .await
        .expect_err("entry without id");

    assert!(matches!(error, ServiceError::Mapping(_)));
}

#[tokio::test]
async fn recharge_uses_the_session_user() {
    let (service, transport) = service(logged_in(), [ok(Value::Null)]);
    let recharge = RechargeRequest::new(25.0).expect("amount");

    service.recharge(&recharge).await.expect("recharge");

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.path, "/users/recharge");
    assert_eq!(json_body(&transport, 0), json!({"userId": 42, "amount": 25.0}));
}

#[tokio::test]
async fn rejected_envelopes_surface_the_server_message() {
    let (service, _) = service(
        logged_in(),
        [Ok(json!({"success": false, "message": "insufficient balance"}))],
    );

    let error = service.buy(BoxId::new(3)).await.expect_err("rejected");

    assert_eq!(error.to_string(), "insufficient balance");
}

#[tokio::test]
async fn password_changes_send_both_passwords() {
    let (service, transport) = service(logged_in(), [ok(Value::Null)]);
    let change = PasswordChange::try_from_parts("oldsecret", "newsecret").expect("change");

    service
        .change_password(UserId::new(42), &change)
        .await
        .expect("password change");

    assert_eq!(
        json_body(&transport, 0),
        json!({"id": 42, "oldPassword": "oldsecret", "newPassword": "newsecret"})
    );
}

#[tokio::test]
async fn avatar_uploads_are_multipart() {
    let (service, transport) = service(logged_in(), [ok(Value::Null)]);

    service
        .upload_avatar(UserId::new(42), "me.png", Some("image/png"), vec![1, 2, 3])
        .await
        .expect("upload");

    let request = &transport.requests()[0];
    assert_eq!(request.path, "/users/42/avatar");
    let Some(RequestBody::Multipart(fields)) = &request.body else {
        panic!("expected a multipart body");
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "file");
    assert_eq!(
        fields[0].value,
        MultipartValue::File {
            file_name: "me.png".to_owned(),
            content_type: Some("image/png".to_owned()),
            bytes: vec![1, 2, 3],
        }
    );
}

#[tokio::test]
async fn avatar_url_updates_return_the_account() {
    let (service, transport) = service(
        logged_in(),
        [ok(json!({"id": 42, "username": "alice", "avatar": "https://cdn/a.png"}))],
    );

    let account = service
        .update_avatar_url(UserId::new(42), "https://cdn/a.png")
        .await
        .expect("avatar")
        .expect("account");

    assert_eq!(account.avatar(), Some("https://cdn/a.png"));
    assert_eq!(json_body(&transport, 0), json!({"avatarUrl": "https://cdn/a.png"}));
}
