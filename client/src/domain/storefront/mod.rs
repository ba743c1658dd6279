//! Shopper-facing operations: search, purchase, favourites, comments, draw
//! history and account maintenance.
//!
//! Every operation is one enveloped HTTP call. Operations that act on the
//! current user require a bearer token and fail with
//! [`ServiceError::NotLoggedIn`] before any request otherwise.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;
use url::form_urlencoded;

use super::auth::PasswordChange;
use super::catalog::{BoxId, CatalogEntry, WireEntity, to_client};
use super::error::{ServiceError, ServiceResult};
use super::ports::{ApiRequest, ApiTransport, HttpMethod, MultipartField, SessionStore};
use super::response::{ResponseSchema, parse_list, parse_payload, parse_typed};
use super::session::Session;
use super::user::{UserAccount, UserId};

mod forms;
mod records;

pub use forms::{
    COMMENT_MAX_CHARS, CommentDraft, CommentValidationError, RechargeRequest,
    RechargeValidationError,
};
pub use records::{Comment, DrawnRecord, PrizeItem, PurchaseResult};

use records::DrawnRecordDto;

/// Timeout applied to form submissions.
pub const FORM_TIMEOUT: Duration = Duration::from_secs(5);

const CATALOG_PATH: &str = "/blind-boxes";
const SCHEMA: ResponseSchema = ResponseSchema::Enveloped;

/// Storefront operations over the API transport.
#[derive(Clone)]
pub struct StorefrontService {
    transport: Arc<dyn ApiTransport>,
    session: Arc<dyn SessionStore>,
}

impl StorefrontService {
    /// Create a service from its ports.
    pub fn new(transport: Arc<dyn ApiTransport>, session: Arc<dyn SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Published entries matching `keyword`.
    ///
    /// # Errors
    ///
    /// Transport, envelope or mapping failures.
    pub async fn search(&self, keyword: &str) -> ServiceResult<Vec<CatalogEntry>> {
        let encoded: String = form_urlencoded::byte_serialize(keyword.trim().as_bytes()).collect();
        let path = format!("{CATALOG_PATH}/search?keyword={encoded}");
        self.entries(path).await
    }

    /// Buy one draw from `box_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures such as an insufficient balance.
    pub async fn buy(&self, box_id: BoxId) -> ServiceResult<PurchaseResult> {
        self.require_login()?;
        let request = ApiRequest::new(HttpMethod::Post, format!("{CATALOG_PATH}/{box_id}/buy"));
        let body = self.transport.request(request).await?;
        let result: PurchaseResult = parse_typed(SCHEMA, body)?;
        info!(%box_id, is_new = result.is_new, "draw purchased");
        Ok(result)
    }

    /// Add `box_id` to the user's favourites.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn favorite(&self, box_id: BoxId) -> ServiceResult<()> {
        self.require_login()?;
        let request = ApiRequest::new(HttpMethod::Post, favorite_path(box_id));
        self.acknowledge(request).await
    }

    /// Remove `box_id` from the user's favourites.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn unfavorite(&self, box_id: BoxId) -> ServiceResult<()> {
        self.require_login()?;
        self.acknowledge(ApiRequest::delete(favorite_path(box_id)))
            .await
    }

    /// Whether `box_id` is among the user's favourites.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn is_favorited(&self, box_id: BoxId) -> ServiceResult<bool> {
        self.require_login()?;
        let body = self
            .transport
            .request(ApiRequest::get(favorite_path(box_id)))
            .await?;
        let flag: Option<bool> = parse_typed(SCHEMA, body)?;
        Ok(flag.unwrap_or(false))
    }

    /// The user's favourite entries.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport,
    /// envelope or mapping failures.
    pub async fn favorites(&self) -> ServiceResult<Vec<CatalogEntry>> {
        self.require_login()?;
        self.entries(format!("{CATALOG_PATH}/favorites")).await
    }

    /// Comments on `box_id`, oldest first as the server orders them.
    ///
    /// # Errors
    ///
    /// Transport or envelope failures.
    pub async fn comments(&self, box_id: BoxId) -> ServiceResult<Vec<Comment>> {
        let body = self
            .transport
            .request(ApiRequest::get(format!("/comments/box/{box_id}")))
            .await?;
        let comments: Option<Vec<Comment>> = parse_typed(SCHEMA, body)?;
        Ok(comments.unwrap_or_default())
    }

    /// Post `draft` and return the stored comment.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn post_comment(&self, draft: &CommentDraft) -> ServiceResult<Comment> {
        self.require_login()?;
        let request = ApiRequest::post(
            "/comments",
            json!({ "boxId": draft.box_id(), "content": draft.content() }),
        )
        .with_timeout(FORM_TIMEOUT);
        let body = self.transport.request(request).await?;
        Ok(parse_typed(SCHEMA, body)?)
    }

    /// Draws made by `user_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport,
    /// envelope or mapping failures.
    pub async fn drawn_history(&self, user_id: UserId) -> ServiceResult<Vec<DrawnRecord>> {
        self.require_login()?;
        let body = self
            .transport
            .request(ApiRequest::get(format!("/drawn/user/{user_id}")))
            .await?;
        let records: Option<Vec<DrawnRecordDto>> = parse_typed(SCHEMA, body)?;
        records
            .unwrap_or_default()
            .into_iter()
            .map(|record| DrawnRecord::try_from(record).map_err(ServiceError::from))
            .collect()
    }

    /// Top up the logged-in user's wallet.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token or stored user id,
    /// otherwise transport and envelope failures.
    pub async fn recharge(&self, recharge: &RechargeRequest) -> ServiceResult<()> {
        let user_id = self.require_user()?;
        let request = ApiRequest::put(
            "/users/recharge",
            json!({ "userId": user_id, "amount": recharge.amount() }),
        )
        .with_timeout(FORM_TIMEOUT);
        self.acknowledge(request).await?;
        info!(%user_id, "wallet recharged");
        Ok(())
    }

    /// Replace the password of `user_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures such as a wrong current password.
    pub async fn change_password(
        &self,
        user_id: UserId,
        change: &PasswordChange,
    ) -> ServiceResult<()> {
        self.require_login()?;
        let request = ApiRequest::put(
            "/users/password",
            json!({
                "id": user_id,
                "oldPassword": change.current(),
                "newPassword": change.replacement(),
            }),
        )
        .with_timeout(FORM_TIMEOUT);
        self.acknowledge(request).await
    }

    /// Point the avatar of `user_id` at `url`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn update_avatar_url(
        &self,
        user_id: UserId,
        url: &str,
    ) -> ServiceResult<Option<UserAccount>> {
        self.require_login()?;
        let request = ApiRequest::put(
            format!("/users/{user_id}/avatar/url"),
            json!({ "avatarUrl": url }),
        );
        let body = self.transport.request(request).await?;
        Ok(parse_typed(SCHEMA, body)?)
    }

    /// Upload a new avatar image for `user_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotLoggedIn`] without a token, otherwise transport and
    /// envelope failures.
    pub async fn upload_avatar(
        &self,
        user_id: UserId,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> ServiceResult<()> {
        self.require_login()?;
        let field = MultipartField::file("file", file_name, content_type.map(str::to_owned), bytes);
        let request = ApiRequest::new(HttpMethod::Put, format!("/users/{user_id}/avatar"))
            .with_multipart(vec![field])
            .with_timeout(FORM_TIMEOUT);
        self.acknowledge(request).await
    }

    fn require_login(&self) -> ServiceResult<Session> {
        let session = Session::read(self.session.as_ref());
        if session.token().is_none() {
            return Err(ServiceError::NotLoggedIn);
        }
        Ok(session)
    }

    fn require_user(&self) -> ServiceResult<UserId> {
        self.require_login()?
            .user_id()
            .ok_or(ServiceError::NotLoggedIn)
    }

    async fn acknowledge(&self, request: ApiRequest) -> ServiceResult<()> {
        let body = self.transport.request(request).await?;
        parse_payload(SCHEMA, body)?;
        Ok(())
    }

    async fn entries(&self, path: String) -> ServiceResult<Vec<CatalogEntry>> {
        let body = self.transport.request(ApiRequest::get(path)).await?;
        parse_list(SCHEMA, body)?
            .into_iter()
            .map(|value| -> ServiceResult<CatalogEntry> {
                Ok(to_client(WireEntity::from_value(value)?)?)
            })
            .collect()
    }
}

fn favorite_path(box_id: BoxId) -> String {
    format!("{CATALOG_PATH}/{box_id}/favorite")
}

#[cfg(test)]
mod tests;
