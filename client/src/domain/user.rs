//! Storefront user accounts.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::timestamp;

/// Validation errors raised while building user values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The id was not a base-10 integer.
    InvalidId,
    /// Balance was negative or not a finite number.
    InvalidBalance,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId => write!(f, "user id must be an integer"),
            Self::InvalidBalance => write!(f, "balance must be a finite, non-negative amount"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Backend-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = UserValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }
}

/// Account role.
///
/// The wire value is case-insensitive and may carry a Spring-style `ROLE_`
/// prefix; comparison happens on the upper-cased, prefix-free form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Ordinary,
    /// Catalog and user administrator.
    Administrator,
}

impl Role {
    /// Normalise a wire role.
    pub fn from_wire(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let normalized = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match normalized {
            "ADMIN" => Self::Administrator,
            "USER" | "" => Self::Ordinary,
            other => {
                warn!(role = other, "unknown role, treating as ordinary user");
                Self::Ordinary
            }
        }
    }

    /// Canonical upper-case wire value.
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Ordinary => "USER",
            Self::Administrator => "ADMIN",
        }
    }

    /// Whether the role grants admin operations.
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Administrator)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::from_wire(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_wire().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// User account as listed by the admin console or returned by `/users/me`.
///
/// ## Invariants
/// - `balance` is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UserAccountDto", into = "UserAccountDto")]
pub struct UserAccount {
    id: UserId,
    username: String,
    nickname: Option<String>,
    avatar: Option<String>,
    balance: f64,
    email: Option<String>,
    phone: Option<String>,
    role: Role,
    created_at: Option<NaiveDateTime>,
}

impl UserAccount {
    /// Build an account with only the identifying fields populated.
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            nickname: None,
            avatar: None,
            balance: 0.0,
            email: None,
            phone: None,
            role,
            created_at: None,
        }
    }

    /// Set the balance, rejecting negative or non-finite amounts.
    pub fn with_balance(mut self, balance: f64) -> Result<Self, UserValidationError> {
        if !balance.is_finite() || balance < 0.0 {
            return Err(UserValidationError::InvalidBalance);
        }
        self.balance = balance;
        Ok(self)
    }

    /// Backend identifier.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Login name.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Optional display nickname.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Avatar image reference.
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Wallet balance.
    pub const fn balance(&self) -> f64 {
        self.balance
    }

    /// Contact e-mail.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Contact phone number.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Account role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Registration time, when the server reported one.
    pub const fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserAccountDto {
    id: UserId,
    #[serde(default)]
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(default)]
    balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    created_at: Option<NaiveDateTime>,
}

impl TryFrom<UserAccountDto> for UserAccount {
    type Error = UserValidationError;

    fn try_from(dto: UserAccountDto) -> Result<Self, Self::Error> {
        let UserAccountDto {
            id,
            username,
            nickname,
            avatar,
            balance,
            email,
            phone,
            role,
            created_at,
        } = dto;
        let account = Self {
            id,
            username,
            nickname,
            avatar,
            balance: 0.0,
            email,
            phone,
            role: role.unwrap_or_default(),
            created_at,
        };
        account.with_balance(balance.unwrap_or(0.0))
    }
}

impl From<UserAccount> for UserAccountDto {
    fn from(value: UserAccount) -> Self {
        Self {
            id: value.id,
            username: value.username,
            nickname: value.nickname,
            avatar: value.avatar,
            balance: Some(value.balance),
            email: value.email,
            phone: value.phone,
            role: Some(value.role),
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("ADMIN", Role::Administrator)]
    #[case("admin", Role::Administrator)]
    #[case(" Admin ", Role::Administrator)]
    #[case("ROLE_ADMIN", Role::Administrator)]
    #[case("user", Role::Ordinary)]
    #[case("", Role::Ordinary)]
    #[case("auditor", Role::Ordinary)]
    fn roles_normalise_case_insensitively(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(Role::from_wire(raw), expected);
    }

    #[test]
    fn user_ids_parse_from_session_strings() {
        assert_eq!("42".parse::<UserId>(), Ok(UserId::new(42)));
        assert_eq!(" 7 ".parse::<UserId>(), Ok(UserId::new(7)));
        assert_eq!("".parse::<UserId>(), Err(UserValidationError::InvalidId));
    }

    #[test]
    fn decodes_backend_user_payload() {
        let account: UserAccount = serde_json::from_value(json!({
            "id": 3,
            "username": "alice",
            "nickname": "Al",
            "phone": "13800000000",
            "email": "alice@example.com",
            "avatar": null,
            "balance": 12.5,
            "role": "admin",
            "createdAt": "2024-05-01T12:30:00"
        }))
        .expect("payload should decode");

        assert_eq!(account.id(), UserId::new(3));
        assert_eq!(account.username(), "alice");
        assert_eq!(account.nickname(), Some("Al"));
        assert!(account.avatar().is_none());
        assert_eq!(account.balance(), 12.5);
        assert!(account.role().is_admin());
        assert!(account.created_at().is_some());
    }

    #[rstest]
    #[case(json!(-1.0))]
    #[case(json!(-0.01))]
    fn rejects_negative_balances(#[case] balance: serde_json::Value) {
        let result = serde_json::from_value::<UserAccount>(json!({
            "id": 1,
            "username": "bob",
            "balance": balance,
            "role": "USER"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn serialises_role_in_canonical_form() {
        let account = UserAccount::new(UserId::new(9), "carol", Role::from_wire("role_admin"));
        let value = serde_json::to_value(&account).expect("serialise account");
        assert_eq!(value["role"], "ADMIN");
        assert_eq!(value["id"], 9);
    }
}
