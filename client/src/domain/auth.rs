//! Authentication inputs: login credentials, registrations and password
//! changes.
//!
//! Constructors validate raw form input so nothing malformed reaches the
//! network. Secrets are held in [`Zeroizing`] buffers.

use std::fmt;

use zeroize::Zeroizing;

/// Minimum username length accepted at registration.
pub const USERNAME_MIN: usize = 3;
/// Maximum username length accepted at registration.
pub const USERNAME_MAX: usize = 20;
/// Minimum password length accepted at registration and password change.
pub const PASSWORD_MIN: usize = 6;
/// Number of digits in a mobile phone number.
pub const PHONE_DIGITS: usize = 11;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace.
///
/// # Examples
/// ```
/// use storefront_client::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("admin", "password").unwrap();
/// assert_eq!(creds.username(), "admin");
/// assert_eq!(creds.password(), "password");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username sent to the login endpoint.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationValidationError {
    /// Username length outside the accepted range.
    UsernameLength {
        /// Shortest accepted username.
        min: usize,
        /// Longest accepted username.
        max: usize,
    },
    /// E-mail lacks a local part or a dotted domain.
    InvalidEmail,
    /// Phone number is not exactly [`PHONE_DIGITS`] digits.
    InvalidPhone,
    /// Password shorter than [`PASSWORD_MIN`].
    PasswordTooShort {
        /// Shortest accepted password.
        min: usize,
    },
    /// Confirmation does not match the password.
    PasswordMismatch,
}

impl fmt::Display for RegistrationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernameLength { min, max } => {
                write!(f, "username must be between {min} and {max} characters")
            }
            Self::InvalidEmail => write!(f, "e-mail address is not valid"),
            Self::InvalidPhone => write!(f, "phone number must be {PHONE_DIGITS} digits"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::PasswordMismatch => write!(f, "passwords do not match"),
        }
    }
}

impl std::error::Error for RegistrationValidationError {}

/// Validated registration form.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    username: String,
    email: String,
    phone: String,
    password: Zeroizing<String>,
}

impl Registration {
    /// Validate raw registration input.
    pub fn try_from_parts(
        username: &str,
        email: &str,
        phone: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Self, RegistrationValidationError> {
        let username = username.trim();
        let length = username.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
            return Err(RegistrationValidationError::UsernameLength {
                min: USERNAME_MIN,
                max: USERNAME_MAX,
            });
        }

        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(RegistrationValidationError::InvalidEmail);
        }

        let phone = phone.trim();
        if phone.len() != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistrationValidationError::InvalidPhone);
        }

        check_password_length(password)
            .map_err(|min| RegistrationValidationError::PasswordTooShort { min })?;
        if password != confirmation {
            return Err(RegistrationValidationError::PasswordMismatch);
        }

        Ok(Self {
            username: username.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Requested username.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Contact e-mail.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Contact phone.
    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    /// Chosen password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Password change failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordChangeValidationError {
    /// Current password was blank.
    EmptyCurrentPassword,
    /// New password shorter than [`PASSWORD_MIN`].
    NewPasswordTooShort {
        /// Shortest accepted password.
        min: usize,
    },
    /// New password equals the current one.
    Unchanged,
}

impl fmt::Display for PasswordChangeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCurrentPassword => write!(f, "current password must not be empty"),
            Self::NewPasswordTooShort { min } => {
                write!(f, "new password must be at least {min} characters")
            }
            Self::Unchanged => write!(f, "new password must differ from the current password"),
        }
    }
}

impl std::error::Error for PasswordChangeValidationError {}

/// Validated password change.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordChange {
    current: Zeroizing<String>,
    replacement: Zeroizing<String>,
}

impl PasswordChange {
    /// Validate a current/new password pair.
    pub fn try_from_parts(
        current: &str,
        replacement: &str,
    ) -> Result<Self, PasswordChangeValidationError> {
        if current.is_empty() {
            return Err(PasswordChangeValidationError::EmptyCurrentPassword);
        }
        check_password_length(replacement)
            .map_err(|min| PasswordChangeValidationError::NewPasswordTooShort { min })?;
        if current == replacement {
            return Err(PasswordChangeValidationError::Unchanged);
        }
        Ok(Self {
            current: Zeroizing::new(current.to_owned()),
            replacement: Zeroizing::new(replacement.to_owned()),
        })
    }

    /// Password currently in use.
    pub fn current(&self) -> &str {
        self.current.as_str()
    }

    /// Password to switch to.
    pub fn replacement(&self) -> &str {
        self.replacement.as_str()
    }
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordChange(<redacted>)")
    }
}

fn check_password_length(password: &str) -> Result<(), usize> {
    if password.chars().count() < PASSWORD_MIN {
        Err(PASSWORD_MIN)
    } else {
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut labels = domain.split('.');
    let has_dot = domain.contains('.');
    has_dot && labels.all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", LoginValidationError::EmptyUsername)]
    #[case("   ", "pw", LoginValidationError::EmptyUsername)]
    #[case("user", "", LoginValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] username: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(username, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("  admin  ", "secret")]
    #[case("alice", " spaced password ")]
    fn valid_credentials_trim_username(#[case] username: &str, #[case] password: &str) {
        let creds = LoginCredentials::try_from_parts(username, password)
            .expect("valid inputs should succeed");
        assert_eq!(creds.username(), username.trim());
        assert_eq!(creds.password(), password);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = LoginCredentials::try_from_parts("admin", "hunter22").expect("credentials");
        assert!(!format!("{creds:?}").contains("hunter22"));
    }

    #[rstest]
    #[case("ab", "a@b.co", "13800000000", "secret1", "secret1",
        RegistrationValidationError::UsernameLength { min: USERNAME_MIN, max: USERNAME_MAX })]
    #[case("abcdefghijklmnopqrstu", "a@b.co", "13800000000", "secret1", "secret1",
        RegistrationValidationError::UsernameLength { min: USERNAME_MIN, max: USERNAME_MAX })]
    #[case("alice", "alice.example.com", "13800000000", "secret1", "secret1",
        RegistrationValidationError::InvalidEmail)]
    #[case("alice", "alice@localhost", "13800000000", "secret1", "secret1",
        RegistrationValidationError::InvalidEmail)]
    #[case("alice", "alice@example..com", "13800000000", "secret1", "secret1",
        RegistrationValidationError::InvalidEmail)]
    #[case("alice", "alice@example.com", "1380000000", "secret1", "secret1",
        RegistrationValidationError::InvalidPhone)]
    #[case("alice", "alice@example.com", "1380000000x", "secret1", "secret1",
        RegistrationValidationError::InvalidPhone)]
    #[case("alice", "alice@example.com", "13800000000", "short", "short",
        RegistrationValidationError::PasswordTooShort { min: PASSWORD_MIN })]
    #[case("alice", "alice@example.com", "13800000000", "secret1", "secret2",
        RegistrationValidationError::PasswordMismatch)]
    fn invalid_registrations(
        #[case] username: &str,
        #[case] email: &str,
        #[case] phone: &str,
        #[case] password: &str,
        #[case] confirmation: &str,
        #[case] expected: RegistrationValidationError,
    ) {
        let err = Registration::try_from_parts(username, email, phone, password, confirmation)
            .expect_err("invalid registration must fail");
        assert_eq!(err, expected);
    }

    #[test]
    fn valid_registration_trims_text_fields() {
        let registration = Registration::try_from_parts(
            " alice ",
            " alice@example.com ",
            "13800000000",
            "secret1",
            "secret1",
        )
        .expect("registration should validate");
        assert_eq!(registration.username(), "alice");
        assert_eq!(registration.email(), "alice@example.com");
        assert_eq!(registration.phone(), "13800000000");
        assert_eq!(registration.password(), "secret1");
    }

    #[rstest]
    #[case("", "newsecret", PasswordChangeValidationError::EmptyCurrentPassword)]
    #[case("oldsecret", "new", PasswordChangeValidationError::NewPasswordTooShort { min: PASSWORD_MIN })]
    #[case("samesecret", "samesecret", PasswordChangeValidationError::Unchanged)]
    fn invalid_password_changes(
        #[case] current: &str,
        #[case] replacement: &str,
        #[case] expected: PasswordChangeValidationError,
    ) {
        let err = PasswordChange::try_from_parts(current, replacement)
            .expect_err("invalid change must fail");
        assert_eq!(err, expected);
    }
}
