//! Validated storefront form inputs.

use std::fmt;

use crate::domain::catalog::BoxId;

/// Longest accepted comment, in characters.
pub const COMMENT_MAX_CHARS: usize = 500;

/// Validation errors for a wallet top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RechargeValidationError {
    /// The amount is zero, negative or not a finite number.
    InvalidAmount,
}

impl fmt::Display for RechargeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount => write!(f, "recharge amount must be greater than zero"),
        }
    }
}

impl std::error::Error for RechargeValidationError {}

/// Wallet top-up with a positive amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RechargeRequest {
    amount: f64,
}

impl RechargeRequest {
    /// Validate `amount`.
    pub fn new(amount: f64) -> Result<Self, RechargeValidationError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RechargeValidationError::InvalidAmount);
        }
        Ok(Self { amount })
    }

    /// Amount to add to the balance.
    pub const fn amount(&self) -> f64 {
        self.amount
    }
}

/// Validation errors for a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentValidationError {
    /// Nothing but whitespace.
    Empty,
    /// Longer than the accepted maximum.
    TooLong {
        /// Maximum character count.
        max: usize,
    },
}

impl fmt::Display for CommentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "comment must not be empty"),
            Self::TooLong { max } => write!(f, "comment must be at most {max} characters"),
        }
    }
}

impl std::error::Error for CommentValidationError {}

/// Comment about one catalog entry, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    box_id: BoxId,
    content: String,
}

impl CommentDraft {
    /// Validate `content` for `box_id`.
    pub fn new(box_id: BoxId, content: &str) -> Result<Self, CommentValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CommentValidationError::Empty);
        }
        if content.chars().count() > COMMENT_MAX_CHARS {
            return Err(CommentValidationError::TooLong {
                max: COMMENT_MAX_CHARS,
            });
        }
        Ok(Self {
            box_id,
            content: content.to_owned(),
        })
    }

    /// Commented entry.
    pub const fn box_id(&self) -> BoxId {
        self.box_id
    }

    /// Trimmed text.
    pub fn content(&self) -> &str {
        &self.content
    }
}
