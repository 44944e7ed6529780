//! # error
//!
//! Centralised client error type.
//!
//! Every library operation returns `Result<_, AdminError>`.  The CLI turns
//! these into a single notification line via [`AdminError::user_message`], so
//! the operator always sees the same short message for a given failure kind
//! and never the raw backend body.

use thiserror::Error;

/// Generic notification shown for anything that is not a validation or auth
/// problem.
pub const GENERIC_FAILURE: &str = "Something Went Wrong";

/// Why a schedule draft cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Dex-Trade only accepts lots of 10 and above.
    #[error("Lot size must be 10 or greater when Dex-Trade is selected.")]
    DexTradeLotSize,

    /// Something required is empty, zero, or unparseable.
    #[error("Please fill all the required fields.")]
    MissingRequiredFields,

    /// A form selector went past its allowed range (e.g. 13 interval hours).
    #[error("{field} must be between 0 and {max}.")]
    FieldOutOfRange { field: &'static str, max: u64 },
}

#[derive(Debug, Error)]
pub enum AdminError {
    /// The draft failed client-side validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Any failed HTTP call: unreachable host, bad status, undecodable body.
    #[error("Network error: {0}")]
    Network(String),

    /// Missing token, or the API answered 401/403.
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// The cached schedule is in a state that forbids the action.
    #[error("Action not allowed: {0}")]
    NotAllowed(String),

    /// Another create/edit submission has not finished yet.
    #[error("A submission is already in flight")]
    Busy,

    /// Push channel connect or framing failure.
    #[error("Push channel error: {0}")]
    Push(String),

    /// Token store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Network(err.to_string())
    }
}

impl AdminError {
    /// The one line the operator gets to see.
    pub fn user_message(&self) -> String {
        match self {
            AdminError::Validation(err) => err.to_string(),
            AdminError::Auth(_) => "Please log in first (run `scheduler-admin login`).".into(),
            AdminError::NotAllowed(msg) => msg.clone(),
            AdminError::Busy => "Please wait for the previous submission to finish.".into(),
            _ => GENERIC_FAILURE.into(),
        }
    }

    /// `true` when the operator should be sent back to the login step.
    pub fn is_auth(&self) -> bool {
        matches!(self, AdminError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_shown_verbatim() {
        let err = AdminError::from(ValidationError::DexTradeLotSize);
        assert_eq!(
            err.user_message(),
            "Lot size must be 10 or greater when Dex-Trade is selected."
        );
    }

    #[test]
    fn backend_detail_is_hidden() {
        let err = AdminError::Network("HTTP 500: mongo exploded".into());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert!(!err.is_auth());
    }
}
