//! Problem reporting
//!
//! Failures that are normal business outcomes (missing identifiers, unknown
//! entities, rejected credentials, backend or transport failures) are
//! attached to the response as [`Problem`] entries instead of being returned
//! as errors. [`report`] is the single mapping from a cause to a problem.

use serde::{Deserialize, Serialize};

/// Failure raised by a backend gateway call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Backend error [{code}]: {message}")]
    Backend { code: String, message: String },
}

/// Canonical problem taxonomy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    MissingRequiredField,
    UnknownEntity,
    InvalidCredentials,
    ProcessingError,
}

/// A diagnostic attached to a response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    /// NCIP Version 1 problem type scheme value for this problem
    pub fn problem_type(&self) -> &'static str {
        match self.kind {
            ProblemKind::MissingRequiredField => "Needed Data Missing",
            ProblemKind::UnknownEntity => match self.element.as_deref() {
                Some(element::REQUEST_ID) | Some(element::ITEM_ID_AND_USER_ID) => "Unknown Request",
                Some(element::ITEM_ID) => "Unknown Item",
                _ => "Unknown User",
            },
            ProblemKind::InvalidCredentials => "User Authentication Failed",
            ProblemKind::ProcessingError => "Temporary Processing Failure",
        }
    }
}

/// Element names used in problem reports
pub mod element {
    pub const USER_ID: &str = "UserId";
    pub const PASSWORD: &str = "Password";
    pub const REQUEST_ID: &str = "RequestId";
    pub const ITEM_ID: &str = "ItemId";
    pub const ITEM_ID_AND_USER_ID: &str = "ItemId,UserId";
    pub const AUTHENTICATION_INPUT: &str = "AuthenticationInput";
}

/// Anything that can end up as a problem on a response
#[derive(Debug)]
pub enum ProblemCause<'a> {
    /// A mandatory identifier or credential is missing from the request
    MissingField {
        element: &'a str,
        description: &'a str,
    },
    /// The backend has no record for the identifier
    NotFound { element: &'a str, value: &'a str },
    /// The gateway call failed
    Gateway(&'a GatewayError),
}

/// Map a failure cause onto the canonical problem taxonomy
pub fn report(cause: &ProblemCause<'_>) -> Problem {
    match cause {
        ProblemCause::MissingField {
            element,
            description,
        } => Problem {
            kind: ProblemKind::MissingRequiredField,
            element: Some(element.to_string()),
            value: None,
            detail: Some(description.to_string()),
        },
        ProblemCause::NotFound { element, value } => Problem {
            kind: ProblemKind::UnknownEntity,
            element: Some(element.to_string()),
            value: Some(value.to_string()),
            detail: Some(format!("{element} {value} was not found")),
        },
        ProblemCause::Gateway(GatewayError::InvalidCredentials(message)) => Problem {
            kind: ProblemKind::InvalidCredentials,
            element: Some(element::AUTHENTICATION_INPUT.to_string()),
            value: None,
            detail: Some(message.clone()),
        },
        ProblemCause::Gateway(error) => Problem {
            kind: ProblemKind::ProcessingError,
            element: None,
            value: None,
            detail: Some(error.to_string()),
        },
    }
}

impl From<&GatewayError> for Problem {
    fn from(error: &GatewayError) -> Self {
        report(&ProblemCause::Gateway(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_missing_field() {
        let problem = report(&ProblemCause::MissingField {
            element: element::USER_ID,
            description: "Cannot lookup unknown user",
        });

        assert_eq!(problem.kind, ProblemKind::MissingRequiredField);
        assert_eq!(problem.element.as_deref(), Some("UserId"));
        assert_eq!(problem.value, None);
        assert_eq!(problem.problem_type(), "Needed Data Missing");
    }

    #[test]
    fn test_report_not_found_uses_element_for_problem_type() {
        let user = report(&ProblemCause::NotFound {
            element: element::USER_ID,
            value: "0001",
        });
        let request = report(&ProblemCause::NotFound {
            element: element::REQUEST_ID,
            value: "42",
        });

        assert_eq!(user.kind, ProblemKind::UnknownEntity);
        assert_eq!(user.value.as_deref(), Some("0001"));
        assert_eq!(user.problem_type(), "Unknown User");
        assert_eq!(request.problem_type(), "Unknown Request");
    }

    #[test]
    fn test_report_transport_preserves_message() {
        let error = GatewayError::Transport("connection refused".to_string());
        let problem = Problem::from(&error);

        assert_eq!(problem.kind, ProblemKind::ProcessingError);
        assert_eq!(
            problem.detail.as_deref(),
            Some("Transport error: connection refused")
        );
    }

    #[test]
    fn test_report_backend_error_preserves_code_and_message() {
        let error = GatewayError::Backend {
            code: "500".to_string(),
            message: "budget exceeded".to_string(),
        };
        let problem = Problem::from(&error);

        assert_eq!(problem.kind, ProblemKind::ProcessingError);
        assert_eq!(
            problem.detail.as_deref(),
            Some("Backend error [500]: budget exceeded")
        );
        assert_eq!(problem.problem_type(), "Temporary Processing Failure");
    }

    #[test]
    fn test_report_invalid_credentials() {
        let error = GatewayError::InvalidCredentials("Error in Verification".to_string());
        let problem = Problem::from(&error);

        assert_eq!(problem.kind, ProblemKind::InvalidCredentials);
        assert_eq!(problem.detail.as_deref(), Some("Error in Verification"));
        assert_eq!(problem.problem_type(), "User Authentication Failed");
    }
}
