use serde::Serialize;
use serde_json::Value;

use super::transport::{TransportError, TransportResponse};

const OK_CODE: u64 = 200;
const GENERIC_FAILURE: &str = "Submission failed, please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        listing_id: Option<String>,
    },
    BusinessError {
        message: String,
    },
    TransportError {
        cause: String,
    },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text safe to show the lister: backend messages verbatim, transport causes hidden.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Success { .. } => "Listing submitted.",
            Self::BusinessError { message } => message,
            Self::TransportError { .. } => GENERIC_FAILURE,
        }
    }

    /// Unrecognized bodies on a non-2xx reply keep the HTTP status in their cause.
    pub(crate) fn from_transport(result: Result<TransportResponse, TransportError>) -> Self {
        match result {
            Ok(response) => match interpret(&response.body) {
                Self::TransportError { cause } if !(200..300).contains(&response.http_status) => {
                    Self::TransportError {
                        cause: format!("HTTP {}: {cause}", response.http_status),
                    }
                }
                outcome => outcome,
            },
            Err(err) => Self::TransportError {
                cause: err.to_string(),
            },
        }
    }
}

/// Maps a backend reply body onto an outcome.
///
/// Either `code` or `status` equal to 200 means success. A reply carrying a
/// status indicator or a message otherwise is a business rejection; any other
/// shape is treated as a transport failure.
pub fn interpret(body: &Value) -> SubmissionOutcome {
    let Some(fields) = body.as_object() else {
        return SubmissionOutcome::TransportError {
            cause: format!("unexpected response body: {body}"),
        };
    };

    let code = fields.get("code");
    let status = fields.get("status");
    if code.is_some_and(is_ok_code) || status.is_some_and(is_ok_code) {
        return SubmissionOutcome::Success {
            listing_id: listing_id(body),
        };
    }

    let message = ["message", "error"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty());

    match (message, code.or(status)) {
        (Some(message), _) => SubmissionOutcome::BusinessError {
            message: message.to_string(),
        },
        (None, Some(indicator)) => SubmissionOutcome::BusinessError {
            message: format!("The listing was rejected (status {}).", display(indicator)),
        },
        (None, None) => SubmissionOutcome::TransportError {
            cause: format!("unrecognized response body: {body}"),
        },
    }
}

fn is_ok_code(value: &Value) -> bool {
    match value {
        Value::Number(number) => {
            number.as_u64() == Some(OK_CODE) || number.as_f64() == Some(OK_CODE as f64)
        }
        Value::String(raw) => raw.trim() == OK_CODE.to_string(),
        _ => false,
    }
}

fn listing_id(body: &Value) -> Option<String> {
    ["/id", "/data/id", "/data/_id"]
        .iter()
        .find_map(|pointer| body.pointer(pointer))
        .and_then(|id| match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}
