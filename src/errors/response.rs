use super::{Details, PySmeError};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Code used by [`map_to_response`] for failures outside the taxonomy.
pub const GENERIC_ERROR_CODE: &str = "PSME:GEN:000";

/// Code used by [`convert_generic`] for failures outside the taxonomy.
pub const UNKNOWN_ERROR_CODE: &str = "PSME:GEN:ERR";

/// Message that replaces the text of non-safe errors at a public boundary.
pub const GENERIC_PUBLIC_MESSAGE: &str = "Internal server error";

/// Serialized form of a [`PySmeError`], as handed to an HTTP layer or a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
    pub status_code: u16,
    pub details: Details,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<Vec<String>>,
}

impl PySmeError {
    /// Serialize the error. The message is always included as-is; redaction
    /// of non-safe errors is [`PySmeError::to_public_body`]'s job.
    pub fn to_body(&self, include_trace: bool) -> ErrorBody {
        let (cause_type, traceback) = match (&self.cause, include_trace) {
            (Some(cause), true) => (Some(cause.type_name().to_string()), Some(cause.trace())),
            _ => (None, None),
        };

        ErrorBody {
            code: self.code.to_string(),
            message: self.message.clone(),
            hint: self.hint.clone(),
            status_code: self.status.as_u16(),
            details: self.details.clone(),
            cause_type,
            traceback,
        }
    }

    /// Body fit for end users: non-safe errors lose their message, hint and
    /// details. The original stays available through [`PySmeError::to_body`].
    pub fn to_public_body(&self) -> ErrorBody {
        let mut body = self.to_body(false);
        if !self.safe {
            body.message = GENERIC_PUBLIC_MESSAGE.to_string();
            body.hint = None;
            body.details = Details::new();
        }
        body
    }

    pub fn to_json(&self, include_trace: bool) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_body(include_trace))
    }

    pub fn to_response(&self, include_trace: bool) -> (StatusCode, ErrorBody) {
        (self.status, self.to_body(include_trace))
    }
}

/// Map any failure to an HTTP status and JSON body.
///
/// Taxonomy errors serialize through [`PySmeError::to_body`]. Anything else
/// becomes a 500 with a generic body.
pub fn map_to_response(error: &anyhow::Error, include_trace: bool) -> (StatusCode, Value) {
    if let Some(err) = error.downcast_ref::<PySmeError>() {
        let (status, body) = err.to_response(include_trace);
        return (status, body_to_value(&body));
    }

    let mut body = json!({
        "code": GENERIC_ERROR_CODE,
        "message": GENERIC_PUBLIC_MESSAGE,
        "type": foreign_type_name(error),
    });
    if include_trace {
        body["traceback"] = Value::String(foreign_trace(error).join("\n"));
    }
    (StatusCode::INTERNAL_SERVER_ERROR, body)
}

/// Normalize any failure into the taxonomy's serialized shape.
///
/// Failures outside the taxonomy are tagged [`UNKNOWN_ERROR_CODE`], keep
/// their own message, and carry their type name and `safe: false`.
pub fn convert_generic(error: &anyhow::Error, include_trace: bool) -> Value {
    if let Some(err) = error.downcast_ref::<PySmeError>() {
        return body_to_value(&err.to_body(include_trace));
    }

    let mut body = json!({
        "code": UNKNOWN_ERROR_CODE,
        "message": error.to_string(),
        "hint": Value::Null,
        "status_code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        "details": {},
        "type": foreign_type_name(error),
        "safe": false,
    });
    if include_trace {
        body["traceback"] = json!(foreign_trace(error));
    }
    body
}

fn body_to_value(body: &ErrorBody) -> Value {
    // ErrorBody holds only strings, integers and JSON maps.
    serde_json::to_value(body).unwrap_or_else(|err| {
        tracing::error!("Failed to serialize error body: {}", err);
        json!({ "code": body.code, "message": body.message })
    })
}

fn foreign_type_name(error: &anyhow::Error) -> String {
    super::anyhow_type_name(error).to_string()
}

fn foreign_trace(error: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("{}: {}", foreign_type_name(error), error)];
    lines.extend(error.chain().skip(1).map(|err| format!("Caused by: {err}")));
    let backtrace = error.backtrace();
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        lines.extend(backtrace.to_string().lines().map(str::to_string));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Cause, ErrorKind};

    fn io_cause() -> Cause {
        Cause::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "bad bytes",
        ))
    }

    #[test]
    fn test_to_body_fields() {
        let err = PySmeError::new(ErrorKind::Parser)
            .with_message("Unexpected token")
            .with_detail("line", 3);
        let body = err.to_body(false);

        assert_eq!(body.code, "PSME:PAR:001");
        assert_eq!(body.message, "Unexpected token");
        assert_eq!(body.hint, None);
        assert_eq!(body.status_code, 400);
        assert_eq!(body.details["line"], 3);
        assert!(body.cause_type.is_none());
        assert!(body.traceback.is_none());
    }

    #[test]
    fn test_non_safe_message_is_still_serialized() {
        let err = PySmeError::new(ErrorKind::Database).with_message("connection refused");
        assert_eq!(err.to_body(false).message, "connection refused");
    }

    #[test]
    fn test_trace_only_with_cause_and_flag() {
        let err = PySmeError::new(ErrorKind::Runtime).with_cause(io_cause());

        let without = err.to_body(false);
        assert!(without.cause_type.is_none());

        let with = err.to_body(true);
        assert_eq!(with.cause_type.as_deref(), Some("Error"));
        let trace = with.traceback.unwrap();
        assert_eq!(trace[0], "Error: bad bytes");

        let no_cause = PySmeError::new(ErrorKind::Runtime).to_body(true);
        assert!(no_cause.traceback.is_none());
    }

    #[test]
    fn test_to_json_omits_absent_trace_keys() {
        let err = PySmeError::new(ErrorKind::NotFound);
        let json: Value = serde_json::from_str(&err.to_json(true).unwrap()).unwrap();

        assert_eq!(json["code"], "PSME:API:404");
        assert_eq!(json["status_code"], 404);
        assert_eq!(json["details"], json!({}));
        assert!(json.get("cause_type").is_none());
        assert!(json.get("traceback").is_none());
    }

    #[test]
    fn test_public_body_redacts_unsafe_errors() {
        let unsafe_err = PySmeError::new(ErrorKind::Database)
            .with_message("password authentication failed for user admin")
            .with_detail("dsn", "postgres://admin@db");
        let body = unsafe_err.to_public_body();
        assert_eq!(body.message, GENERIC_PUBLIC_MESSAGE);
        assert!(body.details.is_empty());
        assert_eq!(body.code, "PSME:DB:001");

        let safe_err = PySmeError::new(ErrorKind::ConfigValidation).with_message("bad level");
        let body = safe_err.to_public_body();
        assert_eq!(body.message, "bad level");
        assert_eq!(body.hint.as_deref(), Some("Fix the invalid configuration fields"));
    }

    #[test]
    fn test_map_taxonomy_error() {
        let err = anyhow::Error::new(PySmeError::new(ErrorKind::Auth));
        let (status, body) = map_to_response(&err, false);

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "PSME:API:401");
        assert_eq!(body["message"], "Authentication / Authorization error");
    }

    #[test]
    fn test_map_foreign_error_is_generic_500() {
        let err = anyhow::Error::new(std::io::Error::other("disk on fire"));
        let (status, body) = map_to_response(&err, true);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], GENERIC_ERROR_CODE);
        assert_eq!(body["message"], GENERIC_PUBLIC_MESSAGE);
        assert_eq!(body["type"], "Error");
        assert!(body["traceback"].as_str().unwrap().contains("disk on fire"));
    }

    #[test]
    fn test_convert_generic_foreign_error() {
        let err = anyhow::anyhow!("socket closed");
        let body = convert_generic(&err, false);

        assert_eq!(body["code"], UNKNOWN_ERROR_CODE);
        assert_eq!(body["message"], "socket closed");
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["safe"], false);
        assert!(body.get("traceback").is_none());

        let traced = convert_generic(&err, true);
        assert_eq!(traced["traceback"][0], "Error: socket closed");
    }

    #[test]
    fn test_convert_generic_delegates_for_taxonomy() {
        let err = anyhow::Error::new(PySmeError::new(ErrorKind::Validation).with_message("empty"));
        let body = convert_generic(&err, false);
        assert_eq!(body["code"], "PSME:VAL:001");
        assert_eq!(body["message"], "empty");
    }
}
