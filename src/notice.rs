//! Purpose: Define the structured schema for user-visible notifications.
//! Exports: `Notice`, `NoticeKind`, `notice_json`.
//! Role: Shared contract between the dispatcher, the session monitor and notifiers.
//! Invariants: Notices never alter the result returned to the caller.
//! Invariants: JSON schema is additive-only; existing fields keep their names.
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please re-login.";
pub const OPERATION_FAILED_MESSAGE: &str = "Operation failed, check server log.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    SessionExpired,
    OperationFailed,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::SessionExpired => "session_expired",
            NoticeKind::OperationFailed => "operation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub time: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            time: now_rfc3339(),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn session_expired() -> Self {
        Self::new(NoticeKind::SessionExpired, SESSION_EXPIRED_MESSAGE)
    }

    /// Failure notice carrying the server's body text, or the generic fallback.
    pub fn operation_failed(status: u16, body: Option<&str>) -> Self {
        let message = body.unwrap_or(OPERATION_FAILED_MESSAGE);
        let mut notice = Self::new(NoticeKind::OperationFailed, message);
        notice
            .details
            .insert("status".to_string(), Value::from(status));
        notice
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind.as_str()));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{Notice, NoticeKind, OPERATION_FAILED_MESSAGE, notice_json};
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let notice = Notice {
            kind: NoticeKind::SessionExpired,
            time: "2026-02-01T00:00:00Z".to_string(),
            message: "Your session has expired, please re-login.".to_string(),
            details: Map::new(),
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(
            obj.get("kind").and_then(|v| v.as_str()),
            Some("session_expired")
        );
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-01T00:00:00Z")
        );
        assert!(obj.get("details").and_then(|v| v.as_object()).is_some());
    }

    #[test]
    fn operation_failed_prefers_body_text() {
        let notice = Notice::operation_failed(500, Some("disk full"));
        assert_eq!(notice.message, "disk full");
        assert_eq!(notice.details.get("status"), Some(&Value::from(500)));
    }

    #[test]
    fn operation_failed_falls_back_to_generic_message() {
        let notice = Notice::operation_failed(502, None);
        assert_eq!(notice.message, OPERATION_FAILED_MESSAGE);
    }
}
