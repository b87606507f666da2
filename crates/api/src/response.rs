//! JSON envelope shared by every endpoint.

use axum::Json;
use serde::Serialize;

/// `{"status": "success"|"error", "message": ..., "data"?: ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A success envelope carrying a payload.
pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> Json<Envelope<T>> {
    Json(Envelope {
        status: "success",
        message: message.into(),
        data: Some(data),
    })
}

/// A success envelope with no payload.
pub fn success_message(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        status: "success",
        message: message.into(),
        data: None,
    })
}

/// An error envelope.
pub fn error(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        status: "error",
        message: message.into(),
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_includes_data() {
        let Json(body) = success(serde_json::json!({"token": "t"}), "Login successful");
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Login successful");
        assert_eq!(json["data"]["token"], "t");
    }

    #[test]
    fn error_omits_data() {
        let Json(body) = error("Insufficient stock");
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("data").is_none());
    }
}
