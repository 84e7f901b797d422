//! The JSON response envelope.
//!
//! Every response rendered by the dispatcher is an [`Envelope`] serialized
//! as `{"code": .., "message": .., "data": ..}`. Handlers fill it through
//! [`RequestContext::envelope_mut`](crate::RequestContext::envelope_mut).

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    code: u16,
    message: String,
    data: Value,
}

impl Default for Envelope {
    fn default() -> Self {
        Self { code: StatusCode::OK.as_u16(), message: String::new(), data: Value::Null }
    }
}

impl Envelope {
    pub fn new(code: u16, message: impl Into<String>, data: Value) -> Self {
        Self { code, message: message.into(), data }
    }

    pub fn not_found() -> Self {
        let mut envelope = Self::default();
        envelope.set_not_found();
        envelope
    }

    pub fn forbidden() -> Self {
        let mut envelope = Self::default();
        envelope.set_forbidden();
        envelope
    }

    pub fn error() -> Self {
        let mut envelope = Self::default();
        envelope.set_error();
        envelope
    }

    pub fn rate_limited() -> Self {
        let mut envelope = Self::default();
        envelope.set_rate_limited();
        envelope
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Marks the response successful and carries `data` as its payload.
    ///
    /// Data that cannot be represented as JSON turns the envelope into an
    /// internal error instead.
    pub fn set_data<T: Serialize>(&mut self, data: T) {
        match serde_json::to_value(data) {
            Ok(value) => {
                self.code = StatusCode::OK.as_u16();
                self.message.clear();
                self.data = value;
            }
            Err(e) => {
                error!(target: "cosine::envelope", cause = %e, "response data is not serializable");
                self.set_error();
            }
        }
    }

    /// Sets an arbitrary failure code and message, clearing any data.
    pub fn set_exception(&mut self, code: u16, message: impl Into<String>) {
        self.code = code;
        self.message = message.into();
        self.data = Value::Null;
    }

    pub fn set_not_found(&mut self) {
        self.set_exception(StatusCode::NOT_FOUND.as_u16(), "API not found");
    }

    pub fn set_forbidden(&mut self) {
        self.set_exception(StatusCode::FORBIDDEN.as_u16(), "API access forbidden");
    }

    pub fn set_error(&mut self) {
        self.set_exception(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), "internal server error");
    }

    pub fn set_rate_limited(&mut self) {
        self.set_exception(StatusCode::SERVICE_UNAVAILABLE.as_u16(), "API rate limit exceeded");
    }

    /// The HTTP status the envelope is sent with: its own code when that is
    /// a standard status class (100 to 599), 200 otherwise.
    pub fn status(&self) -> StatusCode {
        if !(100..600).contains(&self.code) {
            return StatusCode::OK;
        }
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_is_success() {
        let envelope = Envelope::default();
        assert_eq!(envelope.code(), 200);
        assert_eq!(envelope.message(), "");
        assert_eq!(envelope.data(), &Value::Null);
        assert_eq!(envelope.status(), StatusCode::OK);
    }

    #[test]
    fn test_set_data() {
        let mut envelope = Envelope::not_found();
        envelope.set_data(vec![1, 2, 3]);
        assert_eq!(envelope, Envelope::new(200, "", json!([1, 2, 3])));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(Envelope::not_found(), Envelope::new(404, "API not found", Value::Null));
        assert_eq!(Envelope::forbidden(), Envelope::new(403, "API access forbidden", Value::Null));
        assert_eq!(Envelope::error(), Envelope::new(500, "internal server error", Value::Null));
        assert_eq!(Envelope::rate_limited(), Envelope::new(503, "API rate limit exceeded", Value::Null));
    }

    #[test]
    fn test_set_exception_clears_data() {
        let mut envelope = Envelope::default();
        envelope.set_data("payload");
        envelope.set_exception(422, "bad input");

        assert_eq!(envelope.code(), 422);
        assert_eq!(envelope.message(), "bad input");
        assert_eq!(envelope.data(), &Value::Null);
    }

    #[test]
    fn test_unserializable_data_is_error() {
        // JSON object keys must be strings
        let data = BTreeMap::from([((1, 2), "pair")]);
        let mut envelope = Envelope::default();
        envelope.set_data(data);
        assert_eq!(envelope, Envelope::error());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Envelope::new(201, "", Value::Null).status(), StatusCode::CREATED);
        assert_eq!(Envelope::new(42, "custom", Value::Null).status(), StatusCode::OK);
        assert_eq!(Envelope::new(1000, "custom", Value::Null).status(), StatusCode::OK);
        assert_eq!(Envelope::new(599, "", Value::Null).status().as_u16(), 599);
        assert_eq!(Envelope::new(600, "custom", Value::Null).status(), StatusCode::OK);
        assert_eq!(Envelope::new(700, "custom", Value::Null).status(), StatusCode::OK);
    }

    #[test]
    fn test_json_shape() {
        let mut envelope = Envelope::default();
        envelope.set_data(json!({"id": 7}));
        let value: Value = serde_json::from_slice(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"code": 200, "message": "", "data": {"id": 7}}));
    }
}
