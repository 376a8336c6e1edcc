//! Purpose: Decode response bodies into the `{data, message?}` envelope.
//! Exports: `Envelope`, `NON_JSON_MESSAGE`.
//! Role: The only place a response body is parsed; never fails on bad JSON.
//! Invariants: A body that is not JSON becomes the sentinel `{message: NON_JSON_MESSAGE}`.
//! Invariants: `message` is an opaque display string and is never parsed further.
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{Error, ErrorKind};

pub const NON_JSON_MESSAGE: &str = "<non-JSON response>";

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    body: Value,
    non_json: bool,
}

impl Envelope {
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(body) => Self {
                body,
                non_json: false,
            },
            Err(_) => Self::sentinel(),
        }
    }

    pub fn sentinel() -> Self {
        let mut body = Map::new();
        body.insert(
            "message".to_string(),
            Value::String(NON_JSON_MESSAGE.to_string()),
        );
        Self {
            body: Value::Object(body),
            non_json: true,
        }
    }

    pub fn is_non_json(&self) -> bool {
        self.non_json
    }

    /// The full decoded body (or the sentinel object), for diagnostics.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
    }

    /// `data`, with an explicit JSON `null` treated as absent.
    pub fn data(&self) -> Option<&Value> {
        self.body.get("data").filter(|data| !data.is_null())
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn into_data<T>(self) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        if self.non_json {
            return Err(Error::new(ErrorKind::NonJson)
                .with_message(NON_JSON_MESSAGE)
                .with_body(self.body));
        }
        let data = match self.body {
            Value::Object(mut fields) => fields.remove("data"),
            _ => None,
        };
        match data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => serde_json::from_value(data).map(Some).map_err(|err| {
                Error::new(ErrorKind::Decode)
                    .with_message("response data does not match the expected shape")
                    .with_source(err)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Envelope, NON_JSON_MESSAGE};
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    #[test]
    fn non_json_body_becomes_sentinel() {
        let envelope = Envelope::decode("<html>oops</html>");
        assert!(envelope.is_non_json());
        assert_eq!(envelope.message(), Some(NON_JSON_MESSAGE));
        assert!(envelope.data().is_none());
    }

    #[test]
    fn empty_body_becomes_sentinel() {
        let envelope = Envelope::decode("");
        assert!(envelope.is_non_json());
    }

    #[test]
    fn null_data_is_absent() {
        let envelope = Envelope::decode(r#"{"data":null,"message":"ok"}"#);
        assert!(envelope.data().is_none());
        assert_eq!(envelope.message(), Some("ok"));
        let data: Option<Value> = envelope.into_data().expect("decode");
        assert!(data.is_none());
    }

    #[test]
    fn non_object_body_has_no_data() {
        let envelope = Envelope::decode("[1,2,3]");
        assert!(!envelope.is_non_json());
        assert!(envelope.data().is_none());
        assert!(envelope.message().is_none());
    }

    #[test]
    fn into_data_rejects_sentinel() {
        let err = Envelope::sentinel()
            .into_data::<Value>()
            .expect_err("sentinel");
        assert_eq!(err.kind(), ErrorKind::NonJson);
    }

    #[test]
    fn into_data_reports_shape_mismatch() {
        let envelope = Envelope::decode(&json!({"data": "text"}).to_string());
        let err = envelope.into_data::<Vec<u64>>().expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
