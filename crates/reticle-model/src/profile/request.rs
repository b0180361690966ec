use serde::Deserialize;

use crate::error::{ModelError, ModelResult};
use crate::profile::Metadata;

/// Message reported when the request carries no `text`.
pub const TEXT_REQUIRED: &str = "The field \"text\" is required";

/// Raw decoded request body.
///
/// Unknown fields are ignored; presence checks happen in [`ProfileRequest::validate`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ProfileRequest {
    /// Decode the first JSON value of a request body.
    ///
    /// Anything after that value is ignored. A `null` body decodes to an empty request,
    /// which then fails validation rather than decoding.
    pub fn from_json(body: &[u8]) -> ModelResult<Self> {
        let decode = |e: serde_json::Error| ModelError::Decode(e.to_string());

        match serde_json::Deserializer::from_slice(body)
            .into_iter::<Option<Self>>()
            .next()
        {
            Some(res) => Ok(res.map_err(decode)?.unwrap_or_default()),
            // Empty or whitespace-only body: let serde report the EOF.
            None => serde_json::from_slice(body).map_err(decode),
        }
    }

    /// Collect every validation message for this request; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.text.is_none() {
            errors.push(TEXT_REQUIRED.to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_is_reported() {
        let req = ProfileRequest::default();
        assert_eq!(req.validate(), vec![TEXT_REQUIRED.to_string()]);
    }

    #[test]
    fn null_text_counts_as_missing() {
        let req = ProfileRequest::from_json(br#"{"text": null}"#).unwrap();
        assert_eq!(req.validate(), vec![TEXT_REQUIRED.to_string()]);
    }

    #[test]
    fn present_text_is_valid_even_when_empty() {
        let req = ProfileRequest::from_json(br#"{"text": ""}"#).unwrap();
        assert!(req.validate().is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req =
            ProfileRequest::from_json(br#"{"text": "foo", "images": ["a", "b"], "metadata": {"id": 1}}"#)
                .unwrap();
        assert_eq!(req.text.as_deref(), Some("foo"));
        assert!(req.metadata.is_some());
    }

    #[test]
    fn null_body_is_an_empty_request() {
        let req = ProfileRequest::from_json(b"null").unwrap();
        assert_eq!(req.validate(), vec![TEXT_REQUIRED.to_string()]);
    }

    #[test]
    fn only_the_first_value_is_read() {
        let req = ProfileRequest::from_json(br#"{"text":"a"} {"x":1}"#).unwrap();
        assert_eq!(req.text.as_deref(), Some("a"));
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let err = ProfileRequest::from_json(b"  ").unwrap_err();
        match err {
            ModelError::Decode(msg) => assert!(msg.contains("EOF"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = ProfileRequest::from_json(br#"{text: "foo"}"#).unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[test]
    fn wrong_text_type_is_a_decode_error() {
        let err = ProfileRequest::from_json(br#"{"text": 5}"#).unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }
}
