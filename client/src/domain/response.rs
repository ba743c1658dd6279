//! Explicit response-schema parsing.
//!
//! Each endpoint declares whether it answers with the `{success, message,
//! data}` envelope or with the bare payload. Parsing never guesses between
//! shapes: a payload that does not match its declared schema is reported as
//! [`ResponseError::Malformed`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ports::define_port_error;

/// Message recorded when a list payload has an unexpected shape.
pub const UNEXPECTED_FORMAT: &str = "unexpected response format";

/// Declared response shape of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    /// `{success, message, data}`.
    Enveloped,
    /// The JSON value itself is the payload.
    Bare,
}

define_port_error! {
    /// Errors raised while interpreting a response body.
    pub enum ResponseError {
        /// The envelope reported `success: false`.
        Rejected { message: String } => "{message}",
        /// The payload did not match the declared schema.
        Malformed { message: String } => "unexpected response format: {message}",
    }
}

/// Unwrap the payload of a response according to `schema`.
///
/// Enveloped responses resolve to `None` when `data` is absent or `null`.
pub fn parse_payload(schema: ResponseSchema, body: Value) -> Result<Option<Value>, ResponseError> {
    match schema {
        ResponseSchema::Bare => Ok(Some(body)),
        ResponseSchema::Enveloped => {
            let Value::Object(mut envelope) = body else {
                return Err(ResponseError::malformed("expected an envelope object"));
            };
            let success = match envelope.get("success") {
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err(ResponseError::malformed("`success` must be a boolean")),
                None => return Err(ResponseError::malformed("envelope has no `success` flag")),
            };
            if !success {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or("request was rejected")
                    .to_owned();
                return Err(ResponseError::rejected(message));
            }
            match envelope.remove("data") {
                None | Some(Value::Null) => Ok(None),
                Some(data) => Ok(Some(data)),
            }
        }
    }
}

/// Parse a list payload into its raw elements.
pub fn parse_list(schema: ResponseSchema, body: Value) -> Result<Vec<Value>, ResponseError> {
    match parse_payload(schema, body)? {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ResponseError::malformed("expected an array")),
        None => Err(ResponseError::malformed("response carries no data")),
    }
}

/// Parse a single-entity payload.
pub fn parse_entity(schema: ResponseSchema, body: Value) -> Result<Value, ResponseError> {
    match parse_payload(schema, body)? {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(ResponseError::malformed("expected an object")),
        None => Err(ResponseError::malformed("response carries no data")),
    }
}

/// Parse and decode a typed payload.
pub fn parse_typed<T: DeserializeOwned>(
    schema: ResponseSchema,
    body: Value,
) -> Result<T, ResponseError> {
    let payload = parse_payload(schema, body)?.unwrap_or(Value::Null);
    serde_json::from_value(payload).map_err(|error| ResponseError::malformed(error.to_string()))
}
