/*!
Encoding and registry-driven decoding of request aspects.

Each aspect is stored as its payload object plus the discriminator under
[`TYPE_KEY`]. Decoding looks the discriminator up in an [`AspectRegistry`]. A
discriminator the registry does not know is not an error: the aspect becomes
[`RequestAspect::Unknown`] and its data is dropped, so a store written by a
build with more (or differently named) aspects still loads.
*/

use crate::domain::{AuthAspect, BodyAspect, HeaderAspect, RequestAspect, UNKNOWN_ASPECT};
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::error;

/// Key holding the discriminator inside an encoded aspect
pub const TYPE_KEY: &str = "@type";

/// Builds an aspect from its payload (the object without [`TYPE_KEY`])
pub type AspectDecoder = fn(Value) -> serde_json::Result<RequestAspect>;

static BUILTIN: Lazy<AspectRegistry> = Lazy::new(|| {
    let mut registry = AspectRegistry::empty();
    registry.register(HeaderAspect::DISCRIMINATOR, decode_headers);
    registry.register(BodyAspect::DISCRIMINATOR, decode_body);
    registry.register(AuthAspect::DISCRIMINATOR, decode_auth);
    registry
});

/// Mapping from discriminator to decoder
///
/// Always contains the `unknown` entry, so a store that already holds
/// purged aspects decodes them without another diagnostic.
#[derive(Debug, Clone)]
pub struct AspectRegistry {
    decoders: HashMap<String, AspectDecoder>,
}

impl AspectRegistry {
    /// Registry knowing only the `unknown` sentinel
    pub fn empty() -> Self {
        let mut decoders: HashMap<String, AspectDecoder> = HashMap::new();
        decoders.insert(UNKNOWN_ASPECT.to_string(), decode_unknown);
        Self { decoders }
    }

    /// Registry with every aspect this build defines
    pub fn builtin() -> &'static AspectRegistry {
        &BUILTIN
    }

    /// Add or replace the decoder for `discriminator`
    pub fn register<S: Into<String>>(&mut self, discriminator: S, decoder: AspectDecoder) -> &mut Self {
        self.decoders.insert(discriminator.into(), decoder);
        self
    }

    /// Forget `discriminator`; returns whether it was registered
    ///
    /// The `unknown` sentinel cannot be removed.
    pub fn unregister(&mut self, discriminator: &str) -> bool {
        if discriminator == UNKNOWN_ASPECT {
            return false;
        }
        self.decoders.remove(discriminator).is_some()
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.decoders.contains_key(discriminator)
    }

    /// Registered discriminators, sorted
    pub fn discriminators(&self) -> Vec<String> {
        let mut names: Vec<String> = self.decoders.keys().cloned().collect();
        names.sort();
        names
    }

    /// Decode one encoded aspect
    ///
    /// # Errors
    /// A value that is not an object, lacks a string discriminator, or has a
    /// known discriminator with a malformed payload. An unrecognized
    /// discriminator is never an error.
    pub fn decode(&self, value: Value) -> serde_json::Result<RequestAspect> {
        let mut payload = match value {
            Value::Object(payload) => payload,
            other => {
                return Err(serde_json::Error::custom(format!(
                    "expected an aspect object, got {other}"
                )))
            }
        };

        let discriminator = match payload.remove(TYPE_KEY) {
            Some(Value::String(discriminator)) => discriminator,
            Some(other) => {
                return Err(serde_json::Error::custom(format!(
                    "aspect discriminator must be a string, got {other}"
                )))
            }
            None => return Err(serde_json::Error::missing_field(TYPE_KEY)),
        };

        match self.decoders.get(discriminator.as_str()) {
            Some(decoder) => decoder(Value::Object(payload)),
            None => {
                error!(discriminator = %discriminator, "Unknown aspect type found, purging");
                crate::observability::record_unknown_aspect();
                Ok(RequestAspect::Unknown)
            }
        }
    }
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Encode an aspect as its payload object tagged with its discriminator
pub fn encode_aspect(aspect: &RequestAspect) -> serde_json::Result<Value> {
    let payload = match aspect {
        RequestAspect::Headers(headers) => serde_json::to_value(headers)?,
        RequestAspect::Body(body) => serde_json::to_value(body)?,
        RequestAspect::Auth(auth) => serde_json::to_value(auth)?,
        RequestAspect::Unknown => Value::Object(Map::new()),
    };

    let mut payload = match payload {
        Value::Object(payload) => payload,
        other => {
            return Err(serde_json::Error::custom(format!(
                "aspect '{}' did not encode to an object: {other}",
                aspect.discriminator()
            )))
        }
    };
    payload.insert(
        TYPE_KEY.to_string(),
        Value::String(aspect.discriminator().to_string()),
    );
    Ok(Value::Object(payload))
}

fn decode_headers(payload: Value) -> serde_json::Result<RequestAspect> {
    serde_json::from_value(payload).map(RequestAspect::Headers)
}

fn decode_body(payload: Value) -> serde_json::Result<RequestAspect> {
    serde_json::from_value(payload).map(RequestAspect::Body)
}

fn decode_auth(payload: Value) -> serde_json::Result<RequestAspect> {
    serde_json::from_value(payload).map(RequestAspect::Auth)
}

fn decode_unknown(_payload: Value) -> serde_json::Result<RequestAspect> {
    Ok(RequestAspect::Unknown)
}
