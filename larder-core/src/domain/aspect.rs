/*!
Request aspects: the polymorphic facets of a request.
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discriminator of the unknown-aspect sentinel
pub const UNKNOWN_ASPECT: &str = "unknown";

/// One facet of a request
///
/// The variant set is open: a store written by another build may contain
/// aspects this build has never heard of. Those decode to [`RequestAspect::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestAspect {
    Headers(HeaderAspect),
    Body(BodyAspect),
    Auth(AuthAspect),
    /// Placeholder for an aspect whose discriminator was not recognized.
    /// Its content is not retained.
    Unknown,
}

impl RequestAspect {
    /// Discriminator written next to the aspect payload
    pub fn discriminator(&self) -> &'static str {
        match self {
            RequestAspect::Headers(_) => HeaderAspect::DISCRIMINATOR,
            RequestAspect::Body(_) => BodyAspect::DISCRIMINATOR,
            RequestAspect::Auth(_) => AuthAspect::DISCRIMINATOR,
            RequestAspect::Unknown => UNKNOWN_ASPECT,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, RequestAspect::Unknown)
    }
}

/// A single request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl HeaderEntry {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderAspect {
    #[serde(default)]
    pub entries: Vec<HeaderEntry>,
}

impl HeaderAspect {
    pub const DISCRIMINATOR: &'static str = "headers";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyAspect {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: String,
}

impl BodyAspect {
    pub const DISCRIMINATOR: &'static str = "body";
}

/// Authentication settings, keyed by scheme-specific parameter names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAspect {
    pub scheme: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl AuthAspect {
    pub const DISCRIMINATOR: &'static str = "auth";
}
