/*!
Application options and workbench state records.
*/

use serde::{Deserialize, Serialize};

/// One application option
///
/// Identifiers are positions: every save renumbers the whole set `0..n-1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl OptionEntry {
    pub fn new<S: Into<String>>(name: S, value: serde_json::Value) -> Self {
        Self {
            id: 0,
            name: name.into(),
            value,
        }
    }
}

/// Workbench layout and session state; exactly one instance is stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchState {
    #[serde(default)]
    pub id: i64,
    /// Name of the workspace that was open when the application last ran
    #[serde(default)]
    pub loaded_workspace: Option<String>,
}
