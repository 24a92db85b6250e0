// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Analyzer configuration.

use serde::{Deserialize, Serialize};

const HTTP_MESSAGE: &str = "response body must be closed";

/// Which resource to check: the container type that owns it, the field
/// holding the resource, and the method that releases it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Import path of the package declaring the container type.
    pub package: String,
    /// Container type name; a leading `*` selects the pointer type.
    pub type_name: String,
    /// Resource field of the container.
    pub field: String,
    /// Release method of the resource.
    pub method: String,
    /// Finding text; derived from the other entries when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            package: "net/http".to_string(),
            type_name: "*Response".to_string(),
            field: "Body".to_string(),
            method: "Close".to_string(),
            message: None,
        }
    }
}

impl TargetConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn message(&self) -> String {
        match &self.message {
            Some(m) => m.clone(),
            None if self.is_response_body() => HTTP_MESSAGE.to_string(),
            None => format!(
                "{}.{} of {}.{} must be released with {}()",
                self.type_name.trim_start_matches('*'),
                self.field,
                self.package,
                self.type_name.trim_start_matches('*'),
                self.method
            ),
        }
    }

    fn is_response_body(&self) -> bool {
        let http = TargetConfig::default();
        self.package == http.package
            && self.type_name == http.type_name
            && self.field == http.field
            && self.method == http.method
    }
}

/// Knobs that do not change what is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Verify call sites on the rayon thread pool.
    pub parallel: bool,
    /// Recursion bound per call site, on top of the re-entry check.
    pub max_depth: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_depth: 64,
        }
    }
}
