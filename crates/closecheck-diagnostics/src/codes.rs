// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Diagnostic code registry.
//!
//! Maps codes (C0001, C0100, ...) to titles and categories. Used by
//! `closecheck codes` and by JSON output.

use std::collections::BTreeMap;

pub const RESOURCE_NOT_RELEASED: &str = "C0001";
pub const PACKAGE_NOT_FOUND: &str = "C0100";
pub const TYPE_NOT_FOUND: &str = "C0101";
pub const NOT_A_STRUCT: &str = "C0102";
pub const FIELD_NOT_FOUND: &str = "C0103";
pub const METHOD_NOT_FOUND: &str = "C0104";
pub const MALFORMED_PROGRAM: &str = "C0200";
pub const DANGLING_ID: &str = "C0201";
pub const DUPLICATE_TYPE: &str = "C0202";
pub const MISNUMBERED: &str = "C0203";
pub const CYCLIC_TYPE: &str = "C0204";

/// Registry of all known codes.
pub struct ErrorCodeRegistry {
    codes: BTreeMap<&'static str, ErrorCodeInfo>,
}

pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Leak,
    Config,
    Load,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Leak => write!(f, "Leak"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Load => write!(f, "Load"),
        }
    }
}

macro_rules! register_codes {
    ($($code:expr => ($title:literal, $cat:expr)),* $(,)?) => {{
        let mut map = BTreeMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                // Findings (C00xx)
                RESOURCE_NOT_RELEASED => ("resource not released on every path", Leak),

                // Target resolution (C01xx)
                PACKAGE_NOT_FOUND => ("target package not in program", Config),
                TYPE_NOT_FOUND => ("container type not found", Config),
                NOT_A_STRUCT => ("container type has no fields", Config),
                FIELD_NOT_FOUND => ("resource field not found", Config),
                METHOD_NOT_FOUND => ("release method not found", Config),

                // Program loading (C02xx)
                MALFORMED_PROGRAM => ("program is not valid JSON", Load),
                DANGLING_ID => ("program refers to a missing entity", Load),
                DUPLICATE_TYPE => ("structural type defined twice", Load),
                MISNUMBERED => ("entity stored out of order", Load),
                CYCLIC_TYPE => ("type defined in terms of itself", Load),
            },
        }
    }
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    /// All codes in code order.
    pub fn all(&self) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values()
    }
}
