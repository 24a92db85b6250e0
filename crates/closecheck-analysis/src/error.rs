// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Configuration errors.
//!
//! Raised while resolving the target descriptor, before any call site is
//! looked at. Each one is fatal for the run.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("package `{package}` is not part of the program")]
    PackageNotFound { package: String },

    #[error("type `{package}.{name}` not found")]
    TypeNotFound { package: String, name: String },

    #[error("type `{type_name}` has no struct layout to look up field `{field}` in")]
    NotAStruct { type_name: String, field: String },

    #[error("type `{type_name}` has no field `{field}`")]
    FieldNotFound { type_name: String, field: String },

    #[error("type `{type_name}` has no method `{method}`")]
    MethodNotFound { type_name: String, method: String },
}
