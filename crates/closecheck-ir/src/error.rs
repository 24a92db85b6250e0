// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Errors raised while loading a serialized program.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[cfg(feature = "serde")]
    #[error("malformed program: {0}")]
    Json(#[from] serde_json::Error),

    /// An id that points past the end of its table.
    #[error("{what} #{id} does not exist")]
    DanglingId { what: &'static str, id: u32 },

    /// Structural type listed twice; identity comparisons would break.
    #[error("type #{id} duplicates an earlier structural type")]
    DuplicateType { id: u32 },

    /// Named or alias type whose layers lead back to itself.
    #[error("type #{id} is defined in terms of itself")]
    CyclicType { id: u32 },

    #[error("{what} #{id} is stored out of order")]
    Misnumbered { what: &'static str, id: u32 },
}
