//! Typed identifiers for graph elements, libraries, and subjects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Graph element ids are opaque strings assigned by the graph database.
/// No format is enforced; two ids are equal iff their strings are equal.
macro_rules! element_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new id from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

/// Relational ids are server-assigned integers. Zero is the backend's
/// "not yet assigned" value and is treated like an absent id.
macro_rules! numeric_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw id.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// The raw integer.
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Whether this id refers to an existing server-side record.
            pub const fn is_set(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

element_id!(ElementId, "Identifier of a node, relationship, or attached graph element.");
numeric_id!(LibId, "Identifier of a knowledge library. Also keys long-running server jobs.");
numeric_id!(SubjectId, "Identifier of a subject within a knowledge library.");
