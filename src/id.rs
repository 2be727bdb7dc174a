//! Branch identifiers.
//!
//! See [`BranchId`] for details.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A branch identifier: 24 lowercase hex characters drawn from a random
/// 128-bit value.
///
/// Collisions aren't checked for; at this system's scale, a truncated
/// [`Uuid::new_v4`] is unique with overwhelming probability.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

const LEN: usize = 24;

impl BranchId {
    /// Generates a fresh, globally unique (in practice) branch id.
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        BranchId(hex[..LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchId {
    fn default() -> Self {
        BranchId::new()
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> String {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_24_lowercase_hex_chars() {
        let id = BranchId::new();
        assert_eq!(id.as_str().len(), LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn ids_are_not_trivially_colliding() {
        let a = BranchId::new();
        let b = BranchId::new();
        assert_ne!(a, b);
    }
}
