//! Tenant partition key.

use serde::{Deserialize, Serialize};

/// Prefix shared by every canvas record key.
const KEY_PREFIX: &str = "canvas-state";

/// The `(suite, office)` pair that partitions all persisted canvas data.
///
/// Callers compare keys for equality and hand them to the storage engine;
/// the derived storage key is an injective encoding of both components, so
/// two distinct pairs never address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantKey {
    suite_id: String,
    office_id: String,
}

impl TenantKey {
    /// Create a tenant key.
    #[must_use]
    pub fn new(suite_id: impl Into<String>, office_id: impl Into<String>) -> Self {
        Self {
            suite_id: suite_id.into(),
            office_id: office_id.into(),
        }
    }

    /// The record key this tenant's canvas is stored under.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{KEY_PREFIX}:{}:{}",
            escape_component(&self.suite_id),
            escape_component(&self.office_id)
        )
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.suite_id, self.office_id)
    }
}

/// Escape `%` and `:` so the separator cannot appear inside a component.
fn escape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let key = TenantKey::new("suite-1", "office-7");
        assert_eq!(key.storage_key(), "canvas-state:suite-1:office-7");
    }

    #[test]
    fn test_separator_in_component_does_not_collide() {
        let a = TenantKey::new("a:b", "c");
        let b = TenantKey::new("a", "b:c");
        assert_ne!(a, b);
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_escape_is_not_ambiguous() {
        let a = TenantKey::new("x%3Ay", "z");
        let b = TenantKey::new("x:y", "z");
        assert_ne!(a.storage_key(), b.storage_key());
    }
}
