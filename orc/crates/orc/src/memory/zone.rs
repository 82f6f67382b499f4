//! Legacy memory zones
//!
//! Zones used to segregate allocations. They survive only so that code
//! written against zone-taking entry points keeps compiling; every zone
//! argument is ignored.

use crate::object::ObjectPtr;

/// Memory zone (no allocation-policy effect)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The default zone
    pub fn default_zone() -> Self {
        Self::new("default")
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::default_zone()
    }
}

/// Check if `object` may be retained instead of copied into `zone`
///
/// Always true: zones do not partition memory.
pub fn should_retain_with_zone(object: Option<ObjectPtr>, zone: Option<&Zone>) -> bool {
    let _ = (object, zone);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retain_with_any_zone() {
        assert!(should_retain_with_zone(None, None));
        assert!(should_retain_with_zone(None, Some(&Zone::new("scratch"))));
    }

    #[test]
    fn test_default_zone() {
        assert_eq!(Zone::default().name(), "default");
    }
}
