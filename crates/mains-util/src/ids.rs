//! Strongly-typed identifiers for mainsd

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a configured shutdown target.
///
/// The canonical form is `user@host`, which is also the login string handed
/// to the remote-execution tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(user: &str, host: &str) -> Self {
        Self(format!("{}@{}", user, host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A form safe to embed in a marker filename.
    pub fn as_file_stem(&self) -> String {
        self.0.replace(['/', '\\', ' '], "_")
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_canonical_form() {
        let id = TargetId::new("root", "nas.example.net");
        assert_eq!(id.as_str(), "root@nas.example.net");
    }

    #[test]
    fn target_id_equality() {
        let a = TargetId::new("root", "nas");
        let b = TargetId::from("root@nas");
        let c = TargetId::new("root", "backup");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn file_stem_strips_path_separators() {
        let id = TargetId::from("root@odd/host name");
        assert_eq!(id.as_file_stem(), "root@odd_host_name");
    }

    #[test]
    fn ids_serialize_deserialize() {
        let id = TargetId::new("admin", "switch");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: TargetId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
