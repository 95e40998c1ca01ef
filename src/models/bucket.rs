//! Watched bucket identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bucket being watched, identified by its namespace and name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bucket {
    /// Parent namespace of the bucket
    pub namespace: String,

    /// Bucket name, unique within the namespace
    pub name: String,
}

impl Bucket {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Persistence key for this bucket's snapshot: `{namespace}/{name}`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_includes_namespace() {
        let bucket = Bucket::new("ns", "logs");
        assert_eq!(bucket.key(), "ns/logs");
        assert_eq!(bucket.to_string(), "ns/logs");
    }
}
