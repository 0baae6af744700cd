use serde::{Deserialize, Serialize};

/// Storage backend type for object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem storage
    Local,
    /// In-memory storage (tests and ephemeral deployments)
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::Memory => "memory",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_round_trip() {
        let json = serde_json::to_string(&StorageBackend::Local).unwrap();
        assert_eq!(json, "\"local\"");
        let back: StorageBackend = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StorageBackend::Local);
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
    }
}
