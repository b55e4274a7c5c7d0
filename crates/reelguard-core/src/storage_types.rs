use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Durable storage backend types
///
/// This enum selects which blob store (if any) finished source files are migrated to.
/// It's defined in core because it's used in configuration and by the storage factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// No durable storage configured; files stay on local transient storage.
    None,
    S3,
    Local,
}

impl StorageBackend {
    /// Whether finished jobs should be migrated at all.
    pub fn is_configured(&self) -> bool {
        !matches!(self, StorageBackend::None)
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(StorageBackend::None),
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::None => write!(f, "none"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
