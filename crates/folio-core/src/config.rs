use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Largest accepted media attachment unless configured otherwise (50 MiB).
pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 50 * 1024 * 1024;

/// Default capacity of the metadata tier (5 MiB), sized like a browser's
/// small key-value storage.
pub const DEFAULT_METADATA_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Top-level configuration, usually read from `folio.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Directory holding metadata, media, and session state.
    pub data_dir: PathBuf,
    pub max_media_bytes: u64,
    /// Summed size limit for all metadata documents; `None` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_quota_bytes: Option<u64>,
    /// Deadline applied to every individual store call.
    ///
    /// A call that misses it is abandoned, not rolled back. A backend that
    /// cannot cancel its write may still finish it, so a create reported as
    /// failed can reappear on the next load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_timeout_ms: Option<u64>,
    pub identity: IdentityConfig,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".folio"),
            max_media_bytes: DEFAULT_MAX_MEDIA_BYTES,
            metadata_quota_bytes: Some(DEFAULT_METADATA_QUOTA_BYTES),
            store_timeout_ms: None,
            identity: IdentityConfig::default(),
        }
    }
}

/// Settings for the stand-in identity provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Simulated sign-in/sign-out latency.
    pub latency_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            display_name: "Local User".into(),
            email: None,
            latency_ms: 0,
        }
    }
}

impl FolioConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Settings consumed by the coordinator.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_media_bytes: self.max_media_bytes,
            store_timeout: self.store_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join("identity.json")
    }

    pub fn guest_flag_path(&self) -> PathBuf {
        self.data_dir.join("guest.flag")
    }
}

/// Limits enforced by the [`Coordinator`](crate::Coordinator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub max_media_bytes: u64,
    /// When set, a store call that takes longer fails as unavailable. The
    /// working set is left as it was, but the abandoned call is not undone.
    pub store_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_media_bytes: DEFAULT_MAX_MEDIA_BYTES,
            store_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = FolioConfig::default();
        assert_eq!(c.max_media_bytes, 50 * 1024 * 1024);
        assert_eq!(c.metadata_quota_bytes, Some(5 * 1024 * 1024));
        assert!(c.store_timeout_ms.is_none());
        assert_eq!(c.identity.display_name, "Local User");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = FolioConfig::from_toml_str(
            r#"
            data_dir = "/tmp/folio"
            store_timeout_ms = 2500

            [identity]
            display_name = "Ada"
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/tmp/folio"));
        assert_eq!(c.max_media_bytes, DEFAULT_MAX_MEDIA_BYTES);
        assert_eq!(c.identity.display_name, "Ada");
        assert_eq!(c.identity.latency_ms, 0);
        assert_eq!(c.coordinator().store_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = FolioConfig::from_toml_str("max_media_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = FolioConfig::default();
        let text = c.to_toml_string().unwrap();
        assert_eq!(FolioConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn data_layout_paths() {
        let c = FolioConfig {
            data_dir: PathBuf::from("/data"),
            ..Default::default()
        };
        assert_eq!(c.metadata_dir(), PathBuf::from("/data/metadata"));
        assert_eq!(c.media_dir(), PathBuf::from("/data/media"));
        assert_eq!(c.guest_flag_path(), PathBuf::from("/data/guest.flag"));
    }
}
