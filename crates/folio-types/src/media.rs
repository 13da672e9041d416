use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Declared media type stored on records that carry no attachment.
pub const NO_MEDIA: &str = "none";

/// Classification of a project's attached media.
///
/// Derived once from the declared media type at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    None,
    Image,
    Video,
    OtherBinary,
}

impl MediaKind {
    /// Classify a declared media type such as `image/png`.
    ///
    /// An empty type or [`NO_MEDIA`] means no attachment; any other type that
    /// is neither `image/*` nor `video/*` is [`MediaKind::OtherBinary`].
    /// Matching ignores ASCII case.
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        if media_type.is_empty() || media_type == NO_MEDIA {
            Self::None
        } else if media_type.starts_with("image/") {
            Self::Image
        } else if media_type.starts_with("video/") {
            Self::Video
        } else {
            Self::OtherBinary
        }
    }

    /// Short label used in listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image => "image",
            Self::Video => "video",
            Self::OtherBinary => "other-binary",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary media payload together with its declared type.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// Declared media type, e.g. `video/mp4`.
    pub media_type: String,
    /// Raw payload bytes.
    pub data: Bytes,
}

impl MediaBlob {
    pub fn new(media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Kind derived from the declared type. A blob with an empty or `none`
    /// type still holds bytes, so it classifies as other-binary.
    pub fn kind(&self) -> MediaKind {
        match MediaKind::from_media_type(&self.media_type) {
            MediaKind::None => MediaKind::OtherBinary,
            kind => kind,
        }
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_declared_types() {
        assert_eq!(MediaKind::from_media_type("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type("video/mp4"), MediaKind::Video);
        assert_eq!(
            MediaKind::from_media_type("application/pdf"),
            MediaKind::OtherBinary
        );
        assert_eq!(MediaKind::from_media_type("none"), MediaKind::None);
        assert_eq!(MediaKind::from_media_type("  "), MediaKind::None);
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(MediaKind::from_media_type("IMAGE/PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type("Video/MP4"), MediaKind::Video);
        assert_eq!(MediaKind::from_media_type("None"), MediaKind::None);
    }

    #[test]
    fn blob_without_type_is_other_binary() {
        let blob = MediaBlob::new("", vec![1, 2, 3]);
        assert_eq!(blob.kind(), MediaKind::OtherBinary);
        assert_eq!(blob.len(), 3);
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&MediaKind::OtherBinary).unwrap();
        assert_eq!(json, "\"other-binary\"");
    }

    #[test]
    fn debug_hides_payload() {
        let blob = MediaBlob::new("image/png", vec![0u8; 64]);
        let debug = format!("{blob:?}");
        assert!(debug.contains("len: 64"));
    }
}
