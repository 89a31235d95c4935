//! Data structures for feed nodes and discovered media

use serde::{Deserialize, Serialize};

/// Media type derived from the resource URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a resource URL.
    ///
    /// This is a substring heuristic, not content inspection: any URL
    /// containing `.mp4` (query parameters included) counts as video,
    /// everything else as an image. A URL carrying `.mp4` in a query
    /// parameter therefore misclassifies.
    pub fn from_url(url: &str) -> Self {
        if url.to_ascii_lowercase().contains(".mp4") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    /// File extension used for organized paths.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Video => "mp4",
            MediaType::Image => "jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "image",
        }
    }
}

/// Which media types a scan collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    #[serde(rename = "saveImages")]
    SaveImages,
    #[serde(rename = "saveVideos")]
    SaveVideos,
    #[serde(rename = "saveBoth")]
    SaveBoth,
}

impl ScanMode {
    /// Whether items of the given type are collected in this mode.
    pub fn admits(self, media_type: MediaType) -> bool {
        match self {
            ScanMode::SaveImages => media_type == MediaType::Image,
            ScanMode::SaveVideos => media_type == MediaType::Video,
            ScanMode::SaveBoth => true,
        }
    }
}

/// A single favorited media item discovered on the page
///
/// Items are immutable once produced by the scanner; downstream stages
/// attach derived fields (filename, type) on their own records. The type
/// is always derived from the URL, never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Page-assigned post identifier; absent when the markup carried no
    /// permalink. Identifier-dependent operations filter for `Some`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Absolute resource URL, always non-empty.
    pub url: String,

    /// ISO-8601 date, when the page exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Free-text generation prompt, when the page exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl MediaItem {
    pub fn media_type(&self) -> MediaType {
        MediaType::from_url(&self.url)
    }

    /// Deduplication key: the page id when present, the URL otherwise.
    pub fn dedup_key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }
}

/// Source URL of a media element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
}

/// Raw page structure handed over by the feed
///
/// Tagged union of the node shapes the host gallery renders. Anything
/// else lands in `Unrecognized` explicitly rather than falling through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawNode {
    /// A gallery card wrapping a media element, permalink and caption.
    Card {
        media: Option<MediaSource>,
        permalink: Option<String>,
        caption: Option<String>,
        timestamp: Option<String>,
    },
    /// A bare media element rendered outside a card.
    Media(MediaSource),
    /// A node matching no known media pattern.
    Unrecognized,
}

impl RawNode {
    /// Date and prompt annotations carried by the node, if any.
    pub(crate) fn annotations(&self) -> (Option<&str>, Option<&str>) {
        match self {
            RawNode::Card {
                caption, timestamp, ..
            } => (timestamp.as_deref(), caption.as_deref()),
            _ => (None, None),
        }
    }
}
