use serde::{Deserialize, Serialize};

/// Media class of a stored object, derived from its key suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaClass {
    Video,
    Audio,
    TranscriptJson,
    Unknown,
}

impl MediaClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Video => "video",
            MediaClass::Audio => "audio",
            MediaClass::TranscriptJson => "transcript-json",
            MediaClass::Unknown => "unknown",
        }
    }

    /// Extension (without the dot) that classifies as this class
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            MediaClass::Video => Some(VIDEO_EXTENSION),
            MediaClass::Audio => Some(AUDIO_EXTENSION),
            MediaClass::TranscriptJson => Some(TRANSCRIPT_EXTENSION),
            MediaClass::Unknown => None,
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext {
            VIDEO_EXTENSION => MediaClass::Video,
            AUDIO_EXTENSION => MediaClass::Audio,
            TRANSCRIPT_EXTENSION => MediaClass::TranscriptJson,
            _ => MediaClass::Unknown,
        }
    }
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const VIDEO_EXTENSION: &str = "mp4";
pub const AUDIO_EXTENSION: &str = "mp3";
pub const TRANSCRIPT_EXTENSION: &str = "json";

/// Classify a storage key by the extension of its last path segment.
///
/// Total: keys without a recognised extension are `Unknown`, which callers treat as a no-op.
/// Matching is case-sensitive.
pub fn classify(key: &str) -> MediaClass {
    extension_of(key)
        .map(MediaClass::from_extension)
        .unwrap_or(MediaClass::Unknown)
}

/// Extension of the last path segment, if it has one
pub fn extension_of(key: &str) -> Option<&str> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}
