use serde::{Deserialize, Serialize};

use crate::keys::KeyRule;

/// One rendition produced for every uploaded video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    /// Short name used in logs
    pub label: String,

    /// How the rendition key is derived from the input key
    pub key: KeyRule,

    /// Transcoder preset naming codec, resolution and bitrate
    pub preset_id: String,
}

impl RenditionSpec {
    pub fn new(label: &str, key: KeyRule, preset_id: &str) -> Self {
        Self {
            label: label.to_string(),
            key,
            preset_id: preset_id.to_string(),
        }
    }
}

/// Output entry of a transcoding job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionOutput {
    pub output_key: String,
    pub preset_id: String,
}

// Elastic Transcoder system presets
const PRESET_WEB: &str = "1351620000001-100070";
const PRESET_PHONE: &str = "1351620000001-100020";
const PRESET_AUDIO_MP3: &str = "1351620000001-300040";
const PRESET_GIF: &str = "1351620000001-100200";

/// Web, phone, audio-only and animated gif renditions
pub fn default_renditions() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::new("web", KeyRule::prefixed("web/"), PRESET_WEB),
        RenditionSpec::new("phone", KeyRule::prefixed("phone/"), PRESET_PHONE),
        RenditionSpec::new("audio", KeyRule::prefixed("audio/").with_extension("mp3"), PRESET_AUDIO_MP3),
        RenditionSpec::new("gif", KeyRule::prefixed("gif/").with_extension("gif"), PRESET_GIF),
    ]
}

/// Output entries for `input_key`, in catalog order
pub fn plan(renditions: &[RenditionSpec], input_key: &str) -> Vec<RenditionOutput> {
    renditions
        .iter()
        .map(|rendition| RenditionOutput {
            output_key: rendition.key.apply(input_key),
            preset_id: rendition.preset_id.clone(),
        })
        .collect()
}

/// Whether `key` is one of the renditions the catalog writes.
///
/// `output_prefix` is the job-level prefix the transcoder puts in front of every output key.
pub fn produces(renditions: &[RenditionSpec], output_prefix: &str, key: &str) -> bool {
    let key = key.strip_prefix(output_prefix).unwrap_or(key);
    renditions.iter().any(|rendition| rendition.key.is_under_prefix(key))
}
